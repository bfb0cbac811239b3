use std::io::{self, Write};

use tracing::debug;

use logtail_core::{DisplaySurface, LogLine};

/// Writes admitted lines to a stream, one per line
///
/// Output cannot be taken back, so clearing the view is a no-op.
pub struct WriterSurface<W> {
    writer: W,

    /// Set after the first write error; the reader went away
    broken: bool,
}

impl WriterSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> WriterSurface<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            broken: false,
        }
    }

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", text)?;
        self.writer.flush()
    }
}

impl<W: Write + Send> DisplaySurface for WriterSurface<W> {
    fn append_line(&mut self, line: &LogLine) {
        if self.broken {
            return;
        }
        if let Err(e) = self.write_line(&line.text) {
            debug!(error = %e, "Output closed");
            self.broken = true;
        }
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Write for Failing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lines_written_in_order() {
        let mut surface = WriterSurface::new(Vec::new());
        surface.append_line(&LogLine::plain("first"));
        surface.clear();
        surface.replace(&[LogLine::plain("second")]);
        assert_eq!(String::from_utf8(surface.writer).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_write_error_silences_surface() {
        let mut surface = WriterSurface::new(Failing);
        surface.append_line(&LogLine::plain("x"));
        assert!(surface.broken);
        surface.append_line(&LogLine::plain("y"));
    }
}
