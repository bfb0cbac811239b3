use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;

use logtail_core::{DisplaySurface, LogLine};

/// A displayed line with its position in the filtered view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewLine {
    pub number: usize,
    pub line: LogLine,
}

/// Shared ring of the most recent filtered lines, read by the renderer
///
/// The console writes through the [`DisplaySurface`] impl on one clone
/// while the UI reads from another.
#[derive(Clone)]
pub struct ViewBuffer {
    lines: Arc<RwLock<VecDeque<ViewLine>>>,

    /// Maximum number of lines kept
    capacity: usize,

    /// Lines appended since the last clear, including evicted ones
    appended: Arc<AtomicUsize>,

    /// Bumped on every change so the UI knows when to redraw
    revision: Arc<AtomicU64>,
}

impl ViewBuffer {
    /// Create a new view buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(4096)))),
            capacity,
            appended: Arc::new(AtomicUsize::new(0)),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lines currently held
    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }

    /// Lines evicted because the ring was full
    pub fn evicted(&self) -> usize {
        self.appended
            .load(Ordering::Relaxed)
            .saturating_sub(self.len())
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Copy out a window of lines for rendering
    pub fn window(&self, skip: usize, take: usize) -> Vec<ViewLine> {
        self.lines
            .read()
            .iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect()
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::Release);
    }
}

impl DisplaySurface for ViewBuffer {
    fn append_line(&mut self, line: &LogLine) {
        let number = self.appended.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut lines = self.lines.write();
            if lines.len() >= self.capacity {
                lines.pop_front();
            }
            lines.push_back(ViewLine {
                number,
                line: line.clone(),
            });
        }
        self.bump();
    }

    fn clear(&mut self) {
        self.lines.write().clear();
        self.appended.store(0, Ordering::Relaxed);
        self.bump();
    }

    fn replace(&mut self, lines: &[LogLine]) {
        let start = lines.len().saturating_sub(self.capacity);
        {
            let mut held = self.lines.write();
            held.clear();
            held.extend(lines[start..].iter().enumerate().map(|(i, line)| ViewLine {
                number: start + i + 1,
                line: line.clone(),
            }));
        }
        self.appended.store(lines.len(), Ordering::Relaxed);
        self.bump();
    }
}
