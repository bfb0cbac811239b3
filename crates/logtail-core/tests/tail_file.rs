use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use logtail_core::{
    ConsoleOptions, LogConsole, MemoryPreferences, Severity, SeverityClassifier, SeverityMapping,
    TailerConfig, TailerState, always_active,
};

fn fast() -> TailerConfig {
    TailerConfig {
        slice: Duration::from_millis(20),
        idle_timeout: Duration::from_millis(10),
        inactive_divisor: 2,
    }
}

fn open(path: &Path, skip_existing: bool, mapping: &SeverityMapping) -> LogConsole {
    let options = ConsoleOptions {
        path: path.to_path_buf(),
        skip_existing,
        tailer: fast(),
        preferences_key: None,
    };
    LogConsole::open(
        options,
        SeverityClassifier::default(),
        mapping,
        Box::new(MemoryPreferences::new()),
        always_active(),
    )
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

/// Pump until `count` lines were read or a few seconds passed
fn wait_for(console: &mut LogConsole, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while console.core().original().len() < count && Instant::now() < deadline {
        console.pump();
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn original_buffer_matches_file_regardless_of_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "boot\nINFO ready\nERROR failed\n  at main\nDEBUG retry\n").unwrap();

    let mapping = SeverityMapping::with_enabled([Severity::Error]);
    let mut console = open(&path, false, &mapping);
    wait_for(&mut console, 5);

    append(&path, "WARN late\n");
    wait_for(&mut console, 6);
    console.stop_running();
    console.pump();

    let expected: Vec<String> = fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(console.core().original().lines(), expected.as_slice());
    assert_eq!(
        console.core().filtered().texts(),
        vec!["boot", "ERROR failed", "  at main"]
    );
}

#[test]
fn flush_on_stop_keeps_unterminated_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "INFO one\n").unwrap();

    let mut console = open(&path, false, &SeverityMapping::default());
    wait_for(&mut console, 1);

    append(&path, "INFO two\npartial");
    console.stop_running();
    console.pump();

    assert_eq!(
        console.core().original().lines(),
        ["INFO one", "INFO two", "partial"]
    );
    assert_eq!(console.tailer_state(), TailerState::Stopped);
}

#[test]
fn skip_existing_only_shows_new_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "INFO old\n").unwrap();

    let mut console = open(&path, true, &SeverityMapping::default());
    append(&path, "INFO new\n");
    wait_for(&mut console, 1);
    console.stop_running();
    console.pump();

    assert_eq!(console.core().original().lines(), ["INFO new"]);
}

#[test]
fn missing_file_is_created_and_tailed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("later.log");

    let mut console = open(&path, false, &SeverityMapping::default());
    assert!(path.exists());
    assert!(console.is_running());

    append(&path, "ERROR appeared\n");
    wait_for(&mut console, 1);
    console.dispose();

    assert_eq!(console.core().original().lines(), ["ERROR appeared"]);
}

#[test]
fn unavailable_path_yields_stopped_console() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("plain-file");
    fs::write(&blocker, "").unwrap();

    let mut console = open(&blocker.join("app.log"), false, &SeverityMapping::default());
    assert!(!console.is_running());
    console.stop_running();
    assert_eq!(console.pump(), 0);
}
