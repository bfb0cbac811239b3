mod exec;
mod plain;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use logtail_core::{
    Config, ConsoleOptions, JsonPreferences, LogConsole, MemoryPreferences, OriginalBuffer,
    PreferencesStore, TailerConfig, TailerState, TerminationNotifier, always_active,
};
use logtail_tui::{
    Action, ActivityFlags, AppState, Event, EventHandler, KeyBindings, KeyContext, LogViewerScreen,
    Tui, ViewBuffer,
};
use logtail_types::Severity;

use crate::plain::WriterSurface;

/// logtail - follow a log file with severity and text filtering
#[derive(Parser, Debug)]
#[command(name = "logtail")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log file to follow (created if missing)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Start at the end of the file instead of reading existing content
    #[arg(long)]
    skip_existing: bool,

    /// Print admitted lines to stdout instead of starting the TUI
    #[arg(long)]
    plain: bool,

    /// Config file (defaults to ~/.logtail/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Severities to show, comma separated (e.g. warn,error)
    #[arg(long, value_delimiter = ',', value_parser = parse_severity, conflicts_with = "min_level")]
    levels: Option<Vec<Severity>>,

    /// Show this severity and everything more severe
    #[arg(long, value_parser = parse_severity)]
    min_level: Option<Severity>,

    /// Case-insensitive substring filter
    #[arg(long, conflicts_with = "pattern")]
    filter: Option<String>,

    /// Case-insensitive regular expression filter
    #[arg(long)]
    pattern: Option<String>,

    /// Key for saved filter settings (defaults to the file path)
    #[arg(long)]
    key: Option<String>,

    /// Neither load nor save filter settings
    #[arg(long)]
    no_persist: bool,

    /// Longest stretch spent reading before the idle wait, in milliseconds
    #[arg(long)]
    slice_ms: Option<u64>,

    /// Wait between polls, in milliseconds
    #[arg(long)]
    idle_ms: Option<u64>,

    /// Lines kept in the TUI view
    #[arg(long, default_value = "10000")]
    buffer_size: usize,

    /// Write diagnostics to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Run a command with its output appended to FILE (must come last);
    /// tailing flushes and stops when it exits
    #[arg(long, value_name = "CMD", num_args = 1.., allow_hyphen_values = true)]
    exec: Vec<String>,
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    Severity::parse(s).ok_or_else(|| {
        format!(
            "unknown severity '{}' (expected one of: trace, debug, info, warn, error, fatal)",
            s
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args)?;

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Diagnostics never go to the terminal the TUI draws on
fn init_tracing(args: &Args) -> Result<()> {
    let default_level = if args.log_file.is_some() { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&args.log_file, args.plain) {
        (Some(path), _) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        (None, true) => builder.with_writer(std::io::stderr).init(),
        (None, false) => builder.with_writer(std::io::sink).init(),
    }
    Ok(())
}

fn tailer_config(config: &Config, args: &Args) -> Result<TailerConfig> {
    let mut tailer = config.tailer_config().context("Invalid [tailer] settings")?;
    if let Some(ms) = args.slice_ms {
        anyhow::ensure!(ms > 0, "--slice-ms must be positive");
        tailer.slice = Duration::from_millis(ms);
    }
    if let Some(ms) = args.idle_ms {
        anyhow::ensure!(ms > 0, "--idle-ms must be positive");
        tailer.idle_timeout = Duration::from_millis(ms);
    }
    Ok(tailer)
}

fn preferences_store(args: &Args) -> Box<dyn PreferencesStore> {
    if args.no_persist {
        return Box::new(MemoryPreferences::new());
    }
    match JsonPreferences::default_path() {
        Some(path) => Box::new(JsonPreferences::new(path)),
        None => {
            warn!("No home directory, filter settings will not be saved");
            Box::new(MemoryPreferences::new())
        }
    }
}

/// Command-line filters override saved ones and are saved in turn
fn apply_cli_filters(console: &mut LogConsole, args: &Args) -> Result<()> {
    if let Some(levels) = &args.levels {
        for severity in Severity::ALL {
            console.set_severity_enabled(severity, levels.contains(&severity));
        }
    }
    if let Some(min) = args.min_level {
        console.enable_at_least(min);
    }
    if let Some(text) = &args.filter {
        console.set_text_filter(text).context("Invalid --filter")?;
    }
    if let Some(pattern) = &args.pattern {
        console.set_pattern(pattern).context("Invalid --pattern")?;
    }
    Ok(())
}

async fn run_app(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let tailer = tailer_config(&config, &args)?;
    let classifier = config.classifier().context("Invalid [classifier] settings")?;
    let mapping = config.severity_mapping();

    let activity = ActivityFlags::new();
    let gate = if args.plain {
        always_active()
    } else {
        activity.gate()
    };

    let options = ConsoleOptions {
        path: args.file.clone(),
        skip_existing: args.skip_existing,
        tailer,
        preferences_key: args.key.clone(),
    };
    let mut console = LogConsole::open(options, classifier, &mapping, preferences_store(&args), gate);
    apply_cli_filters(&mut console, &args)?;

    let child = if args.exec.is_empty() {
        None
    } else {
        let notifier = Arc::new(TerminationNotifier::new());
        console.attach_lifecycle_tracking(&notifier);
        Some(exec::spawn_logged(
            &args.exec,
            &args.file,
            TerminationNotifier::clone(&notifier),
        )?)
    };

    info!(path = %args.file.display(), key = console.key(), "Tailing");

    if args.plain {
        run_plain(console, child).await
    } else {
        let state = AppState::new(args.file.clone(), mapping, activity);
        run_tui(console, state, args.buffer_size, child).await
    }
}

async fn run_plain(mut console: LogConsole, child: Option<JoinHandle<Option<i32>>>) -> Result<()> {
    console.add_surface(Box::new(WriterSurface::stdout()));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = console.recv_line() => match line {
                Some(line) => {
                    console.on_line(line);
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                // Print what the tailer has already read before leaving
                tokio::task::block_in_place(|| console.stop_running());
                console.pump();
                if let Some(child) = &child {
                    child.abort();
                }
                break;
            }
        }
    }

    if let Some(child) = child {
        if let Ok(code) = child.await {
            info!(?code, "Child process finished");
        }
    }
    console.dispose();
    Ok(())
}

async fn run_tui(
    mut console: LogConsole,
    mut state: AppState,
    buffer_size: usize,
    child: Option<JoinHandle<Option<i32>>>,
) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let view = ViewBuffer::new(buffer_size);
    console.add_surface(Box::new(view.clone()));

    // Report the child's exit once termination listeners have flushed
    let child_abort = child.map(|child| {
        let abort = child.abort_handle();
        let tx = action_tx.clone();
        tokio::spawn(async move {
            if let Ok(code) = child.await {
                let _ = tx.send(Action::ProcessExited(code));
            }
        });
        abort
    });

    // Initialize TUI
    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(100));
    let keybindings = KeyBindings::new();

    let mut lines_open = true;
    let mut lines_pending = false;
    let mut last_tailer_state = console.tailer_state();

    loop {
        // Render only when something changed
        if state.render_dirty {
            render(&mut tui, &mut state, &console, &view)?;
            state.render_dirty = false;
        }

        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.search_active {
                            keybindings.get_filter_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Tick => {
                        // Lines are drawn in batches on ticks, not per line
                        let tailer_state = console.tailer_state();
                        if lines_pending || tailer_state != last_tailer_state {
                            lines_pending = false;
                            last_tailer_state = tailer_state;
                            state.render_dirty = true;
                        }
                    }
                    Event::Resize(_, _) => {
                        state.render_dirty = true;
                    }
                    Event::Focus(focused) => {
                        state.activity.set_focused(focused);
                        state.render_dirty = true;
                    }
                    Event::Error(e) => {
                        state.show_error(e);
                    }
                }
            }

            line = console.recv_line(), if lines_open => {
                match line {
                    Some(line) => {
                        console.on_line(line);
                        console.pump();
                        lines_pending = true;
                    }
                    None => {
                        lines_open = false;
                        state.render_dirty = true;
                    }
                }
            }

            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &mut console, action);
            }
        }

        if state.should_quit {
            break;
        }
    }

    // Cleanup
    events.shutdown();
    if let Some(abort) = child_abort {
        abort.abort();
    }
    console.dispose();
    tui.restore()?;

    Ok(())
}

fn handle_action(state: &mut AppState, console: &mut LogConsole, action: Action) {
    match action {
        Action::Quit => {
            state.should_quit = true;
        }
        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }
        Action::ToggleSeverity(severity) => {
            console.toggle_severity(severity);
        }
        Action::ShowAtLeast(severity) => {
            console.enable_at_least(severity);
        }
        Action::ShowAll => {
            console.enable_at_least(Severity::Trace);
        }
        Action::OpenSearch => {
            let current = console.policy().text_filter();
            state.start_search(current.map(|f| (f.as_str(), f.is_pattern())));
        }
        Action::CloseSearch => {
            state.cancel_search();
        }
        Action::SearchInput(c) => {
            state.search_input_char(c);
            state.ui_state.filter_error = None;
        }
        Action::SearchBackspace => {
            state.search_input_backspace();
            state.ui_state.filter_error = None;
        }
        Action::SearchClear => {
            state.ui_state.search_input.clear();
            state.ui_state.filter_error = None;
        }
        Action::ApplyFilter => {
            let input = state.ui_state.search_input.clone();
            let result = if state.ui_state.pattern_mode {
                console.set_pattern(&input)
            } else {
                console.set_text_filter(&input)
            };
            state.finish_search(result.map_err(|e| e.to_string()));
        }
        Action::ClearFilter => {
            console.clear_text_filter();
            state.ui_state.search_input.clear();
            state.ui_state.filter_error = None;
        }
        Action::TogglePatternMode => {
            if state.ui_state.search_active {
                state.ui_state.pattern_mode = !state.ui_state.pattern_mode;
                state.ui_state.filter_error = None;
            } else if let Some(filter) = console.policy().text_filter() {
                // Reinterpret the active filter text in the other mode
                let text = filter.as_str().to_string();
                let result = if filter.is_pattern() {
                    console.set_text_filter(&text)
                } else {
                    console.set_pattern(&text)
                };
                if let Err(e) = result {
                    state.show_error(e.to_string());
                }
            } else {
                state.ui_state.pattern_mode = !state.ui_state.pattern_mode;
            }
        }
        Action::ScrollUp(n) => {
            state.scroll_up(n);
        }
        Action::ScrollDown(n) => {
            state.scroll_down(n);
        }
        Action::PageUp => {
            state.scroll_up(20);
        }
        Action::PageDown => {
            // The renderer clamps to the line count
            state.scroll_down(20);
        }
        Action::ScrollToTop => {
            state.ui_state.auto_scroll = false;
            state.ui_state.log_scroll = 0;
        }
        Action::ScrollToBottom => {
            state.ui_state.auto_scroll = false;
            state.ui_state.log_scroll = usize::MAX;
        }
        Action::ToggleAutoScroll => {
            if state.ui_state.auto_scroll {
                state.ui_state.auto_scroll = false;
            } else {
                state.jump_to_bottom();
            }
        }
        Action::TogglePause => {
            let paused = state.activity.toggle_paused();
            state.ui_state.notice = Some(if paused {
                "Tailing paused".to_string()
            } else {
                "Tailing resumed".to_string()
            });
        }
        Action::ToggleStats => {
            state.ui_state.stats_visible = !state.ui_state.stats_visible;
        }
        Action::ExportLogs => {
            let stem = state
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("logs");
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let filename = PathBuf::from(format!("{}_{}.log", stem, timestamp));

            match export_logs_to_file(&filename, console.core().original()) {
                Ok(count) => {
                    state.ui_state.notice =
                        Some(format!("Exported {} lines to {}", count, filename.display()));
                }
                Err(e) => {
                    state.show_error(format!("Export failed: {:#}", e));
                }
            }
        }
        Action::StopTailing => {
            if console.tailer_state() != TailerState::Stopped {
                // The flush reads the rest of the file; keep other tasks running
                tokio::task::block_in_place(|| console.stop_running());
                state.ui_state.notice = Some("Tailing stopped".to_string());
            }
        }
        Action::ProcessExited(code) => {
            state.process_exit = Some(code);
        }
        Action::ShowError(msg) => {
            state.show_error(msg);
        }
        Action::DismissError => {
            state.dismiss_error();
        }
        Action::Render => {}
    }

    state.render_dirty = true;
}

fn render(tui: &mut Tui, state: &mut AppState, console: &LogConsole, view: &ViewBuffer) -> Result<()> {
    tui.terminal()
        .draw(|frame| LogViewerScreen::render(frame, state, console, view))?;

    Ok(())
}

/// Write every line read so far, unfiltered, to `path`
fn export_logs_to_file(path: &Path, original: &OriginalBuffer) -> Result<usize> {
    let mut content = original.export_raw();
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(original.len())
}
