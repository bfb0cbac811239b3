//! Child process whose output is tailed
//!
//! `--exec` runs a command with stdout and stderr appended to the tailed
//! file. When it exits the [`TerminationNotifier`] fires, which makes the
//! console flush whatever is left in the file and stop tailing.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use logtail_core::TerminationNotifier;

/// Start `command` logging into `log_path`
///
/// The returned task resolves to the exit code once termination listeners
/// have run. Aborting the task kills the child.
pub fn spawn_logged(
    command: &[String],
    log_path: &Path,
    notifier: TerminationNotifier,
) -> Result<JoinHandle<Option<i32>>> {
    let Some((program, args)) = command.split_first() else {
        bail!("--exec requires a command");
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open {} for writing", log_path.display()))?;
    let stderr = stdout.try_clone()?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start '{}'", program))?;
    info!(pid = ?child.id(), program = %program, "Started child process");

    Ok(tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => {
                info!(%status, "Child process exited");
                status.code()
            }
            Err(e) => {
                warn!(error = %e, "Failed to wait for child process");
                None
            }
        };

        // Listeners stop tailers and wait for their threads
        if let Err(e) = tokio::task::spawn_blocking(move || notifier.notify_terminated()).await {
            warn!(error = %e, "Termination listeners failed");
        }
        code
    }))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use logtail_core::TerminationSource;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_output_appended_and_listeners_notified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("child.log");
        let notifier = TerminationNotifier::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            notifier.subscribe(Box::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let handle = spawn_logged(&sh("echo out; echo err >&2; exit 3"), &path, notifier).unwrap();
        assert_eq!(handle.await.unwrap(), Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("out\n"));
        assert!(content.contains("err\n"));
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = spawn_logged(&[], &dir.path().join("x.log"), TerminationNotifier::new());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_program_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let command = vec!["logtail-no-such-program".to_string()];
        let result = spawn_logged(&command, &dir.path().join("x.log"), TerminationNotifier::new());
        assert!(result.is_err());
    }
}
