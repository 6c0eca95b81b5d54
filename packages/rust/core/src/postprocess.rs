//! Stage 6: best-effort post-processing.
//!
//! Each configured step is an external command run against the written
//! article. A step that cannot start, exits non-zero or overruns its timeout
//! is logged and the next step runs.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use newsroom_markdown::take_chars;
use newsroom_shared::PostProcessStep;

/// Placeholder in step arguments replaced by the article path.
pub const PATH_PLACEHOLDER: &str = "{path}";

const STDERR_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed(String),
    /// Enrichment step on a run with enrichment disabled.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
}

pub fn expand_args(args: &[String], path: &Path) -> Vec<String> {
    let path = path.to_string_lossy();
    args.iter()
        .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
        .collect()
}

async fn run_step(step: &PostProcessStep, path: &Path) -> StepStatus {
    let mut command = Command::new(&step.program);
    command
        .args(expand_args(&step.args, path))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => return StepStatus::Failed(format!("could not start `{}`: {e}", step.program)),
    };

    match timeout(Duration::from_secs(step.timeout_secs), child.wait_with_output()).await {
        Err(_) => StepStatus::Failed(format!("timed out after {}s", step.timeout_secs)),
        Ok(Err(e)) => StepStatus::Failed(e.to_string()),
        Ok(Ok(output)) if output.status.success() => StepStatus::Succeeded,
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            StepStatus::Failed(format!(
                "{}: {}",
                output.status,
                take_chars(stderr.trim(), STDERR_EXCERPT_CHARS)
            ))
        }
    }
}

/// Run every step against `path`, in order.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn post_process(
    steps: &[PostProcessStep],
    path: &Path,
    skip_enrichment: bool,
) -> Vec<StepReport> {
    let mut reports = Vec::with_capacity(steps.len());

    for step in steps {
        let status = if skip_enrichment && step.enrichment {
            StepStatus::Skipped
        } else {
            run_step(step, path).await
        };

        match &status {
            StepStatus::Succeeded => info!(step = %step.name, "post-process step done"),
            StepStatus::Skipped => info!(step = %step.name, "enrichment disabled, step skipped"),
            StepStatus::Failed(reason) => {
                warn!(step = %step.name, %reason, "post-process step failed, continuing");
            }
        }

        reports.push(StepReport {
            name: step.name.clone(),
            status,
        });
    }

    reports
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn step(name: &str, program: &str, args: &[&str]) -> PostProcessStep {
        PostProcessStep {
            name: name.into(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_secs: 10,
            enrichment: false,
        }
    }

    fn temp_article() -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("nr-post-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("2025-06-02-1-test.md");
        std::fs::write(&path, "本文\n").unwrap();
        (dir, path)
    }

    #[test]
    fn placeholder_is_substituted() {
        let args = vec!["--fix".to_string(), "{path}".to_string(), "x={path}".to_string()];
        assert_eq!(
            expand_args(&args, Path::new("/tmp/a.md")),
            ["--fix", "/tmp/a.md", "x=/tmp/a.md"]
        );
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_steps() {
        let (dir, path) = temp_article();
        let steps = vec![
            step("missing", "newsroom-no-such-tool", &["{path}"]),
            step("failing", "false", &[]),
            step("append", "sh", &["-c", "echo done >> \"$0\"", "{path}"]),
        ];

        let reports = post_process(&steps, &path, false).await;
        assert!(matches!(reports[0].status, StepStatus::Failed(_)));
        assert!(matches!(reports[1].status, StepStatus::Failed(_)));
        assert_eq!(reports[2].status, StepStatus::Succeeded);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "本文\ndone\n");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn overrunning_step_times_out() {
        let (dir, path) = temp_article();
        let mut slow = step("slow", "sleep", &["5"]);
        slow.timeout_secs = 0;

        let reports = post_process(&[slow], &path, false).await;
        assert_eq!(
            reports[0].status,
            StepStatus::Failed("timed out after 0s".into())
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn enrichment_can_be_skipped() {
        let (dir, path) = temp_article();
        let mut enrich = step("enrich", "sh", &["-c", "echo linked >> \"$0\"", "{path}"]);
        enrich.enrichment = true;

        let reports = post_process(std::slice::from_ref(&enrich), &path, true).await;
        assert_eq!(reports[0].status, StepStatus::Skipped);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "本文\n");

        let reports = post_process(&[enrich], &path, false).await;
        assert_eq!(reports[0].status, StepStatus::Succeeded);
        std::fs::remove_dir_all(&dir).ok();
    }
}
