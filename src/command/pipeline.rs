//! Chained external process execution.
//!
//! Runs an ordered list of argv lists as one pipeline: stage N's stdout
//! feeds stage N+1's stdin, stderr passes through to the caller, and the
//! final stage's stdout is captured and returned. All stages are started
//! before any is awaited so piped data can flow between them.
//!
//! No timeout is applied; a hung stage hangs the run.

use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::error::PipelineError;

/// Run `stages` as a single pipeline and return the final stage's stdout.
///
/// Fails with [`PipelineError::Launch`] if a stage cannot be spawned (later
/// stages are then never started), or with [`PipelineError::Execution`] for
/// the first started stage that exits non-zero or dies on a signal. Every
/// started stage is waited on either way; partial output is discarded on
/// failure.
pub async fn run(stages: &[Vec<String>]) -> Result<Vec<u8>, PipelineError> {
    let mut children: Vec<(Child, String)> = Vec::with_capacity(stages.len());
    let mut upstream: Option<Stdio> = None;

    for (stage, argv) in stages.iter().enumerate() {
        let program = argv[0].clone();
        let mut command = Command::new(&program);
        command
            .args(&argv[1..])
            .stdin(upstream.take().unwrap_or_else(Stdio::null))
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(|source| PipelineError::Launch {
            stage,
            program: program.clone(),
            source,
        })?;

        if stage + 1 < stages.len() {
            let stdout = child.stdout.take().expect("stage stdout is piped");
            upstream = Some(stdout.try_into()?);
        }
        children.push((child, program));
    }

    // Drain the final stage's stdout before reaping anything, so pipe
    // buffers keep flowing while intermediate stages run.
    let mut output = Vec::new();
    if let Some((last, _)) = children.last_mut() {
        let mut stdout = last.stdout.take().expect("stage stdout is piped");
        stdout.read_to_end(&mut output).await?;
    }

    let mut failure = None;
    for (stage, (child, program)) in children.iter_mut().enumerate() {
        let status = child.wait().await?;
        if !status.success() && failure.is_none() {
            failure = Some(PipelineError::Execution {
                stage,
                program: program.clone(),
                status,
            });
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn single_stage_output_is_captured() {
        let output = run(&[argv(&["echo", "hello"])]).await.unwrap();
        assert_eq!(output, b"hello\n");
    }

    #[tokio::test]
    async fn stdout_feeds_the_next_stage() {
        let output = run(&[argv(&["sh", "-c", "echo upstream"]), argv(&["cat"])])
            .await
            .unwrap();
        assert_eq!(output, b"upstream\n");
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_failure() {
        let result = run(&[argv(&["mail-herald-no-such-program"])]).await;
        match result {
            Err(PipelineError::Launch { stage: 0, program, .. }) => {
                assert_eq!(program, "mail-herald-no-such-program");
            }
            other => panic!("expected launch failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn middle_stage_failure_reports_its_index_and_discards_output() {
        let result = run(&[
            argv(&["true"]),
            argv(&["sh", "-c", "exit 3"]),
            argv(&["cat"]),
        ])
        .await;
        match result {
            Err(PipelineError::Execution { stage, status, .. }) => {
                assert_eq!(stage, 1);
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected execution failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_failing_stage_wins() {
        let result = run(&[
            argv(&["sh", "-c", "exit 1"]),
            argv(&["sh", "-c", "cat >/dev/null; exit 2"]),
        ])
        .await;
        match result {
            Err(PipelineError::Execution { stage, status, .. }) => {
                assert_eq!(stage, 0);
                assert_eq!(status.code(), Some(1));
            }
            other => panic!("expected execution failure, got {other:?}"),
        }
    }
}
