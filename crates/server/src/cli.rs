//! # Terminal Review
//!
//! `draftloop run <topic>`: drive one session from the terminal, printing
//! each draft and reading review decisions from stdin.

use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use draftloop_core::{Coordinator, FeedbackOutcome, PipelineError, SessionStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A parsed review command
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Approve,
    Revise(String),
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "a" | "approve" => Ok(Command::Approve),
        "q" | "quit" => Ok(Command::Quit),
        "r" | "revise" if rest.is_empty() => {
            Err("revise needs feedback, e.g. `r add more statistics`".into())
        }
        "r" | "revise" => Ok(Command::Revise(rest.to_string())),
        "" => Err("enter a command".into()),
        other => Err(format!("unknown command '{}'", other)),
    }
}

/// Run one session interactively against stdin/stdout
pub async fn run_review(coordinator: &Coordinator, topic: &str) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    review_loop(coordinator, topic, stdin, stdout, POLL_INTERVAL).await
}

async fn review_loop<R, W>(
    coordinator: &Coordinator,
    topic: &str,
    input: R,
    mut output: W,
    poll: Duration,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let id = coordinator.start_session(topic).await?;
    output
        .write_all(format!("Researching \"{}\" (session {})...\n", topic, id).as_bytes())
        .await?;

    loop {
        let snapshot = coordinator.wait_until_settled(&id, poll).await?;
        match snapshot.status {
            SessionStatus::Interrupted => {
                let banner = format!(
                    "\n===== Draft (revision {}) =====\n{}\n================================\n",
                    snapshot.revision_count, snapshot.draft
                );
                output.write_all(banner.as_bytes()).await?;
            }
            SessionStatus::Finished => {
                output.write_all(b"Session finished.\n").await?;
                return Ok(());
            }
            SessionStatus::Error => {
                let detail = snapshot.error_detail.unwrap_or_default();
                output
                    .write_all(format!("Session failed: {}\n", detail).as_bytes())
                    .await?;
                return Ok(());
            }
            SessionStatus::Starting | SessionStatus::Running => continue,
        }

        // Read until a decision is accepted
        loop {
            output
                .write_all(b"[a]pprove / [r]evise <feedback> / [q]uit > ")
                .await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\nInput closed, leaving session as is.\n").await?;
                return Ok(());
            };
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    output.write_all(format!("{}\n", e).as_bytes()).await?;
                    continue;
                }
            };

            let result = match &command {
                Command::Quit => return Ok(()),
                Command::Approve => coordinator.submit_feedback(&id, "approve", None).await,
                Command::Revise(text) => {
                    coordinator
                        .submit_feedback(&id, "revise", Some(text.as_str()))
                        .await
                }
            };

            match result {
                Ok(FeedbackOutcome::Revising) => {
                    output.write_all(b"Revising...\n").await?;
                    break;
                }
                Ok(_) => break,
                Err(e @ PipelineError::InvalidInput(_)) => {
                    output.write_all(format!("{}\n", e).as_bytes()).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloop_core::testing::{EchoGenerator, StaticSearcher};
    use draftloop_core::CoordinatorConfig;
    use std::sync::Arc;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("a"), Ok(Command::Approve));
        assert_eq!(parse_command(" Approve "), Ok(Command::Approve));
        assert_eq!(
            parse_command("r add more statistics"),
            Ok(Command::Revise("add more statistics".into()))
        );
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert!(parse_command("r").is_err());
        assert!(parse_command("").is_err());
        assert!(parse_command("x").is_err());
    }

    #[tokio::test]
    async fn test_review_loop_revise_then_approve() {
        let coordinator = Coordinator::new(
            CoordinatorConfig::default(),
            Arc::new(EchoGenerator::new()),
            Arc::new(StaticSearcher::new("facts")),
        );
        let input: &[u8] = b"huh\nr add more statistics\na\n";
        let mut output = Vec::new();

        review_loop(
            &coordinator,
            "solar energy",
            input,
            &mut output,
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Draft (revision 0)"));
        assert!(text.contains("unknown command 'huh'"));
        assert!(text.contains("Draft (revision 1)"));
        assert!(text.ends_with("Session finished.\n"));

        let sessions = coordinator.list_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Finished);
    }
}
