//! Command-line argument parsing for agentj-stream.
//!
//! This module handles parsing command-line arguments and determining
//! which CLI command to execute.

pub const USAGE: &str = "\
Usage:
  agentj-stream chat <prompt> [--conversation <id>] [--retry]
  agentj-stream task <planId> [--retry]
  agentj-stream subscribe <url>
  agentj-stream --version
  agentj-stream --help";

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Stream a chat reply
    Chat {
        prompt: String,
        conversation: Option<String>,
        retry: bool,
    },
    /// Stream task progress for a plan
    Task { plan_id: String, retry: bool },
    /// Follow a GET event-source endpoint
    Subscribe { url: String },
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Arguments could not be understood
    Invalid(String),
}

/// Parse command-line arguments and return the appropriate command.
///
/// # Arguments
///
/// * `args` - Iterator of command-line arguments (typically `std::env::args()`)
///
/// # Examples
///
/// ```
/// use agentj_stream::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["agentj-stream".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut positional = Vec::new();
    let mut conversation = None;
    let mut retry = false;

    // Skip the program name
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            "--retry" => retry = true,
            "--conversation" | "-c" => match args.next() {
                Some(id) => conversation = Some(id),
                None => return CliCommand::Invalid("--conversation needs a value".to_string()),
            },
            flag if flag.starts_with("--") => {
                return CliCommand::Invalid(format!("unknown flag: {}", flag))
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(command) = positional.next() else {
        return CliCommand::Help;
    };
    let rest: Vec<String> = positional.collect();

    match command.as_str() {
        "chat" if !rest.is_empty() => CliCommand::Chat {
            prompt: rest.join(" "),
            conversation,
            retry,
        },
        "task" if rest.len() == 1 => CliCommand::Task {
            plan_id: rest[0].clone(),
            retry,
        },
        "subscribe" if rest.len() == 1 => CliCommand::Subscribe {
            url: rest[0].clone(),
        },
        "chat" | "task" | "subscribe" => {
            CliCommand::Invalid(format!("wrong number of arguments for '{}'", command))
        }
        other => CliCommand::Invalid(format!("unknown command: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliCommand {
        let mut all = vec!["agentj-stream".to_string()];
        all.extend(args.iter().map(|a| a.to_string()));
        parse_args(all.into_iter())
    }

    #[test]
    fn test_parse_version_flag() {
        assert_eq!(parse(&["--version"]), CliCommand::Version);
        assert_eq!(parse(&["-V"]), CliCommand::Version);
    }

    #[test]
    fn test_parse_no_args() {
        assert_eq!(parse(&[]), CliCommand::Help);
    }

    #[test]
    fn test_parse_chat() {
        assert_eq!(
            parse(&["chat", "hello", "there"]),
            CliCommand::Chat {
                prompt: "hello there".to_string(),
                conversation: None,
                retry: false,
            }
        );
    }

    #[test]
    fn test_parse_chat_with_conversation_and_retry() {
        assert_eq!(
            parse(&["chat", "--conversation", "c-1", "hi", "--retry"]),
            CliCommand::Chat {
                prompt: "hi".to_string(),
                conversation: Some("c-1".to_string()),
                retry: true,
            }
        );
    }

    #[test]
    fn test_parse_task() {
        assert_eq!(
            parse(&["task", "plan-42"]),
            CliCommand::Task {
                plan_id: "plan-42".to_string(),
                retry: false,
            }
        );
    }

    #[test]
    fn test_parse_subscribe() {
        assert_eq!(
            parse(&["subscribe", "http://localhost:8080/events"]),
            CliCommand::Subscribe {
                url: "http://localhost:8080/events".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse(&["chat"]), CliCommand::Invalid(_)));
        assert!(matches!(parse(&["task", "a", "b"]), CliCommand::Invalid(_)));
        assert!(matches!(parse(&["launch"]), CliCommand::Invalid(_)));
        assert!(matches!(parse(&["--unknown"]), CliCommand::Invalid(_)));
        assert!(matches!(parse(&["chat", "hi", "--conversation"]), CliCommand::Invalid(_)));
    }
}
