use crate::messaging::models::Request;

use once_cell::sync::Lazy;
use regex::Regex;
use std::iter::Iterator;

const COMMANDS: [&'static str; 5] = ["!help", "!refresh", "!status", "!lookup", "!badge"];
// Words with optional "!" or "@" prefix. Handles may contain dots and dashes.
static REGEX_WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[!@]?[\w.\-]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Refresh,
    Status,
    Lookup(String),
    Badge(bool),
}

impl Command {
    pub fn is_command(input: &str) -> bool {
        REGEX_WORDS
            .find_iter(input)
            .map(|mat| mat.as_str())
            .next()
            .map(|start_with| COMMANDS.contains(&start_with))
            .unwrap_or_default()
    }

    /// Incomplete commands (`!lookup` without a handle, `!badge maybe`) fall
    /// back to the help message.
    pub fn build_from(input: &str) -> Command {
        let mut input = REGEX_WORDS.find_iter(input).map(|mat| mat.as_str());
        match input.next() {
            Some(cmd) if cmd == COMMANDS[1] => Command::Refresh,
            Some(cmd) if cmd == COMMANDS[2] => Command::Status,
            Some(cmd) if cmd == COMMANDS[3] => match input.next() {
                Some(handle) => Command::Lookup(handle.to_string()),
                None => Command::Help,
            },
            Some(cmd) if cmd == COMMANDS[4] => {
                match input.next().map(|arg| arg.to_lowercase()).as_deref() {
                    Some("on" | "true" | "1") => Command::Badge(true),
                    Some("off" | "false" | "0") => Command::Badge(false),
                    _ => Command::Help,
                }
            }
            _ => Command::Help,
        }
    }

    /// The service request behind the command, if it needs one.
    pub fn request(&self) -> Option<Request> {
        match self {
            Command::Help => None,
            Command::Refresh => Some(Request::Refresh),
            Command::Status => Some(Request::Status),
            Command::Lookup(handle) => Some(Request::Lookup {
                identity: handle.clone(),
            }),
            Command::Badge(enabled) => Some(Request::ToggleBadge { enabled: *enabled }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_commands() {
        assert!(Command::is_command("!refresh"));
        assert!(Command::is_command("  !lookup @foo"));
        assert!(!Command::is_command("refresh"));
        assert!(!Command::is_command("!unknown"));
        assert!(!Command::is_command(""));
    }

    #[test]
    fn builds_commands() {
        assert_eq!(Command::build_from("!refresh now"), Command::Refresh);
        assert_eq!(Command::build_from("!status"), Command::Status);
        assert_eq!(
            Command::build_from("!lookup @Some.User-1"),
            Command::Lookup("@Some.User-1".to_string())
        );
        assert_eq!(Command::build_from("!lookup"), Command::Help);
        assert_eq!(Command::build_from("!badge OFF"), Command::Badge(false));
        assert_eq!(Command::build_from("!badge on"), Command::Badge(true));
        assert_eq!(Command::build_from("!badge maybe"), Command::Help);
        assert_eq!(Command::build_from("!help"), Command::Help);
    }

    #[test]
    fn maps_to_requests() {
        assert_eq!(Command::Help.request(), None);
        assert_eq!(
            Command::Lookup("@foo".to_string()).request(),
            Some(Request::Lookup {
                identity: "@foo".to_string()
            })
        );
        assert_eq!(
            Command::Badge(false).request(),
            Some(Request::ToggleBadge { enabled: false })
        );
    }
}
