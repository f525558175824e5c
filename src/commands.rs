/// Result of one remote command, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Error(String),
    Output(String),
}

impl CommandResult {
    pub fn output(text: impl Into<String>) -> Self {
        CommandResult::Output(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        CommandResult::Error(text.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CommandResult::Error(_))
    }
}

/// Commands resolved without a round trip to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCommand {
    Empty,
    Clear,
    Help,
}

impl LocalCommand {
    /// Matches a submitted line against the local command set.
    /// Returns `None` when the line has to go to the backend.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => Some(LocalCommand::Empty),
            "clear" | "cls" => Some(LocalCommand::Clear),
            "help" => Some(LocalCommand::Help),
            _ => None,
        }
    }
}

/// One row of the `help` reference.
#[derive(Debug, Clone, Copy)]
pub struct HelpEntry {
    pub usage: &'static str,
    pub description: &'static str,
}

// Everything after `help` is executed by the backend, not here.
pub const HELP_ENTRIES: &[HelpEntry] = &[
    HelpEntry { usage: "clear/cls", description: "clear the terminal" },
    HelpEntry { usage: "help", description: "show this reference" },
    HelpEntry { usage: "ls", description: "list directory contents" },
    HelpEntry { usage: "pwd", description: "print the working directory" },
    HelpEntry { usage: "cat [file]", description: "print a file" },
    HelpEntry { usage: "ps", description: "list processes" },
    HelpEntry { usage: "date", description: "show the current date and time" },
    HelpEntry { usage: "whoami", description: "show the user name" },
    HelpEntry { usage: "uname -a", description: "show system information" },
    HelpEntry { usage: "echo [text]", description: "print text" },
];

pub const HELP_TITLE: &str = "Available commands:";
pub const HELP_NOTE: &str = "Some commands are restricted by the backend for security reasons.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_commands() {
        assert_eq!(LocalCommand::parse(""), Some(LocalCommand::Empty));
        assert_eq!(LocalCommand::parse("   \t"), Some(LocalCommand::Empty));
        assert_eq!(LocalCommand::parse("clear"), Some(LocalCommand::Clear));
        assert_eq!(LocalCommand::parse("  cls "), Some(LocalCommand::Clear));
        assert_eq!(LocalCommand::parse("help"), Some(LocalCommand::Help));
    }

    #[test]
    fn test_remote_commands_are_not_local() {
        assert_eq!(LocalCommand::parse("ls -la"), None);
        assert_eq!(LocalCommand::parse("clear all"), None);
        assert_eq!(LocalCommand::parse("HELP"), None);
        assert_eq!(LocalCommand::parse("uname -a"), None);
    }

    #[test]
    fn test_help_lists_backend_commands() {
        let usages: Vec<&str> = HELP_ENTRIES.iter().map(|e| e.usage).collect();
        for cmd in ["ls", "pwd", "cat [file]", "ps", "date", "whoami", "uname -a", "echo [text]"] {
            assert!(usages.contains(&cmd), "missing {}", cmd);
        }
    }

    #[test]
    fn test_command_result_kind() {
        assert!(CommandResult::error("nope").is_error());
        assert!(!CommandResult::output("ok").is_error());
    }
}
