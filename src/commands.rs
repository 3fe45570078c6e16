// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Slash commands understood by the interactive chat.

use crossterm::style::Stylize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    /// `/role` alone shows the active role; with an argument switches it.
    Role(Option<String>),
    Clear,
    History,
    Examples,
    Quit,
    Unknown(String),
}

/// Parse a line of input.  `None` when the line is a query, not a command.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((c, a)) => (c, Some(a.trim()).filter(|a| !a.is_empty())),
        None => (trimmed, None),
    };

    Some(match cmd.to_lowercase().as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/role" => ChatCommand::Role(arg.map(str::to_string)),
        "/patient" => ChatCommand::Role(Some("patient".into())),
        "/physician" => ChatCommand::Role(Some("physician".into())),
        "/clear" => ChatCommand::Clear,
        "/history" => ChatCommand::History,
        "/examples" => ChatCommand::Examples,
        "/quit" | "/exit" | "/q" => ChatCommand::Quit,
        other => ChatCommand::Unknown(other.to_string()),
    })
}

pub const EXAMPLE_QUERIES: &[&str] = &[
    "What is Dravet syndrome and which gene is most often involved?",
    "Are there recruiting clinical trials for spinal muscular atrophy?",
    "What is the clinical significance of the SCN1A variant c.2589+3A>T?",
    "Which treatments are approved for Duchenne muscular dystrophy, and what are their side effects?",
    "Summarise recent research on gene therapy for Rett syndrome.",
];

pub fn print_help() {
    println!();
    println!("  {}", "Available commands:".bold());
    println!();
    for (cmd, what) in [
        ("/role patient|physician", "Switch answer style (clears the chat)"),
        ("/clear", "Clear chat history"),
        ("/history", "Show the conversation so far"),
        ("/examples", "Show example questions"),
        ("/help", "Show this help message"),
        ("/quit", "End the chat session"),
    ] {
        println!("  {} {}", format!("{cmd:<24}").cyan(), what);
    }
    println!();
    println!("  {}", "Ctrl+D also exits.".dark_grey());
    println!();
}

pub fn print_examples() {
    println!();
    println!("  {}", "Try asking:".bold());
    for q in EXAMPLE_QUERIES {
        println!("  • {q}");
    }
    println!();
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse("What is Dravet syndrome?"), None);
        assert_eq!(parse("  and/or  "), None);
    }

    #[test]
    fn role_with_and_without_argument() {
        assert_eq!(parse("/role physician"), Some(ChatCommand::Role(Some("physician".into()))));
        assert_eq!(parse("/ROLE   Patient  "), Some(ChatCommand::Role(Some("Patient".into()))));
        assert_eq!(parse("/role"), Some(ChatCommand::Role(None)));
        assert_eq!(parse("/physician"), Some(ChatCommand::Role(Some("physician".into()))));
    }

    #[test]
    fn aliases() {
        assert_eq!(parse("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
        assert_eq!(parse("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse("/history"), Some(ChatCommand::History));
        assert_eq!(parse("/examples"), Some(ChatCommand::Examples));
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(parse("/frobnicate now"), Some(ChatCommand::Unknown("/frobnicate".into())));
    }
}
