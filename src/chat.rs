// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Interactive and single-shot front-ends.

use std::io::{self, IsTerminal, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use biochat_config::Config;
use biochat_core::{
    get_session, AgentEvent, AgentSession, ConversationState, RoleTag, Speaker,
};

use crate::commands::{self, ChatCommand};
use crate::render;

const SEARCHING: &str = "🔍 Searching biomedical databases...";

const DESCRIPTION: &str = "Get evidence-based answers from authoritative databases including \
PubMed, ClinicalTrials.gov, OMIM, ClinVar, cBioPortal, and more. Specialized for rare genetic \
diseases like epilepsy, neuromuscular disorders, and metabolic conditions.";

const DISCLAIMER: &str = "BioChat provides information, not medical advice. It does not diagnose \
or recommend treatment. Always consult a healthcare provider or rare-disease specialist.";

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Mirror agent progress on the spinner until the query finishes.
async fn show_progress(bar: ProgressBar, mut rx: mpsc::Receiver<AgentEvent>) {
    while let Some(ev) = rx.recv().await {
        match ev {
            AgentEvent::ToolCallStarted(call) => {
                bar.set_message(format!("Querying {}...", call.name));
            }
            AgentEvent::ToolCallFinished { tool_name, is_error, .. } => {
                let mark = if is_error { "✗".red() } else { "✓".green() };
                bar.println(format!("  {mark} {tool_name}"));
                bar.set_message(SEARCHING.to_string());
            }
            AgentEvent::TokenUsage { input, output } => {
                debug!(input, output, "completion usage");
            }
            AgentEvent::ModelRequest { .. } => {}
            AgentEvent::TurnComplete => break,
        }
    }
    bar.finish_and_clear();
}

/// Run one query through the session while showing progress on stderr.
async fn answer(session: &AgentSession, query: &str, role: RoleTag) -> String {
    let (tx, rx) = mpsc::channel(64);
    let progress = tokio::spawn(show_progress(spinner(SEARCHING), rx));
    let answer = session.process_query_observed(query, role, Some(&tx)).await;
    drop(tx);
    let _ = progress.await;
    answer
}

async fn connect(config: &Config) -> anyhow::Result<Arc<AgentSession>> {
    let bar = spinner("Connecting to biomedical tools...");
    let result = get_session(config).await;
    bar.finish_and_clear();
    Ok(result?)
}

// ── Single-shot ──────────────────────────────────────────────────────────────

/// Answer one query (argument or stdin) and exit.  Construction errors are
/// returned; query errors are printed as the answer.
pub async fn run_headless(config: Config, role: RoleTag, prompt: Option<String>) -> anyhow::Result<()> {
    let query = match prompt {
        Some(p) => p,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading query from stdin")?;
            buf
        }
    };
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("no query given: pass it as an argument or on stdin");
    }

    let session = connect(&config).await.context("could not start BioChat")?;
    let text = answer(&session, query, role).await;

    if io::stdout().is_terminal() {
        render::print_markdown(&text)?;
    } else {
        println!("{text}");
    }
    Ok(())
}

// ── Interactive ──────────────────────────────────────────────────────────────

fn print_header(config: &Config) {
    println!();
    println!("  {}", "🧬 BioChat".bold().magenta());
    println!("  {}", "Rare Disease Query Assistant".dark_grey());
    println!();
    for line in textwrap(DESCRIPTION, 76) {
        println!("  {line}");
    }
    if config.chat.show_disclaimer {
        println!();
        for line in textwrap(DISCLAIMER, 74) {
            println!("  {}", format!("⚠ {line}").yellow());
        }
    }
    println!();
    println!("  {}", "Type /help for commands, /examples for ideas, Ctrl+D to exit".dark_grey());
    println!();
}

/// Greedy word wrap for the fixed header texts.
fn textwrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn print_role(role: RoleTag) {
    println!("  {} {}", "Role:".bold(), role.label().cyan());
}

fn print_error(context: &str, err: &anyhow::Error) {
    eprintln!("  {} {context}: {err:#}", "Error:".red().bold());
}

struct Chat {
    config: Config,
    session: Option<Arc<AgentSession>>,
    conversation: ConversationState,
}

impl Chat {
    fn new(config: Config, role: RoleTag) -> Self {
        Self { config, session: None, conversation: ConversationState::new(role) }
    }

    /// The shared session, built on the first query.  A failure is shown
    /// and the next query tries again.
    async fn session(&mut self) -> Option<Arc<AgentSession>> {
        if self.session.is_none() {
            match connect(&self.config).await {
                Ok(s) => {
                    debug!(session = %s.id(), tools = s.tool_names().len(), "session attached");
                    self.session = Some(s);
                }
                Err(e) => print_error("could not start the BioChat agent", &e),
            }
        }
        self.session.clone()
    }

    async fn reset_agent_history(&self) {
        if let Some(s) = &self.session {
            s.clear_history().await;
        }
    }

    async fn ask(&mut self, query: &str) -> anyhow::Result<()> {
        let Some(session) = self.session().await else {
            return Ok(());
        };
        self.conversation.append(Speaker::User, query)?;
        let text = answer(&session, query, self.conversation.role()).await;
        self.show_answer(text, &mut io::stdout())
    }

    /// Record the reply, then display it.  A display failure is reported
    /// and the chat goes on with the reply kept in the transcript.
    fn show_answer(&mut self, text: String, out: &mut impl Write) -> anyhow::Result<()> {
        let lines = render::render_markdown(&text);
        self.conversation.append(Speaker::Assistant, text)?;
        let shown = writeln!(out)
            .and_then(|_| render::write_lines(out, &lines))
            .and_then(|_| writeln!(out));
        if let Err(e) = shown {
            print_error("could not display the answer", &e.into());
        }
        Ok(())
    }

    /// Returns false when the chat should end.
    async fn command(&mut self, cmd: ChatCommand) -> anyhow::Result<bool> {
        match cmd {
            ChatCommand::Quit => return Ok(false),
            ChatCommand::Help => commands::print_help(),
            ChatCommand::Examples => commands::print_examples(),
            ChatCommand::Role(None) => print_role(self.conversation.role()),
            ChatCommand::Role(Some(arg)) => match arg.parse::<RoleTag>() {
                Ok(role) => {
                    if self.conversation.set_role(role) {
                        self.reset_agent_history().await;
                        println!("  Switched to {}. Chat history cleared.", role.label().cyan());
                    } else {
                        print_role(role);
                    }
                }
                Err(e) => eprintln!("  {} {e}", "Error:".red().bold()),
            },
            ChatCommand::Clear => {
                if !self.conversation.is_empty() {
                    self.conversation.clear();
                    self.reset_agent_history().await;
                    println!("  🗑️ Chat history cleared.");
                }
            }
            ChatCommand::History => self.print_history()?,
            ChatCommand::Unknown(c) => {
                eprintln!("  Unknown command {c}. Type /help for the list.");
            }
        }
        Ok(true)
    }

    fn print_history(&self) -> io::Result<()> {
        if self.conversation.is_empty() {
            println!("  {}", "No messages yet.".dark_grey());
            return Ok(());
        }
        for msg in self.conversation.all() {
            println!();
            match msg.role {
                Speaker::User => {
                    println!("{} {}", "You ›".cyan().bold(), msg.content);
                }
                Speaker::Assistant => {
                    println!("{}", "BioChat ›".magenta().bold());
                    render::print_markdown(&msg.content)?;
                }
            }
        }
        println!();
        Ok(())
    }

    fn prompt(&self) -> io::Result<()> {
        let mut out = io::stdout();
        write!(out, "{} ", format!("[{}] ›", self.conversation.role().label()).cyan())?;
        out.flush()
    }
}

/// Line-based chat loop on stdin until `/quit` or end of input.
pub async fn run_interactive(config: Config, role: RoleTag) -> anyhow::Result<()> {
    print_header(&config);
    let mut chat = Chat::new(config, role);
    print_role(role);
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        chat.prompt()?;
        let Some(line) = lines.next_line().await.context("reading input")? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match commands::parse(input) {
            Some(cmd) => {
                if !chat.command(cmd).await? {
                    break;
                }
            }
            None => chat.ask(input).await?,
        }
    }
    Ok(())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textwrap_respects_width_and_keeps_words() {
        let lines = textwrap(DESCRIPTION, 40);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
        assert_eq!(lines.join(" "), DESCRIPTION.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[tokio::test]
    async fn role_switch_clears_conversation() {
        let mut chat = Chat::new(Config::default(), RoleTag::Patient);
        chat.conversation.append(Speaker::User, "q").unwrap();
        chat.conversation.append(Speaker::Assistant, "a").unwrap();

        assert!(chat.command(ChatCommand::Role(Some("physician".into()))).await.unwrap());
        assert_eq!(chat.conversation.role(), RoleTag::Physician);
        assert!(chat.conversation.is_empty());
    }

    #[tokio::test]
    async fn invalid_role_keeps_state() {
        let mut chat = Chat::new(Config::default(), RoleTag::Physician);
        chat.conversation.append(Speaker::User, "q").unwrap();

        assert!(chat.command(ChatCommand::Role(Some("nurse".into()))).await.unwrap());
        assert_eq!(chat.conversation.role(), RoleTag::Physician);
        assert_eq!(chat.conversation.len(), 1);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn answer_is_kept_when_display_fails() {
        let mut chat = Chat::new(Config::default(), RoleTag::Patient);
        chat.conversation.append(Speaker::User, "What is Dravet syndrome?").unwrap();

        chat.show_answer("**Dravet** syndrome is a rare epilepsy.".into(), &mut BrokenPipe).unwrap();

        let msgs = chat.conversation.all();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].role, Speaker::Assistant);
        assert_eq!(msgs[1].content, "**Dravet** syndrome is a rare epilepsy.");
    }

    #[test]
    fn answer_is_written_to_output() {
        let mut chat = Chat::new(Config::default(), RoleTag::Physician);
        chat.conversation.append(Speaker::User, "q").unwrap();

        let mut out = Vec::new();
        chat.show_answer("plain reply".into(), &mut out).unwrap();
        assert!(String::from_utf8_lossy(&out).contains("plain reply"));
        assert_eq!(chat.conversation.len(), 2);
    }

    #[tokio::test]
    async fn clear_and_quit() {
        let mut chat = Chat::new(Config::default(), RoleTag::Patient);
        chat.conversation.append(Speaker::User, "q").unwrap();
        assert!(chat.command(ChatCommand::Clear).await.unwrap());
        assert!(chat.conversation.is_empty());
        assert_eq!(chat.conversation.role(), RoleTag::Patient);

        assert!(!chat.command(ChatCommand::Quit).await.unwrap());
    }
}
