// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Markdown answers rendered as styled terminal text.
//!
//! Only styling is added.  Every character of text the model wrote,
//! citation tags included, reaches the terminal unchanged.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Color, ContentStyle, Print, PrintStyledContent},
};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A run of text in one style.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: ContentStyle,
}

/// One output line.
pub type Line = Vec<Span>;

fn bold(mut s: ContentStyle) -> ContentStyle {
    s.attributes.set(Attribute::Bold);
    s
}

fn italic(mut s: ContentStyle) -> ContentStyle {
    s.attributes.set(Attribute::Italic);
    s
}

fn fg(mut s: ContentStyle, color: Color) -> ContentStyle {
    s.foreground_color = Some(color);
    s
}

fn heading_style(level: HeadingLevel) -> ContentStyle {
    let base = bold(ContentStyle::new());
    match level {
        HeadingLevel::H1 => fg(base, Color::Magenta),
        HeadingLevel::H2 => fg(base, Color::Cyan),
        _ => base,
    }
}

/// Convert markdown into styled lines.
pub fn render_markdown(md: &str) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut current: Line = Vec::new();
    let mut style_stack: Vec<ContentStyle> = vec![ContentStyle::new()];
    // Numbering state per open list; `None` for bullets.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut link_targets: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_cell = false;

    fn flush(lines: &mut Vec<Line>, current: &mut Line) {
        lines.push(std::mem::take(current));
    }
    fn blank(lines: &mut Vec<Line>) {
        if lines.last().map_or(false, |l| !l.is_empty()) {
            lines.push(Vec::new());
        }
    }

    let top = |stack: &[ContentStyle]| stack.last().copied().unwrap_or_default();

    let parser = Parser::new_ext(md, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                style_stack.push(heading_style(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                style_stack.pop();
                flush(&mut lines, &mut current);
                lines.push(Vec::new());
            }
            Event::Start(Tag::Strong) => {
                let s = bold(top(&style_stack));
                style_stack.push(s);
            }
            Event::Start(Tag::Emphasis) => {
                let s = italic(top(&style_stack));
                style_stack.push(s);
            }
            Event::Start(Tag::Strikethrough) => {
                let mut s = top(&style_stack);
                s.attributes.set(Attribute::CrossedOut);
                style_stack.push(s);
            }
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                style_stack.pop();
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                link_targets.push(dest_url.to_string());
                let mut s = fg(top(&style_stack), Color::Blue);
                s.attributes.set(Attribute::Underlined);
                style_stack.push(s);
            }
            Event::End(TagEnd::Link) => {
                style_stack.pop();
                if let Some(url) = link_targets.pop() {
                    current.push(Span { text: format!(" ({url})"), style: fg(ContentStyle::new(), Color::DarkGrey) });
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                style_stack.push(fg(ContentStyle::new(), Color::Cyan));
            }
            Event::End(TagEnd::CodeBlock) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                style_stack.pop();
                lines.push(Vec::new());
            }
            Event::Start(Tag::List(start)) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    blank(&mut lines);
                }
            }
            Event::Start(Tag::Item) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let marker = match lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{indent}  {n}. ");
                        *n += 1;
                        m
                    }
                    _ => format!("{indent}  • "),
                };
                current.push(Span { text: marker, style: ContentStyle::new() });
            }
            Event::End(TagEnd::Item) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
            }
            Event::Start(Tag::BlockQuote(_)) => {
                style_stack.push(fg(top(&style_stack), Color::DarkGrey));
                current.push(Span { text: "│ ".into(), style: fg(ContentStyle::new(), Color::DarkGrey) });
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                style_stack.pop();
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                blank(&mut lines);
            }
            Event::End(TagEnd::Paragraph) => {
                flush(&mut lines, &mut current);
                if lists.is_empty() {
                    lines.push(Vec::new());
                }
            }
            Event::Start(Tag::TableCell) => {
                in_cell = true;
                cell.clear();
            }
            Event::End(TagEnd::TableCell) => {
                in_cell = false;
                row.push(std::mem::take(&mut cell).trim().to_string());
            }
            Event::End(TagEnd::TableHead) => {
                let text = format!("| {} |", row.join(" | "));
                lines.push(vec![Span { text, style: bold(ContentStyle::new()) }]);
                row.clear();
            }
            Event::End(TagEnd::TableRow) => {
                lines.push(vec![Span { text: format!("| {} |", row.join(" | ")), style: ContentStyle::new() }]);
                row.clear();
            }
            Event::End(TagEnd::Table) => lines.push(Vec::new()),
            Event::Text(t) if in_cell => cell.push_str(&t),
            Event::Code(t) if in_cell => cell.push_str(&format!("`{t}`")),
            Event::Text(t) => {
                let style = top(&style_stack);
                let mut parts = t.split('\n').peekable();
                while let Some(part) = parts.next() {
                    if !part.is_empty() {
                        current.push(Span { text: part.to_string(), style });
                    }
                    if parts.peek().is_some() {
                        flush(&mut lines, &mut current);
                    }
                }
            }
            Event::Code(t) => {
                current.push(Span { text: format!("`{t}`"), style: fg(ContentStyle::new(), Color::Yellow) });
            }
            Event::Html(t) | Event::InlineHtml(t) => {
                current.push(Span { text: t.trim_end_matches('\n').to_string(), style: top(&style_stack) });
            }
            Event::SoftBreak => {
                current.push(Span { text: " ".into(), style: ContentStyle::new() });
            }
            Event::HardBreak => flush(&mut lines, &mut current),
            Event::Rule => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                lines.push(vec![Span { text: "─".repeat(40), style: fg(ContentStyle::new(), Color::DarkGrey) }]);
                lines.push(Vec::new());
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Text of a line without styling.
pub fn plain(line: &Line) -> String {
    line.iter().map(|s| s.text.as_str()).collect()
}

/// Write rendered lines to `out`.
pub fn write_lines(out: &mut impl Write, lines: &[Line]) -> io::Result<()> {
    for line in lines {
        for span in line {
            queue!(out, PrintStyledContent(span.style.apply(span.text.as_str())))?;
        }
        queue!(out, Print("\n"))?;
    }
    out.flush()
}

/// Render `md` to stdout.
pub fn print_markdown(md: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write_lines(&mut out, &render_markdown(md))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(md: &str) -> Vec<String> {
        render_markdown(md).iter().map(plain).collect()
    }

    #[test]
    fn citation_tags_survive_rendering() {
        let md = "**Dravet syndrome** is a rare epilepsy. [Source: OMIM, Reliability: Expert-Curated]";
        let text = text_of(md).join("\n");
        assert!(text.contains("[Source: OMIM, Reliability: Expert-Curated]"), "{text}");
        assert!(text.starts_with("Dravet syndrome is a rare epilepsy."));
    }

    #[test]
    fn bullets_and_numbers_get_markers() {
        let md = "- one [Source: PubMed, Reliability: Peer-reviewed Research]\n- two\n\n1. first\n2. second\n";
        let lines = text_of(md);
        assert!(lines.contains(&"  • one [Source: PubMed, Reliability: Peer-reviewed Research]".to_string()));
        assert!(lines.contains(&"  • two".to_string()));
        assert!(lines.contains(&"  1. first".to_string()));
        assert!(lines.contains(&"  2. second".to_string()));
    }

    #[test]
    fn headings_are_bold() {
        let lines = render_markdown("## Clinical trials\n\nNone recruiting.");
        assert_eq!(plain(&lines[0]), "Clinical trials");
        assert!(lines[0][0].style.attributes.has(Attribute::Bold));
        assert_eq!(plain(&lines[2]), "None recruiting.");
    }

    #[test]
    fn links_keep_their_target() {
        let lines = text_of("See [NCT01234567](https://clinicaltrials.gov/study/NCT01234567).");
        assert_eq!(lines[0], "See NCT01234567 (https://clinicaltrials.gov/study/NCT01234567).");
    }

    #[test]
    fn tables_render_as_pipe_rows() {
        let md = "| Gene | Inheritance |\n|---|---|\n| SCN1A | AD |\n";
        let lines = text_of(md);
        assert_eq!(lines[0], "| Gene | Inheritance |");
        assert_eq!(lines[1], "| SCN1A | AD |");
    }

    #[test]
    fn code_block_lines_are_kept() {
        let lines = text_of("```\nc.1234A>G\np.Arg412Gly\n```\n");
        assert_eq!(lines, vec!["c.1234A>G", "p.Arg412Gly"]);
    }

    #[test]
    fn write_lines_emits_all_text() {
        let mut buf = Vec::new();
        write_lines(&mut buf, &render_markdown("plain answer")).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("plain answer"));
        assert!(out.ends_with('\n'));
    }
}
