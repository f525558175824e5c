// Pure rendering: every function here turns data into surface operations
// without touching a surface.

use unicode_width::UnicodeWidthChar;

use crate::commands::{CommandResult, HELP_ENTRIES, HELP_NOTE, HELP_TITLE};

/// Visual role of a text fragment. Surfaces decide how each one looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Echoed keystrokes and unstyled prose.
    Plain,
    /// A line of remote command output.
    Output,
    Banner,
    Prompt,
    Error,
    Heading,
    Keyword,
    Warning,
}

/// A single mutation of the display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Text(Style, String),
    LineBreak,
    /// Erase this many columns to the left of the cursor.
    EraseBack(usize),
    Clear,
}

pub fn render_text(text: &str, style: Style) -> SurfaceOp {
    SurfaceOp::Text(style, text.to_string())
}

/// A full line: styled text followed by a line break.
pub fn render_line(text: &str, style: Style) -> Vec<SurfaceOp> {
    vec![render_text(text, style), SurfaceOp::LineBreak]
}

pub fn render_prompt(prompt: &str) -> Vec<SurfaceOp> {
    vec![render_text(prompt, Style::Prompt)]
}

pub fn render_echo(ch: char) -> Vec<SurfaceOp> {
    vec![SurfaceOp::Text(Style::Plain, ch.to_string())]
}

/// Erases the columns `ch` occupied on screen.
pub fn render_erase(ch: char) -> Vec<SurfaceOp> {
    vec![SurfaceOp::EraseBack(ch.width().unwrap_or(1))]
}

/// Banner shown when the session opens. After a `clear` only the title is
/// reprinted.
pub fn render_banner(title: &str, with_intro: bool) -> Vec<SurfaceOp> {
    let mut ops = render_line(title, Style::Banner);
    if with_intro {
        ops.extend(render_line("Type commands to manage the system.", Style::Plain));
        ops.push(render_text("Type ", Style::Plain));
        ops.push(render_text("help", Style::Keyword));
        ops.extend(render_line(" for a list of commands.", Style::Plain));
    }
    ops
}

pub fn render_help() -> Vec<SurfaceOp> {
    let mut ops = render_line(HELP_TITLE, Style::Heading);
    for entry in HELP_ENTRIES {
        ops.push(render_text(entry.usage, Style::Keyword));
        ops.extend(render_line(&format!(" - {}", entry.description), Style::Plain));
    }
    ops.push(SurfaceOp::LineBreak);
    ops.push(render_text("Note:", Style::Warning));
    ops.extend(render_line(&format!(" {}", HELP_NOTE), Style::Plain));
    ops
}

/// Drops one trailing `\n` or `\r\n`.
fn strip_trailing_break(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}

/// Splits remote output into display lines. A single trailing line break
/// terminates the last line instead of opening an empty one.
pub fn output_lines(output: &str) -> Vec<&str> {
    strip_trailing_break(output)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

pub fn render_output(output: &str) -> Vec<SurfaceOp> {
    output_lines(output)
        .into_iter()
        .flat_map(|line| render_line(line, Style::Output))
        .collect()
}

pub fn render_result(result: &CommandResult) -> Vec<SurfaceOp> {
    match result {
        // Backend stderr ends with a line break; the error is still one line.
        CommandResult::Error(text) => render_line(strip_trailing_break(text), Style::Error),
        CommandResult::Output(text) => render_output(text),
    }
}

pub fn render_transport_error(message: &str) -> Vec<SurfaceOp> {
    render_line(&format!("Error: {}", message), Style::Error)
}
