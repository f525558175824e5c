use std::io::{self, Write};
use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::*;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event},
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
    Command,
};
use tracing::{error, info};

use crate::config::ConsoleConfig;
use crate::console::Console;
use crate::executor::HttpExecutor;
use crate::render::{Style, SurfaceOp};
use crate::session::Session;
use crate::surface::Surface;

/// Surface that writes ANSI text to a raw-mode terminal.
///
/// Operations are buffered and only reach the writer on `flush`, so applying
/// them never fails.
pub struct AnsiSurface<W: Write> {
    out: W,
    buffer: String,
}

impl<W: Write> AnsiSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buffer: String::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn paint(text: &str, style: Style) -> String {
    // Raw mode does not translate `\n`.
    let text = text.replace("\r\n", "\n").replace('\n', "\r\n");
    match style {
        Style::Plain | Style::Output => text,
        Style::Banner | Style::Heading => text.bright_blue().bold().to_string(),
        Style::Prompt => text.bright_green().bold().to_string(),
        Style::Error | Style::Warning => text.bright_red().bold().to_string(),
        Style::Keyword => text.bright_yellow().bold().to_string(),
    }
}

impl<W: Write> Surface for AnsiSurface<W> {
    fn apply(&mut self, op: SurfaceOp) {
        match op {
            SurfaceOp::Text(style, text) => self.buffer.push_str(&paint(&text, style)),
            SurfaceOp::LineBreak => self.buffer.push_str("\r\n"),
            SurfaceOp::EraseBack(columns) => {
                for _ in 0..columns {
                    self.buffer.push_str("\x08 \x08");
                }
            }
            SurfaceOp::Clear => {
                // Writing ANSI into a String cannot fail.
                let _ = Clear(ClearType::All).write_ansi(&mut self.buffer);
                let _ = MoveTo(0, 0).write_ansi(&mut self.buffer);
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.out.write_all(self.buffer.as_bytes())?;
            self.buffer.clear();
        }
        self.out.flush()
    }
}

/// Runs the interactive terminal until the user closes it.
pub async fn run_console(config: &ConsoleConfig) -> Result<()> {
    let executor = HttpExecutor::from_config(&config.server)?;
    info!(endpoint = executor.endpoint(), "opening terminal session");

    enable_raw_mode().context("Failed to enable raw mode")?;

    let res = run_loop(AnsiSurface::new(io::stdout()), Console::new(executor), config).await;

    // Restore terminal
    disable_raw_mode().context("Failed to disable raw mode")?;
    println!();

    if let Err(e) = &res {
        error!(error = %e, "terminal session ended with an error");
    } else {
        info!("terminal session closed");
    }
    res
}

async fn run_loop<W: Write>(
    surface: AnsiSurface<W>,
    mut console: Console<HttpExecutor>,
    config: &ConsoleConfig,
) -> Result<()> {
    let mut session = Session::open(surface, config.terminal.clone());

    loop {
        // Handle finished commands first
        console.handle_messages(&mut session);
        session.surface_mut().flush().context("Failed to write to terminal")?;

        // Handle keyboard events; the short poll keeps results flowing while idle
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if let ControlFlow::Break(()) = console.handle_key(&mut session, key) {
                    // In-flight results are dropped along with the console.
                    info!(abandoned = console.in_flight(), "closing terminal session");
                    session.surface_mut().flush()?;
                    return Ok(());
                }
            }
        }

        // Give spawned requests a chance to run on this thread too.
        tokio::task::yield_now().await;
    }
}
