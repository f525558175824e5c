use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info, warn};

use crate::commands::{CommandResult, LocalCommand};
use crate::config::TerminalConfig;
use crate::executor::ExecError;
use crate::render;
use crate::surface::Surface;

/// What the caller has to do after a key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The session handled the key on its own.
    Handled,
    /// The key has no meaning for the session.
    Ignored,
    /// A line was submitted that must be executed remotely.
    Remote(String),
    /// The user asked to close the view.
    Close,
}

/// Line-editing state of one terminal view.
///
/// `pending_line` only grows by appending a character or shrinks by
/// removing its last one, and is emptied as soon as a line is submitted.
pub struct Session<S: Surface> {
    surface: S,
    pending_line: String,
    terminal: TerminalConfig,
}

impl<S: Surface> Session<S> {
    /// Attaches a new session to `surface` and prints the banner and prompt.
    pub fn open(surface: S, terminal: TerminalConfig) -> Self {
        let mut session = Self {
            surface,
            pending_line: String::new(),
            terminal,
        };
        session.surface.apply_all(render::render_banner(&session.terminal.banner, true));
        session.show_prompt();
        session
    }

    #[cfg(test)]
    pub fn pending_line(&self) -> &str {
        &self.pending_line
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        // Held keys arrive as repeats on terminals that report them.
        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return KeyOutcome::Ignored;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => KeyOutcome::Close,
                KeyCode::Char('l') => {
                    self.redraw();
                    KeyOutcome::Handled
                }
                _ => KeyOutcome::Ignored,
            };
        }

        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.pending_line);
                match self.submit(&line) {
                    Some(command) => KeyOutcome::Remote(command),
                    None => KeyOutcome::Handled,
                }
            }
            KeyCode::Backspace => {
                if let Some(ch) = self.pending_line.pop() {
                    self.surface.apply_all(render::render_erase(ch));
                }
                KeyOutcome::Handled
            }
            KeyCode::Char(ch)
                if key.modifiers.difference(KeyModifiers::SHIFT).is_empty() && !ch.is_control() =>
            {
                self.pending_line.push(ch);
                self.surface.apply_all(render::render_echo(ch));
                KeyOutcome::Handled
            }
            _ => {
                debug!(?key, "ignoring key");
                KeyOutcome::Ignored
            }
        }
    }

    /// Runs line submission. Local commands are resolved here; for anything
    /// else the raw line is returned for remote execution.
    pub fn submit(&mut self, line: &str) -> Option<String> {
        self.surface.apply(render::SurfaceOp::LineBreak);

        match LocalCommand::parse(line) {
            Some(LocalCommand::Empty) => {
                self.show_prompt();
                None
            }
            Some(LocalCommand::Clear) => {
                self.clear();
                None
            }
            Some(LocalCommand::Help) => {
                self.surface.apply_all(render::render_help());
                self.show_prompt();
                None
            }
            None => {
                info!(command = line, "submitting remote command");
                Some(line.to_string())
            }
        }
    }

    /// Renders the outcome of a remote command followed by a fresh prompt.
    pub fn complete(&mut self, outcome: Result<CommandResult, ExecError>) {
        let ops = match outcome {
            Ok(result) => {
                if result.is_error() {
                    warn!(?result, "remote command failed");
                }
                render::render_result(&result)
            }
            Err(e) => {
                warn!(error = %e, "command request failed");
                render::render_transport_error(&e.to_string())
            }
        };
        self.surface.apply_all(ops);
        self.show_prompt();
    }

    fn clear(&mut self) {
        self.surface.apply(render::SurfaceOp::Clear);
        self.surface.apply_all(render::render_banner(&self.terminal.banner, false));
        self.show_prompt();
    }

    // Ctrl+L: like `clear`, but the line being typed survives.
    fn redraw(&mut self) {
        self.clear();
        if !self.pending_line.is_empty() {
            self.surface.apply(render::render_text(&self.pending_line, render::Style::Plain));
        }
    }

    fn show_prompt(&mut self) {
        self.surface.apply_all(render::render_prompt(&self.terminal.prompt));
    }
}
