use std::ops::ControlFlow;
use std::sync::Arc;

use crossterm::event::KeyEvent;
use tokio::sync::mpsc;
use tracing::debug;

use crate::commands::CommandResult;
use crate::executor::{CommandExecutor, ExecError};
use crate::session::{KeyOutcome, Session};
use crate::surface::Surface;

/// Messages delivered back to the event loop by request tasks.
#[derive(Debug)]
pub enum ConsoleMessage {
    CommandFinished {
        command: String,
        outcome: Result<CommandResult, ExecError>,
    },
}

/// Connects a session to an executor. Remote lines run on spawned tasks and
/// report back over a channel; nothing is serialized, so results render in
/// the order they arrive.
pub struct Console<E> {
    executor: Arc<E>,
    tx: mpsc::UnboundedSender<ConsoleMessage>,
    rx: mpsc::UnboundedReceiver<ConsoleMessage>,
    in_flight: usize,
}

impl<E: CommandExecutor + 'static> Console<E> {
    pub fn new(executor: E) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            executor: Arc::new(executor),
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Number of remote commands still waiting for a response.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn handle_key<S: Surface>(&mut self, session: &mut Session<S>, key: KeyEvent) -> ControlFlow<()> {
        match session.on_key(key) {
            KeyOutcome::Remote(command) => {
                self.dispatch(command);
                ControlFlow::Continue(())
            }
            KeyOutcome::Close => ControlFlow::Break(()),
            KeyOutcome::Handled | KeyOutcome::Ignored => ControlFlow::Continue(()),
        }
    }

    fn dispatch(&mut self, command: String) {
        let executor = Arc::clone(&self.executor);
        let tx = self.tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let outcome = executor.execute(&command).await;
            // The receiver is gone once the view closes; the result is dropped.
            let _ = tx.send(ConsoleMessage::CommandFinished { command, outcome });
        });
    }

    /// Renders every result that has arrived so far without waiting.
    pub fn handle_messages<S: Surface>(&mut self, session: &mut Session<S>) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.apply_message(session, msg);
            handled += 1;
        }
        handled
    }

    /// Waits for the next result and renders it.
    #[cfg(test)]
    pub async fn next_message<S: Surface>(&mut self, session: &mut Session<S>) {
        // `self.tx` keeps the channel open, so `recv` never yields `None` here.
        if let Some(msg) = self.rx.recv().await {
            self.apply_message(session, msg);
        }
    }

    fn apply_message<S: Surface>(&mut self, session: &mut Session<S>, msg: ConsoleMessage) {
        match msg {
            ConsoleMessage::CommandFinished { command, outcome } => {
                debug!(command = %command, ok = outcome.is_ok(), "command finished");
                self.in_flight = self.in_flight.saturating_sub(1);
                session.complete(outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyModifiers};
    use reqwest::StatusCode;

    use crate::config::TerminalConfig;
    use crate::render::{Style, SurfaceOp};
    use crate::surface::RecordingSurface;

    /// Executor that replays canned replies and remembers what it was asked.
    struct ScriptedExecutor {
        replies: Mutex<VecDeque<(Duration, Result<CommandResult, ExecError>)>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedExecutor {
        fn new(replies: Vec<Result<CommandResult, ExecError>>) -> Self {
            Self::delayed(replies.into_iter().map(|r| (Duration::ZERO, r)).collect())
        }

        fn delayed(replies: Vec<(Duration, Result<CommandResult, ExecError>)>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn execute(&self, command: &str) -> Result<CommandResult, ExecError> {
            self.calls.lock().unwrap().push(command.to_string());
            let (delay, reply) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected remote call");
            tokio::time::sleep(delay).await;
            reply
        }
    }

    fn setup(
        executor: ScriptedExecutor,
    ) -> (Console<ScriptedExecutor>, Session<RecordingSurface>, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::clone(&executor.calls);
        let console = Console::new(executor);
        let mut session = Session::open(RecordingSurface::new(), TerminalConfig::default());
        session.surface_mut().take();
        (console, session, calls)
    }

    fn enter_line(console: &mut Console<ScriptedExecutor>, session: &mut Session<RecordingSurface>, line: &str) {
        for ch in line.chars() {
            let flow = console.handle_key(session, KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
            assert_eq!(flow, ControlFlow::Continue(()));
        }
        let flow = console.handle_key(session, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(flow, ControlFlow::Continue(()));
    }

    #[tokio::test]
    async fn test_local_commands_never_reach_executor() {
        let (mut console, mut session, calls) = setup(ScriptedExecutor::new(vec![]));

        for line in ["", "   ", "clear", " cls ", "help"] {
            enter_line(&mut console, &mut session, line);
        }

        assert_eq!(console.in_flight(), 0);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(session.surface().count_style(Style::Prompt), 5);
        assert_eq!(
            session.surface().ops.iter().filter(|op| **op == SurfaceOp::Clear).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_remote_output_renders_lines_then_prompt() {
        let (mut console, mut session, calls) =
            setup(ScriptedExecutor::new(vec![Ok(CommandResult::output("a\nb\nc"))]));

        enter_line(&mut console, &mut session, "ls");
        assert_eq!(console.in_flight(), 1);
        session.surface_mut().take();

        console.next_message(&mut session).await;
        assert_eq!(console.in_flight(), 0);
        assert_eq!(*calls.lock().unwrap(), vec!["ls".to_string()]);

        let surface = session.surface();
        assert_eq!(surface.texts(Style::Output), vec!["a", "b", "c"]);
        assert_eq!(surface.count_style(Style::Prompt), 1);
        assert_eq!(surface.ops.last(), Some(&SurfaceOp::Text(Style::Prompt, "$ ".to_string())));
    }

    #[tokio::test]
    async fn test_remote_error_renders_one_error_line() {
        let (mut console, mut session, _calls) =
            setup(ScriptedExecutor::new(vec![Ok(CommandResult::error("permission denied"))]));

        enter_line(&mut console, &mut session, "cat /etc/shadow");
        session.surface_mut().take();
        console.next_message(&mut session).await;

        let errors = session.surface().texts(Style::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("permission denied"));
        assert_eq!(session.surface().count_style(Style::Prompt), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_session_usable() {
        let (mut console, mut session, calls) = setup(ScriptedExecutor::new(vec![
            Err(ExecError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "backend offline".to_string(),
            }),
            Ok(CommandResult::output("/home/user")),
        ]));

        enter_line(&mut console, &mut session, "ps");
        session.surface_mut().take();
        console.next_message(&mut session).await;

        let errors = session.surface().texts(Style::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("backend offline"));
        assert_eq!(session.surface().count_style(Style::Prompt), 1);

        session.surface_mut().take();
        enter_line(&mut console, &mut session, "pwd");
        console.next_message(&mut session).await;

        assert_eq!(session.surface().texts(Style::Output), vec!["/home/user"]);
        assert_eq!(*calls.lock().unwrap(), vec!["ps".to_string(), "pwd".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_render_in_arrival_order() {
        let (mut console, mut session, _calls) = setup(ScriptedExecutor::delayed(vec![
            (Duration::from_millis(200), Ok(CommandResult::output("slow"))),
            (Duration::ZERO, Ok(CommandResult::output("fast"))),
        ]));

        enter_line(&mut console, &mut session, "first");
        // Let the first task pick up its reply before the second is queued.
        tokio::time::sleep(Duration::from_millis(20)).await;
        enter_line(&mut console, &mut session, "second");
        assert_eq!(console.in_flight(), 2);

        console.next_message(&mut session).await;
        console.next_message(&mut session).await;

        assert_eq!(session.surface().texts(Style::Output), vec!["fast", "slow"]);
        assert_eq!(console.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_handle_messages_drains_without_blocking() {
        let (mut console, mut session, _calls) =
            setup(ScriptedExecutor::new(vec![Ok(CommandResult::output("Mon Oct 19"))]));

        assert_eq!(console.handle_messages(&mut session), 0);

        enter_line(&mut console, &mut session, "date");
        let mut handled = 0;
        for _ in 0..50 {
            handled += console.handle_messages(&mut session);
            if handled > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(handled, 1);
        assert_eq!(session.surface().texts(Style::Output), vec!["Mon Oct 19"]);
    }

    #[tokio::test]
    async fn test_ctrl_c_closes() {
        let (mut console, mut session, _calls) = setup(ScriptedExecutor::new(vec![]));
        let flow = console.handle_key(
            &mut session,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert_eq!(flow, ControlFlow::Break(()));
    }
}
