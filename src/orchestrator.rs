//! Turn orchestration: drives a [`Session`] against a [`CompletionSource`].
//!
//! Two ways to use it:
//!
//! - [`Orchestrator::run`] is the interactive event loop. It owns the session,
//!   takes [`Command`]s from a channel, runs each streamed turn in a spawned
//!   task, and re-arms the automatic-mode debounce timer whenever the
//!   conditions it watches change.
//! - [`Orchestrator::start_session`] / [`Orchestrator::request_next_turn`]
//!   run a turn inline to completion, for headless use and tests.
//!
//! Every state change is reported as a [`SessionEvent`] on an unbounded
//! channel; a renderer treats `Snapshot` as "redraw and scroll to latest".

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::participant::{ParticipantId, Personality};
use crate::session::{Mode, Session, TurnOutcome, TurnRequest};
use crate::stream::CompletionSource;

pub const DEFAULT_AUTO_DELAY: Duration = Duration::from_millis(1000);

/// User actions raised into the orchestrator.
#[derive(Debug)]
pub enum Command {
    Start,
    TogglePause,
    SetRunning(bool),
    Reset,
    SetMode(Mode),
    ToggleMode,
    SetTopic(String),
    /// The manual-mode trigger key.
    Trigger,
    /// Ghost-write `text` as the active participant.
    SendManual(String),
    SetModel(ParticipantId, String),
    SetPersonality(ParticipantId, Personality),
    /// Reply with a copy of the current session.
    Inspect(oneshot::Sender<Session>),
    Shutdown,
}

/// What happened, for whoever is rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TurnStarted {
        participant: ParticipantId,
        model: String,
    },
    /// Cumulative text of the in-progress turn.
    Snapshot {
        participant: ParticipantId,
        content: String,
    },
    TurnCompleted {
        participant: ParticipantId,
        content: String,
    },
    TurnFailed {
        participant: ParticipantId,
        message: String,
    },
    ManualTurn {
        participant: ParticipantId,
        content: String,
    },
    RunningChanged(bool),
    ModeChanged(Mode),
    /// A control was refused (e.g. topic change after start).
    Rejected(String),
    Reset,
}

/// Messages from a spawned turn back to the loop.
#[derive(Debug)]
enum TurnMessage {
    Snapshot { epoch: u64, text: String },
    Finished {
        epoch: u64,
        result: Result<String, ChatError>,
    },
}

pub struct Orchestrator<C> {
    session: Session,
    source: Arc<C>,
    events: mpsc::UnboundedSender<SessionEvent>,
    auto_delay: Duration,
    in_flight: Option<JoinHandle<()>>,
}

impl<C: CompletionSource + 'static> Orchestrator<C> {
    pub fn new(
        session: Session,
        source: Arc<C>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Orchestrator {
            session,
            source,
            events,
            auto_delay: DEFAULT_AUTO_DELAY,
            in_flight: None,
        }
    }

    pub fn with_auto_delay(mut self, delay: Duration) -> Self {
        self.auto_delay = delay;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped renderer must not stop the conversation.
        let _ = self.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Inline turns
    // -----------------------------------------------------------------------

    /// Start the conversation and stream the opener to completion.
    ///
    /// Returns `true` when the opener completed.
    pub async fn start_session(&mut self) -> bool {
        match self.session.start() {
            Some(request) => {
                self.announce_start(&request);
                self.run_turn(request).await
            }
            None => false,
        }
    }

    /// Stream the active participant's next turn to completion.
    ///
    /// A no-op returning `false` while another turn is streaming.
    pub async fn request_next_turn(&mut self) -> bool {
        match self.session.next_turn() {
            Some(request) => {
                self.announce_start(&request);
                self.run_turn(request).await
            }
            None => false,
        }
    }

    async fn run_turn(&mut self, request: TurnRequest) -> bool {
        let epoch = request.epoch;
        let participant = request.participant;
        let session = &mut self.session;
        let events = &self.events;
        let mut on_snapshot = |text: &str| {
            if session.apply_snapshot(epoch, text) {
                let _ = events.send(SessionEvent::Snapshot {
                    participant,
                    content: text.to_string(),
                });
            }
        };
        let result = self
            .source
            .stream_completion(&request.model, &request.messages, &mut on_snapshot)
            .await;
        matches!(self.settle(epoch, result), TurnOutcome::Completed { .. })
    }

    fn announce_start(&self, request: &TurnRequest) {
        info!(
            session = %self.session.id(),
            participant = %request.participant,
            model = %request.model,
            opener = request.opener,
            "turn started"
        );
        self.emit(SessionEvent::TurnStarted {
            participant: request.participant,
            model: request.model.clone(),
        });
    }

    fn settle(&mut self, epoch: u64, result: Result<String, ChatError>) -> TurnOutcome {
        let outcome = self.session.finish_turn(epoch, result);
        match &outcome {
            TurnOutcome::Completed {
                participant,
                content,
            } => {
                info!(
                    session = %self.session.id(),
                    participant = %participant,
                    chars = content.len(),
                    "turn completed"
                );
                self.emit(SessionEvent::TurnCompleted {
                    participant: *participant,
                    content: content.clone(),
                });
            }
            TurnOutcome::Failed {
                participant,
                message,
            } => {
                warn!(
                    session = %self.session.id(),
                    participant = %participant,
                    error = %message,
                    "turn failed, session halted"
                );
                self.emit(SessionEvent::TurnFailed {
                    participant: *participant,
                    message: message.clone(),
                });
                self.emit(SessionEvent::RunningChanged(false));
            }
            TurnOutcome::Stale => {
                debug!(epoch, "dropping result of a reset turn");
            }
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Run until `Shutdown` arrives or the command channel closes, then hand
    /// back the final session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Session {
        let (turn_tx, mut turn_rx) = mpsc::unbounded_channel::<TurnMessage>();

        let timer = sleep(self.auto_delay);
        tokio::pin!(timer);
        let mut armed = false;
        let mut last_key = None;

        loop {
            // Debounce: any change in what the timer watches cancels it and,
            // if a turn is still due, starts a fresh full delay.
            let key = self.session.cadence_key();
            if last_key != Some(key) {
                last_key = Some(key);
                armed = self.session.auto_turn_due();
                if armed {
                    timer.as_mut().reset(Instant::now() + self.auto_delay);
                }
            }

            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command, &turn_tx),
                    }
                }
                Some(message) = turn_rx.recv() => {
                    self.handle_turn_message(message);
                }
                () = &mut timer, if armed => {
                    armed = false;
                    if self.session.auto_turn_due() {
                        self.launch_next(&turn_tx);
                    }
                }
            }
        }

        self.abort_in_flight();
        self.session
    }

    fn handle_command(&mut self, command: Command, turn_tx: &mpsc::UnboundedSender<TurnMessage>) {
        match command {
            Command::Start => {
                if let Some(request) = self.session.start() {
                    self.emit(SessionEvent::RunningChanged(true));
                    self.launch(request, turn_tx);
                }
            }
            Command::TogglePause => {
                let running = self.session.toggle_running();
                info!(session = %self.session.id(), running, "pause toggled");
                self.emit(SessionEvent::RunningChanged(running));
            }
            Command::SetRunning(running) => {
                if self.session.is_running() != running {
                    self.session.set_running(running);
                    info!(session = %self.session.id(), running, "running changed");
                    self.emit(SessionEvent::RunningChanged(running));
                }
            }
            Command::Reset => {
                self.abort_in_flight();
                self.session.reset();
                info!(session = %self.session.id(), "session reset");
                self.emit(SessionEvent::Reset);
            }
            Command::SetMode(mode) => {
                self.session.set_mode(mode);
                self.emit(SessionEvent::ModeChanged(mode));
            }
            Command::ToggleMode => {
                let mode = self.session.mode().toggled();
                self.session.set_mode(mode);
                self.emit(SessionEvent::ModeChanged(mode));
            }
            Command::SetTopic(topic) => {
                if let Err(e) = self.session.set_topic(&topic) {
                    self.emit(SessionEvent::Rejected(e.to_string()));
                }
            }
            Command::Trigger => {
                if self.session.manual_trigger_armed() {
                    self.launch_next(turn_tx);
                } else {
                    debug!(session = %self.session.id(), "trigger ignored");
                }
            }
            Command::SendManual(text) => {
                self.session.set_draft(text);
                match self.session.send_manual_message() {
                    Some(turn) => {
                        if let Some(participant) = turn.author {
                            self.emit(SessionEvent::ManualTurn {
                                participant,
                                content: turn.content,
                            });
                        }
                    }
                    None => self.emit(SessionEvent::Rejected(
                        "manual messages need manual mode, a running conversation and no turn in flight"
                            .to_string(),
                    )),
                }
            }
            Command::SetModel(id, model) => self.session.set_model(id, model),
            Command::SetPersonality(id, personality) => {
                self.session.set_personality(id, personality)
            }
            Command::Inspect(reply) => {
                let _ = reply.send(self.session.clone());
            }
            // Handled by the loop.
            Command::Shutdown => {}
        }
    }

    fn handle_turn_message(&mut self, message: TurnMessage) {
        match message {
            TurnMessage::Snapshot { epoch, text } => {
                if self.session.apply_snapshot(epoch, &text) {
                    if let Some(participant) = self.session.transcript().last().and_then(|t| t.author) {
                        self.emit(SessionEvent::Snapshot {
                            participant,
                            content: text,
                        });
                    }
                }
            }
            TurnMessage::Finished { epoch, result } => {
                if !matches!(self.settle(epoch, result), TurnOutcome::Stale) {
                    self.in_flight = None;
                }
            }
        }
    }

    fn launch_next(&mut self, turn_tx: &mpsc::UnboundedSender<TurnMessage>) {
        if let Some(request) = self.session.next_turn() {
            self.launch(request, turn_tx);
        }
    }

    fn launch(&mut self, request: TurnRequest, turn_tx: &mpsc::UnboundedSender<TurnMessage>) {
        self.announce_start(&request);
        let source = Arc::clone(&self.source);
        let tx = turn_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let epoch = request.epoch;
            let snapshot_tx = tx.clone();
            let mut on_snapshot = move |text: &str| {
                let _ = snapshot_tx.send(TurnMessage::Snapshot {
                    epoch,
                    text: text.to_string(),
                });
            };
            let result = source
                .stream_completion(&request.model, &request.messages, &mut on_snapshot)
                .await;
            let _ = tx.send(TurnMessage::Finished { epoch, result });
        }));
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
