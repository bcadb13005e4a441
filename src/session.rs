//! Session state and its transitions.
//!
//! `Session` owns the transcript together with the flags that govern it, so
//! the combinations that matter are enforced in one place:
//!
//! - `loading` is not stored: it is `Activity::Streaming`, and a streaming
//!   activity always has a matching in-progress turn at the end of the
//!   transcript.
//! - every streamed turn carries an epoch; `reset` moves the epoch on so a
//!   result that arrives afterwards is recognised as stale and dropped.
//!
//! All methods are synchronous. The async side (`orchestrator`) asks for a
//! [`TurnRequest`], runs it against a completion source, and feeds snapshots
//! and the final result back in.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChatError;
use crate::participant::{ParticipantId, Participants, Personality};
use crate::prompt::build_prompt_view;
use crate::providers::ChatMessage;
use crate::stream::NO_RESPONSE;
use crate::transcript::{Transcript, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Auto,
    Manual,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Auto => Mode::Manual,
            Mode::Manual => Mode::Auto,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Auto => write!(f, "auto"),
            Mode::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Streaming {
        epoch: u64,
        participant: ParticipantId,
        opener: bool,
    },
}

/// Everything needed to run one streamed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub epoch: u64,
    pub participant: ParticipantId,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub opener: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed {
        participant: ParticipantId,
        content: String,
    },
    Failed {
        participant: ParticipantId,
        message: String,
    },
    /// The result belonged to a turn that was reset away.
    Stale,
}

/// Inputs the automatic-mode debounce timer watches. Any change re-arms it.
pub type CadenceKey = (Mode, bool, bool, usize);

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    participants: Participants,
    transcript: Transcript,
    active: ParticipantId,
    mode: Mode,
    running: bool,
    activity: Activity,
    last_error: Option<String>,
    topic: Option<String>,
    draft: String,
    epoch: u64,
}

impl Session {
    pub fn new(participants: Participants) -> Self {
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            participants,
            transcript: Transcript::new(),
            active: ParticipantId::One,
            mode: Mode::Auto,
            running: false,
            activity: Activity::Idle,
            last_error: None,
            topic: None,
            draft: String::new(),
            epoch: 0,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic = normalize_topic(topic.as_deref());
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn participants(&self) -> &Participants {
        &self.participants
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn active(&self) -> ParticipantId {
        self.active
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.activity, Activity::Streaming { .. })
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// The conversation has begun and the topic is frozen.
    pub fn has_started(&self) -> bool {
        !self.transcript.is_empty() || self.is_loading()
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn set_topic(&mut self, topic: &str) -> Result<(), ChatError> {
        if self.has_started() {
            return Err(ChatError::TopicLocked);
        }
        self.topic = normalize_topic(Some(topic));
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn set_model(&mut self, id: ParticipantId, model: impl Into<String>) {
        self.participants.get_mut(id).model = model.into();
    }

    pub fn set_personality(&mut self, id: ParticipantId, personality: Personality) {
        self.participants.get_mut(id).personality = personality;
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    // -----------------------------------------------------------------------
    // Turn lifecycle
    // -----------------------------------------------------------------------

    /// Prompt view for the active participant over the current transcript.
    pub fn prompt_view(&self) -> Vec<ChatMessage> {
        build_prompt_view(
            &self.transcript,
            &self.participants,
            self.active,
            self.topic.as_deref(),
        )
    }

    /// Start (or restart) the conversation with participant 1's opener.
    pub fn start(&mut self) -> Option<TurnRequest> {
        if self.is_loading() {
            debug!(session = %self.id, "start ignored: a turn is already streaming");
            return None;
        }
        self.active = ParticipantId::One;
        self.running = true;
        self.last_error = None;
        self.transcript.clear();
        self.begin_streaming(true)
    }

    /// Begin the next streamed turn for the active participant.
    ///
    /// Returns `None` while another turn is streaming.
    pub fn next_turn(&mut self) -> Option<TurnRequest> {
        if self.is_loading() {
            debug!(session = %self.id, "next turn ignored: a turn is already streaming");
            return None;
        }
        self.last_error = None;
        self.begin_streaming(self.transcript.is_empty())
    }

    fn begin_streaming(&mut self, opener: bool) -> Option<TurnRequest> {
        let participant = self.active;
        let model = self.participants.get(participant).model.clone();
        // The view is taken before the placeholder exists.
        let messages = self.prompt_view();
        if let Err(e) = self.transcript.begin_turn(participant, &model) {
            debug!(session = %self.id, error = %e, "could not open placeholder turn");
            return None;
        }
        self.epoch += 1;
        self.activity = Activity::Streaming {
            epoch: self.epoch,
            participant,
            opener,
        };
        Some(TurnRequest {
            epoch: self.epoch,
            participant,
            model,
            messages,
            opener,
        })
    }

    fn current_epoch(&self) -> Option<u64> {
        match self.activity {
            Activity::Streaming { epoch, .. } => Some(epoch),
            Activity::Idle => None,
        }
    }

    /// Write a cumulative snapshot into the placeholder. Stale snapshots are
    /// dropped and `false` is returned.
    pub fn apply_snapshot(&mut self, epoch: u64, snapshot: &str) -> bool {
        if self.current_epoch() != Some(epoch) {
            return false;
        }
        self.transcript.update_in_progress(snapshot)
    }

    /// Settle the streaming turn identified by `epoch`.
    pub fn finish_turn(&mut self, epoch: u64, result: Result<String, ChatError>) -> TurnOutcome {
        let (participant, opener) = match self.activity {
            Activity::Streaming {
                epoch: current,
                participant,
                opener,
            } if current == epoch => (participant, opener),
            _ => return TurnOutcome::Stale,
        };
        self.activity = Activity::Idle;

        match result {
            Ok(text) => {
                let content = if text.is_empty() {
                    NO_RESPONSE.to_string()
                } else {
                    text
                };
                if opener {
                    let model = self.participants.get(participant).model.clone();
                    let model = self
                        .transcript
                        .in_progress()
                        .and_then(|t| t.model.clone())
                        .unwrap_or(model);
                    self.transcript
                        .reset_to(Turn::complete(participant, &model, content.clone()));
                } else {
                    self.transcript.finish_in_progress(&content);
                }
                self.active = participant.other();
                TurnOutcome::Completed {
                    participant,
                    content,
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.last_error = Some(message.clone());
                self.running = false;
                if opener {
                    self.transcript.clear();
                } else {
                    self.transcript.discard_in_progress();
                }
                TurnOutcome::Failed {
                    participant,
                    message,
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Controls
    // -----------------------------------------------------------------------

    /// Pause/resume. Does not touch the streaming turn or the transcript.
    pub fn toggle_running(&mut self) -> bool {
        self.running = !self.running;
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Ghost-write the draft as the active participant's turn.
    ///
    /// Only allowed in manual mode, while running, with no turn streaming and
    /// a non-blank draft. On success the draft is cleared and the turn passes
    /// to the other participant.
    pub fn send_manual_message(&mut self) -> Option<Turn> {
        let text = self.draft.trim();
        if self.mode != Mode::Manual || !self.running || self.is_loading() || text.is_empty() {
            debug!(session = %self.id, "manual message rejected");
            return None;
        }
        let author = self.active;
        let turn = Turn::complete(author, &self.participants.get(author).model, text);
        if self.transcript.push_complete(turn.clone()).is_err() {
            return None;
        }
        self.active = author.other();
        self.draft.clear();
        Some(turn)
    }

    /// Back to the pre-start state. Any streaming turn becomes stale.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.running = false;
        self.activity = Activity::Idle;
        self.active = ParticipantId::One;
        self.last_error = None;
        self.draft.clear();
        self.epoch += 1;
    }

    // -----------------------------------------------------------------------
    // Cadence
    // -----------------------------------------------------------------------

    fn ready_for_next(&self) -> bool {
        self.running && !self.is_loading() && !self.transcript.is_empty()
    }

    /// Automatic mode wants a turn once the debounce delay elapses.
    pub fn auto_turn_due(&self) -> bool {
        self.mode == Mode::Auto && self.ready_for_next()
    }

    /// The manual trigger key is live.
    pub fn manual_trigger_armed(&self) -> bool {
        self.mode == Mode::Manual && self.ready_for_next()
    }

    pub fn cadence_key(&self) -> CadenceKey {
        (
            self.mode,
            self.running,
            self.is_loading(),
            self.transcript.len(),
        )
    }
}

fn normalize_topic(topic: Option<&str>) -> Option<String> {
    topic
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.to_string())
}
