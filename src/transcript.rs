//! Shared transcript of the conversation.
//!
//! At most one turn is in progress at a time, and when present it is the last
//! turn. Streaming writes go through [`Transcript::update_in_progress`], which
//! overwrites content with a cumulative snapshot rather than appending a delta.

use crate::error::ChatError;
use crate::participant::ParticipantId;
use crate::providers::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub author: Option<ParticipantId>,
    pub model: Option<String>,
    pub side: Option<ParticipantId>,
    pub status: TurnStatus,
}

impl Turn {
    fn authored(author: ParticipantId, model: &str, content: String, status: TurnStatus) -> Self {
        Turn {
            role: Role::Assistant,
            content,
            author: Some(author),
            model: Some(model.to_string()),
            side: Some(author),
            status,
        }
    }

    /// A completed turn written by `author`.
    pub fn complete(author: ParticipantId, model: &str, content: impl Into<String>) -> Self {
        Self::authored(author, model, content.into(), TurnStatus::Complete)
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TurnStatus::InProgress
    }

    /// Empty turns are never shown.
    pub fn is_visible(&self) -> bool {
        !self.content.is_empty()
    }
}

#[cfg(test)]
impl Turn {
    /// A turn with no author, as seed context.
    pub(crate) fn seed(role: Role, content: impl Into<String>) -> Self {
        Turn {
            role,
            content: content.into(),
            author: None,
            model: None,
            side: None,
            status: TurnStatus::Complete,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn in_progress(&self) -> Option<&Turn> {
        self.turns.last().filter(|t| t.is_in_progress())
    }

    /// Append an empty in-progress turn for `author`.
    pub fn begin_turn(&mut self, author: ParticipantId, model: &str) -> Result<(), ChatError> {
        if self.in_progress().is_some() {
            return Err(ChatError::TurnInProgress);
        }
        self.turns.push(Turn::authored(
            author,
            model,
            String::new(),
            TurnStatus::InProgress,
        ));
        Ok(())
    }

    /// Overwrite the in-progress turn with a cumulative snapshot.
    ///
    /// Returns `false` when no turn is in progress.
    pub fn update_in_progress(&mut self, snapshot: &str) -> bool {
        match self.turns.last_mut().filter(|t| t.is_in_progress()) {
            Some(turn) => {
                turn.content.clear();
                turn.content.push_str(snapshot);
                true
            }
            None => false,
        }
    }

    /// Freeze the in-progress turn with its final text.
    pub fn finish_in_progress(&mut self, text: &str) -> bool {
        match self.turns.last_mut().filter(|t| t.is_in_progress()) {
            Some(turn) => {
                turn.content = text.to_string();
                turn.status = TurnStatus::Complete;
                true
            }
            None => false,
        }
    }

    /// Remove the in-progress turn entirely.
    pub fn discard_in_progress(&mut self) -> Option<Turn> {
        if self.in_progress().is_some() {
            self.turns.pop()
        } else {
            None
        }
    }

    /// Append a finished turn (manual authorship).
    pub fn push_complete(&mut self, turn: Turn) -> Result<(), ChatError> {
        if self.in_progress().is_some() {
            return Err(ChatError::TurnInProgress);
        }
        debug_assert!(!turn.is_in_progress());
        self.turns.push(turn);
        Ok(())
    }

    /// Replace everything with a single turn.
    pub fn reset_to(&mut self, turn: Turn) {
        self.turns.clear();
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Turns that are shown in the timeline view.
    pub fn visible(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.is_visible())
    }

    /// Visible turns displayed in one lane of the split view.
    pub fn lane(&self, side: ParticipantId) -> impl Iterator<Item = &Turn> {
        self.visible().filter(move |t| t.side == Some(side))
    }
}
