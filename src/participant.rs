//! The two conversational endpoints and their configuration.
//!
//! Participants carry no behaviour of their own: the orchestrator threads
//! their model id, colour and personality into prompt construction and
//! rendering.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR_ONE: &str = "#3b82f6";
pub const DEFAULT_COLOR_TWO: &str = "#22c55e";

/// Which of the two participants. Also used as the display lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantId {
    One,
    Two,
}

impl ParticipantId {
    pub fn other(self) -> Self {
        match self {
            ParticipantId::One => ParticipantId::Two,
            ParticipantId::Two => ParticipantId::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            ParticipantId::One => 1,
            ParticipantId::Two => 2,
        }
    }
}

impl TryFrom<u8> for ParticipantId {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(ParticipantId::One),
            2 => Ok(ParticipantId::Two),
            _ => Err(format!("participant must be 1 or 2, got {}", n)),
        }
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Personality profiles
// ---------------------------------------------------------------------------

/// A fixed instruction suffix appended to a participant's system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Default,
    Friendly,
    Professional,
    Curious,
    Philosophical,
    Humorous,
    Skeptical,
    Creative,
    Concise,
    Enthusiastic,
    Angry,
    Offensive,
}

impl Personality {
    pub const ALL: [Personality; 12] = [
        Personality::Default,
        Personality::Friendly,
        Personality::Professional,
        Personality::Curious,
        Personality::Philosophical,
        Personality::Humorous,
        Personality::Skeptical,
        Personality::Creative,
        Personality::Concise,
        Personality::Enthusiastic,
        Personality::Angry,
        Personality::Offensive,
    ];

    pub fn from_str_loose(s: &str) -> Result<Self, String> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| format!("Unknown personality: {}", s))
    }

    pub fn id(&self) -> &'static str {
        match self {
            Personality::Default => "default",
            Personality::Friendly => "friendly",
            Personality::Professional => "professional",
            Personality::Curious => "curious",
            Personality::Philosophical => "philosophical",
            Personality::Humorous => "humorous",
            Personality::Skeptical => "skeptical",
            Personality::Creative => "creative",
            Personality::Concise => "concise",
            Personality::Enthusiastic => "enthusiastic",
            Personality::Angry => "angry",
            Personality::Offensive => "offensive",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Personality::Default => "Default Personality",
            Personality::Friendly => "Friendly",
            Personality::Professional => "Professional",
            Personality::Curious => "Curious",
            Personality::Philosophical => "Philosophical",
            Personality::Humorous => "Humorous",
            Personality::Skeptical => "Skeptical",
            Personality::Creative => "Creative",
            Personality::Concise => "Concise",
            Personality::Enthusiastic => "Enthusiastic",
            Personality::Angry => "Angry",
            Personality::Offensive => "Offensive",
        }
    }

    /// Text appended verbatim to the system prompt. Every non-empty suffix
    /// starts with a space so it can be concatenated directly.
    pub fn instruction(&self) -> &'static str {
        match self {
            Personality::Default => "",
            Personality::Friendly => " Be warm, approachable, and use a casual, friendly tone.",
            Personality::Professional => {
                " Maintain a formal, professional tone with precise language."
            }
            Personality::Curious => {
                " Be inquisitive, ask many questions, and show genuine interest in exploring ideas."
            }
            Personality::Philosophical => {
                " Take a deep, philosophical approach. Ponder existential questions and explore abstract concepts."
            }
            Personality::Humorous => " Be witty and playful. Use humor and jokes where appropriate.",
            Personality::Skeptical => {
                " Be analytical and questioning. Challenge assumptions and ask for evidence."
            }
            Personality::Creative => {
                " Be imaginative and think outside the box. Use metaphors and creative examples."
            }
            Personality::Concise => {
                " Be extremely brief and to the point. Use short sentences and avoid unnecessary details."
            }
            Personality::Enthusiastic => {
                " Be highly energetic and excited! Show passion and enthusiasm for every topic."
            }
            Personality::Angry => {
                " Be irritable and frustrated. Express annoyance and impatience in your responses."
            }
            Personality::Offensive => {
                " Be aggressive and confrontational. Challenge the other AI aggressively and be deliberately contrarian. Use profanity."
            }
        }
    }
}

impl std::fmt::Display for Personality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ---------------------------------------------------------------------------
// Participant configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub model: String,
    pub color: String,
    pub personality: Personality,
}

impl Participant {
    pub fn new(model: impl Into<String>, color: impl Into<String>) -> Self {
        Participant {
            model: model.into(),
            color: color.into(),
            personality: Personality::Default,
        }
    }

    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = personality;
        self
    }
}

/// Both participants, addressable by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participants {
    one: Participant,
    two: Participant,
}

impl Participants {
    pub fn new(one: Participant, two: Participant) -> Self {
        Participants { one, two }
    }

    pub fn get(&self, id: ParticipantId) -> &Participant {
        match id {
            ParticipantId::One => &self.one,
            ParticipantId::Two => &self.two,
        }
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> &mut Participant {
        match id {
            ParticipantId::One => &mut self.one,
            ParticipantId::Two => &mut self.two,
        }
    }
}

/// Parse a `#rrggbb` colour into its components.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
