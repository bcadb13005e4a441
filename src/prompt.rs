//! Per-participant prompt views.
//!
//! Each participant sees itself as `assistant` and the other participant as
//! `user`. The projection never touches the stored turns.

use crate::participant::{ParticipantId, Participants, Personality};
use crate::providers::{ChatMessage, Role};
use crate::transcript::Transcript;

pub const OPENER_GUIDANCE: &str = " Be concise but engaging. Share your perspective and ask follow-up questions when appropriate. Keep responses to 2-3 paragraphs max.";

pub const NO_TOPIC_OPENER: &str = "Start the conversation.";

/// System prompt for the participant about to speak.
pub fn system_instruction(other_model: &str, personality: Personality, opener: bool) -> String {
    let guidance = if opener { OPENER_GUIDANCE } else { "" };
    format!(
        "You are having a conversation with another AI ({}).{}{}",
        other_model,
        guidance,
        personality.instruction()
    )
}

/// First user message when the transcript is empty.
pub fn opener_message(topic: Option<&str>) -> ChatMessage {
    match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => ChatMessage::user(format!(
            "Let's discuss: {}. Please share your thoughts.",
            topic
        )),
        None => ChatMessage::user(NO_TOPIC_OPENER),
    }
}

/// Build the message list `active` will be prompted with.
pub fn build_prompt_view(
    transcript: &Transcript,
    participants: &Participants,
    active: ParticipantId,
    topic: Option<&str>,
) -> Vec<ChatMessage> {
    let opener = transcript.is_empty();
    let other_model = &participants.get(active.other()).model;
    let personality = participants.get(active).personality;

    let mut view = Vec::with_capacity(transcript.len() + 1);
    view.push(ChatMessage::system(system_instruction(
        other_model,
        personality,
        opener,
    )));

    if opener {
        view.push(opener_message(topic));
        return view;
    }

    view.extend(transcript.turns().iter().map(|turn| {
        let role = if turn.author == Some(active) {
            Role::Assistant
        } else {
            Role::User
        };
        ChatMessage::new(role, turn.content.clone())
    }));
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Participant;
    use crate::transcript::Turn;

    fn pair() -> Participants {
        Participants::new(
            Participant::new("model-one", "#3b82f6"),
            Participant::new("model-two", "#22c55e").with_personality(Personality::Concise),
        )
    }

    #[test]
    fn test_system_instruction_names_other_model() {
        let text = system_instruction("model-two", Personality::Default, false);
        assert_eq!(text, "You are having a conversation with another AI (model-two).");
    }

    #[test]
    fn test_system_instruction_appends_personality_verbatim() {
        let text = system_instruction("x", Personality::Humorous, false);
        assert!(text.ends_with(Personality::Humorous.instruction()));
    }

    #[test]
    fn test_opener_guidance_precedes_personality() {
        let text = system_instruction("x", Personality::Curious, true);
        let guidance_at = text.find(OPENER_GUIDANCE).expect("guidance");
        let persona_at = text.find(Personality::Curious.instruction()).expect("persona");
        assert!(guidance_at < persona_at);
    }

    #[test]
    fn test_opener_without_topic() {
        let view = build_prompt_view(&Transcript::new(), &pair(), ParticipantId::One, None);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].role, Role::System);
        assert_eq!(view[1], ChatMessage::user("Start the conversation."));
    }

    #[test]
    fn test_opener_blank_topic_counts_as_none() {
        let view = build_prompt_view(&Transcript::new(), &pair(), ParticipantId::One, Some("   "));
        assert_eq!(view[1].content, "Start the conversation.");
    }

    #[test]
    fn test_opener_with_topic() {
        let view = build_prompt_view(&Transcript::new(), &pair(), ParticipantId::One, Some("cats"));
        assert_eq!(view[1].content, "Let's discuss: cats. Please share your thoughts.");
    }

    #[test]
    fn test_existing_turns_relabelled_for_viewer() {
        let mut t = Transcript::new();
        t.push_complete(Turn::complete(ParticipantId::One, "model-one", "hello"))
            .expect("push");
        t.push_complete(Turn::complete(ParticipantId::Two, "model-two", "hi back"))
            .expect("push");

        let for_two = build_prompt_view(&t, &pair(), ParticipantId::Two, Some("ignored"));
        assert_eq!(for_two.len(), 3);
        assert!(for_two[0].content.contains("(model-one)"));
        assert!(for_two[0].content.ends_with(Personality::Concise.instruction()));
        assert_eq!(for_two[1], ChatMessage::user("hello"));
        assert_eq!(for_two[2], ChatMessage::assistant("hi back"));

        let for_one = build_prompt_view(&t, &pair(), ParticipantId::One, None);
        assert_eq!(for_one[1], ChatMessage::assistant("hello"));
        assert_eq!(for_one[2], ChatMessage::user("hi back"));
    }

    #[test]
    fn test_seed_turns_become_user() {
        let mut t = Transcript::new();
        t.push_complete(Turn::seed(Role::System, "context")).expect("push");
        let view = build_prompt_view(&t, &pair(), ParticipantId::One, None);
        assert_eq!(view.iter().filter(|m| m.role == Role::System).count(), 1);
        assert_eq!(view[1], ChatMessage::user("context"));
    }

    #[test]
    fn test_projection_does_not_mutate_stored_roles() {
        let mut t = Transcript::new();
        t.push_complete(Turn::complete(ParticipantId::One, "model-one", "a"))
            .expect("push");
        let before = t.clone();
        let _ = build_prompt_view(&t, &pair(), ParticipantId::Two, None);
        assert_eq!(t, before);
    }
}
