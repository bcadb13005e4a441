//! Terminal rendering of a session.
//!
//! Markdown is shown as-is; colours come from each participant's `#rrggbb`.

use clap::ValueEnum;
use colored::*;
use serde::Deserialize;

use crate::catalog::ModelCatalog;
use crate::participant::{parse_hex_color, ParticipantId};
use crate::session::{Mode, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// One column per participant.
    #[default]
    Split,
    /// Both participants interleaved in order.
    Timeline,
}

/// Paint `text` in a `#rrggbb` colour, leaving it plain if the colour is bad.
pub fn paint(text: &str, color: &str) -> String {
    match parse_hex_color(color) {
        Some((r, g, b)) => text.truecolor(r, g, b).to_string(),
        None => text.to_string(),
    }
}

fn rule(title: &str, color: &str) -> String {
    paint(&format!("── {} ──", title), color).bold().to_string()
}

pub fn render(session: &Session, catalog: &ModelCatalog, view: ViewMode) -> String {
    match view {
        ViewMode::Split => render_split(session, catalog),
        ViewMode::Timeline => render_timeline(session, catalog),
    }
}

/// One section per participant; numbering restarts in each lane.
pub fn render_split(session: &Session, catalog: &ModelCatalog) -> String {
    let mut out = String::new();
    for id in [ParticipantId::One, ParticipantId::Two] {
        let participant = session.participants().get(id);
        out.push_str(&rule(catalog.display_name(&participant.model), &participant.color));
        out.push('\n');
        for (i, turn) in session.transcript().lane(id).enumerate() {
            out.push_str(&paint(&format!("#{}", i + 1), &participant.color));
            out.push('\n');
            out.push_str(&turn.content);
            out.push_str("\n\n");
        }
        if session.is_loading() && session.active() == id {
            out.push_str(&"Thinking...".dimmed().to_string());
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// All visible turns in order, labelled with the author's model.
pub fn render_timeline(session: &Session, catalog: &ModelCatalog) -> String {
    let mut out = String::new();
    out.push_str(&"── Conversation ──".bold().to_string());
    out.push('\n');
    for (i, turn) in session.transcript().visible().enumerate() {
        let side = turn.side.unwrap_or(ParticipantId::Two);
        let color = &session.participants().get(side).color;
        let name = catalog.display_name(turn.model.as_deref().unwrap_or(""));
        let indent = if side == ParticipantId::One { "" } else { "    " };
        out.push_str(indent);
        out.push_str(&paint(&format!("#{} · {}", i + 1, name), color));
        out.push('\n');
        for line in turn.content.lines() {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    if session.is_loading() {
        let model = &session.participants().get(session.active()).model;
        out.push_str(
            &format!("{} is thinking...", catalog.display_name(model))
                .dimmed()
                .to_string(),
        );
        out.push('\n');
    }
    out
}

/// One-line summary of the controls that currently apply.
pub fn status_line(session: &Session, catalog: &ModelCatalog) -> String {
    if let Some(error) = session.last_error() {
        return error.red().to_string();
    }
    let active = session.participants().get(session.active());
    let name = catalog.display_name(&active.model);
    if session.transcript().is_empty() && !session.is_loading() {
        return "Type /start to begin (/help for commands)".to_string();
    }
    if !session.is_running() {
        return format!("{}: /resume to continue", "Paused".yellow());
    }
    if session.is_loading() {
        return format!("{} is thinking...", name);
    }
    match session.mode() {
        Mode::Auto => format!("Next up: {}", paint(name, &active.color)),
        Mode::Manual => format!(
            "Press Enter to continue, or /say <text> to write as {}",
            paint(name, &active.color)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelEntry;
    use crate::error::ChatError;
    use crate::participant::{Participant, Participants};

    fn catalog() -> ModelCatalog {
        ModelCatalog::from_entries(vec![
            ModelEntry {
                id: "a".to_string(),
                name: "Model A".to_string(),
            },
            ModelEntry {
                id: "b".to_string(),
                name: "Model B".to_string(),
            },
        ])
    }

    fn session_with_two_turns() -> Session {
        let mut s = Session::new(Participants::new(
            Participant::new("a", "#3b82f6"),
            Participant::new("b", "#22c55e"),
        ));
        let req = s.start().expect("start");
        s.finish_turn(req.epoch, Ok("opening line".to_string()));
        let req = s.next_turn().expect("turn");
        s.finish_turn(req.epoch, Ok("reply line".to_string()));
        s
    }

    #[test]
    fn test_paint_bad_color_is_plain() {
        assert_eq!(paint("x", "blue"), "x");
    }

    #[test]
    fn test_split_lists_each_lane() {
        let out = render_split(&session_with_two_turns(), &catalog());
        let a = out.find("Model A").expect("lane 1");
        let b = out.find("Model B").expect("lane 2");
        assert!(a < b);
        assert!(out.find("opening line").expect("turn 1") < b);
        assert!(out.find("reply line").expect("turn 2") > b);
    }

    #[test]
    fn test_timeline_numbers_in_order() {
        let out = render_timeline(&session_with_two_turns(), &catalog());
        assert!(out.contains("#1 · Model A"));
        assert!(out.contains("#2 · Model B"));
        assert!(!out.contains("thinking"));
    }

    #[test]
    fn test_placeholder_hidden_but_thinking_shown() {
        let mut s = session_with_two_turns();
        let _req = s.next_turn().expect("turn");
        let timeline = render_timeline(&s, &catalog());
        assert!(!timeline.contains("#3"));
        assert!(timeline.contains("Model A is thinking..."));
        let split = render_split(&s, &catalog());
        assert!(split.contains("Thinking..."));
    }

    #[test]
    fn test_status_line_reports_error() {
        let mut s = session_with_two_turns();
        let req = s.next_turn().expect("turn");
        s.finish_turn(req.epoch, Err(ChatError::request_failed(500, Some("boom".to_string()))));
        assert!(status_line(&s, &catalog()).contains("boom"));
    }

    #[test]
    fn test_status_line_manual_prompt() {
        let mut s = session_with_two_turns();
        s.set_mode(Mode::Manual);
        assert!(status_line(&s, &catalog()).contains("Press Enter"));
    }

    #[test]
    fn test_status_line_before_start() {
        let s = Session::new(Participants::new(
            Participant::new("a", "#3b82f6"),
            Participant::new("b", "#22c55e"),
        ));
        assert!(status_line(&s, &catalog()).contains("/start"));
    }
}
