//! Interactive terminal front end.
//!
//! Reads lines from stdin, turns them into orchestrator [`Command`]s and
//! prints [`SessionEvent`]s as they arrive. Streaming text is printed as the
//! growing suffix of each cumulative snapshot.

use colored::*;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::catalog::ModelCatalog;
use crate::error::ChatError;
use crate::export::{default_file_name, write_transcript};
use crate::orchestrator::{Command, SessionEvent};
use crate::participant::{ParticipantId, Personality};
use crate::render::{paint, render, status_line, ViewMode};
use crate::session::{Mode, Session};

pub const HELP: &str = "\
Commands:
  /start                 start (or restart) the conversation
  /pause, /resume, /p    pause, resume or toggle the conversation
  /reset                 clear everything and stop
  /mode [auto|manual]    set or toggle the turn cadence
  /topic <text>          set the topic (before the first turn only)
  <Enter>                manual mode: request the next turn
  /say <text>            manual mode: write the active participant's turn
  /model <1|2> <id>      change a participant's model
  /personality <1|2> <name>
                         change a participant's personality
  /models                list the model catalog
  /personalities         list the personality profiles
  /view [split|timeline] set or toggle the transcript layout
  /show                  redraw the transcript
  /save [path]           write the transcript to a text file
  /help                  this text
  /quit                  leave";

/// What a line of input asks for.
#[derive(Debug)]
pub enum Action {
    Send(Command),
    View(Option<ViewMode>),
    Show,
    Models,
    Personalities,
    Save(Option<PathBuf>),
    Help,
    Quit,
}

fn parse_side(s: &str) -> Result<ParticipantId, String> {
    s.parse::<u8>()
        .ok()
        .and_then(|n| ParticipantId::try_from(n).ok())
        .ok_or_else(|| format!("Unknown participant: {} (use 1 or 2)", s))
}

/// One line per personality: id, then display name.
pub fn personality_list() -> String {
    Personality::ALL
        .iter()
        .map(|p| format!("  {:<15} {}", p.id(), p.display_name()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse one line of console input.
pub fn parse_input(line: &str) -> Result<Action, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Action::Send(Command::Trigger));
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Err("Unknown input; type /help for commands".to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let name = name.to_lowercase();
    let action = match name.as_str() {
        "start" => Action::Send(Command::Start),
        "pause" => Action::Send(Command::SetRunning(false)),
        "resume" => Action::Send(Command::SetRunning(true)),
        "p" => Action::Send(Command::TogglePause),
        "reset" => Action::Send(Command::Reset),
        "mode" => match arg.to_lowercase().as_str() {
            "" => Action::Send(Command::ToggleMode),
            "auto" => Action::Send(Command::SetMode(Mode::Auto)),
            "manual" => Action::Send(Command::SetMode(Mode::Manual)),
            other => return Err(format!("Unknown mode: {}", other)),
        },
        "topic" => Action::Send(Command::SetTopic(arg.to_string())),
        "say" => {
            if arg.is_empty() {
                return Err("/say needs some text".to_string());
            }
            Action::Send(Command::SendManual(arg.to_string()))
        }
        "model" | "personality" => {
            let (side, value) = arg
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("Usage: /{} <1|2> <value>", name))?;
            let side = parse_side(side)?;
            let value = value.trim();
            if name == "model" {
                Action::Send(Command::SetModel(side, value.to_string()))
            } else {
                let personality = Personality::from_str_loose(value)?;
                Action::Send(Command::SetPersonality(side, personality))
            }
        }
        "models" => Action::Models,
        "personalities" => Action::Personalities,
        "view" => match arg.to_lowercase().as_str() {
            "" => Action::View(None),
            "split" => Action::View(Some(ViewMode::Split)),
            "timeline" => Action::View(Some(ViewMode::Timeline)),
            other => return Err(format!("Unknown view: {}", other)),
        },
        "show" => Action::Show,
        "save" => Action::Save((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "help" | "?" => Action::Help,
        "quit" | "exit" | "q" => Action::Quit,
        other => return Err(format!("Unknown command: /{}", other)),
    };
    Ok(action)
}

fn toggle_view(view: ViewMode) -> ViewMode {
    match view {
        ViewMode::Split => ViewMode::Timeline,
        ViewMode::Timeline => ViewMode::Split,
    }
}

pub struct Console {
    commands: mpsc::Sender<Command>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    catalog: ModelCatalog,
    view: ViewMode,
    /// Bytes of the current streaming turn already printed.
    printed: usize,
}

impl Console {
    pub fn new(
        commands: mpsc::Sender<Command>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        catalog: ModelCatalog,
        view: ViewMode,
    ) -> Self {
        Console {
            commands,
            events,
            catalog,
            view,
            printed: 0,
        }
    }

    async fn send(&self, command: Command) -> Result<(), ChatError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ChatError::Config("conversation loop has stopped".to_string()))
    }

    async fn inspect(&self) -> Result<Session, ChatError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Inspect(tx)).await?;
        rx.await
            .map_err(|_| ChatError::Config("conversation loop has stopped".to_string()))
    }

    async fn print_status(&self) -> Result<(), ChatError> {
        let session = self.inspect().await?;
        println!("{}", status_line(&session, &self.catalog).dimmed());
        Ok(())
    }

    /// Read input until `/quit` or end of input.
    pub async fn run(mut self) -> Result<(), ChatError> {
        println!("{}", "AI-TO-AI CHAT".bright_cyan().bold());
        println!("{}", "=".repeat(50).bright_blue());
        self.print_status().await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match parse_input(&line) {
                        Ok(Action::Quit) => break,
                        Ok(action) => self.perform(action).await?,
                        Err(message) => println!("{}", message.yellow()),
                    }
                }
                Some(event) = self.events.recv() => {
                    self.show_event(event).await?;
                }
            }
        }

        let _ = self.commands.send(Command::Shutdown).await;
        Ok(())
    }

    async fn perform(&mut self, action: Action) -> Result<(), ChatError> {
        match action {
            Action::Send(command) => self.send(command).await?,
            Action::View(view) => {
                self.view = view.unwrap_or_else(|| toggle_view(self.view));
                self.redraw().await?;
            }
            Action::Show => self.redraw().await?,
            Action::Models => {
                for entry in self.catalog.models() {
                    println!("  {:<40} {}", entry.id, entry.name);
                }
            }
            Action::Personalities => println!("{}", personality_list()),
            Action::Save(path) => {
                let path = path.unwrap_or_else(default_file_name);
                let session = self.inspect().await?;
                match write_transcript(&path, session.transcript(), &self.catalog) {
                    Ok(()) => println!("Saved transcript to {}", path.display()),
                    Err(e) => println!("{}", format!("Could not save: {}", e).red()),
                }
            }
            Action::Help => println!("{}", HELP),
            Action::Quit => {}
        }
        Ok(())
    }

    async fn redraw(&self) -> Result<(), ChatError> {
        let session = self.inspect().await?;
        println!("{}", render(&session, &self.catalog, self.view));
        println!("{}", status_line(&session, &self.catalog).dimmed());
        Ok(())
    }

    async fn show_event(&mut self, event: SessionEvent) -> Result<(), ChatError> {
        debug!(?event, "session event");
        match event {
            SessionEvent::TurnStarted { participant, model } => {
                let session = self.inspect().await?;
                let color = &session.participants().get(participant).color;
                let name = self.catalog.display_name(&model);
                println!();
                println!("{}", paint(&format!("[{}] {}", participant.number(), name), color).bold());
                self.printed = 0;
            }
            SessionEvent::Snapshot { content, .. } => self.print_suffix(&content),
            SessionEvent::TurnCompleted { content, .. } => {
                self.print_suffix(&content);
                println!();
                self.printed = 0;
                self.print_status().await?;
            }
            SessionEvent::TurnFailed { message, .. } => {
                println!();
                println!("{}", message.red());
                self.printed = 0;
            }
            SessionEvent::ManualTurn {
                participant,
                content,
            } => {
                let session = self.inspect().await?;
                let p = session.participants().get(participant);
                let name = self.catalog.display_name(&p.model);
                println!();
                println!("{}", paint(&format!("[{}] {} (manual)", participant.number(), name), &p.color).bold());
                println!("{}", content);
            }
            SessionEvent::RunningChanged(_) | SessionEvent::ModeChanged(_) => self.print_status().await?,
            SessionEvent::Rejected(message) => println!("{}", message.yellow()),
            SessionEvent::Reset => {
                self.printed = 0;
                println!("{}", "Conversation reset.".yellow());
            }
        }
        Ok(())
    }

    fn print_suffix(&mut self, content: &str) {
        // Snapshots are cumulative; only the new tail is printed.
        if let Some(tail) = content.get(self.printed..) {
            print!("{}", tail);
            let _ = io::stdout().flush();
            self.printed = content.len();
        }
    }
}
