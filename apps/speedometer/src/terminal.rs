//! Terminal display surface and line-based user input.

use std::{
    io::{self, BufRead, Write},
    thread,
};

use shared::protocol::{ControllerEvent, PromptAnswer};
use speed_core::{
    display::{LABEL_START, NO_KMH, NO_MPS},
    DisplaySurface,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub const HELP: &str = "[enter]/t toggle  y/n answer prompt  p pause  r resume  q quit  h help";

/// Renders the control label and both readings as a single status line
/// that is rewritten in place.
pub struct TerminalDisplay<W: Write> {
    out: W,
    label: String,
    primary: String,
    secondary: String,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            label: LABEL_START.to_string(),
            primary: NO_MPS.to_string(),
            secondary: NO_KMH.to_string(),
        }
    }

    pub fn status_line(&self) -> String {
        format!("{:>12}  {:>10}   [{}]", self.primary, self.secondary, self.label)
    }

    #[cfg(test)]
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn render(&mut self) {
        let line = self.status_line();
        self.write(format_args!("\r\x1b[2K{line}"));
    }

    fn write_message(&mut self, text: &str) {
        self.write(format_args!("\r\x1b[2K{text}\n"));
        self.render();
    }

    fn write(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(error) = self.out.write_fmt(args).and_then(|()| self.out.flush()) {
            debug!(%error, "failed to write to terminal");
        }
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn set_control_label(&mut self, text: &str) {
        self.label = text.to_string();
        self.render();
    }

    fn set_primary_reading(&mut self, text: &str) {
        self.primary = text.to_string();
        self.render();
    }

    fn set_secondary_reading(&mut self, text: &str) {
        self.secondary = text.to_string();
        self.render();
    }

    fn request_enable_provider(&mut self, text: &str) {
        self.write_message(&format!("{text} [y/n]"));
    }

    fn notify(&mut self, text: &str) {
        self.write_message(&format!("! {text}"));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    Event(ControllerEvent),
    Quit,
    Help,
}

pub fn parse_input_line(line: &str) -> Option<InputCommand> {
    let command = match line.trim().to_ascii_lowercase().as_str() {
        "" | "t" | "toggle" => InputCommand::Event(ControllerEvent::UserToggle),
        "y" | "yes" => InputCommand::Event(ControllerEvent::PromptAnswered(PromptAnswer::Yes)),
        "n" | "no" => InputCommand::Event(ControllerEvent::PromptAnswered(PromptAnswer::No)),
        "p" | "pause" => InputCommand::Event(ControllerEvent::EnterBackground),
        "r" | "resume" => InputCommand::Event(ControllerEvent::EnterForeground),
        "q" | "quit" => InputCommand::Quit,
        "h" | "help" | "?" => InputCommand::Help,
        _ => return None,
    };
    Some(command)
}

/// Reads stdin on a dedicated thread; blocking reads never hold up the
/// runtime. End of input counts as quit.
pub fn spawn_input_reader(events: UnboundedSender<ControllerEvent>, quit: UnboundedSender<()>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_input_line(&line) {
                Some(InputCommand::Event(event)) => {
                    if events.send(event).is_err() {
                        return;
                    }
                }
                Some(InputCommand::Quit) => break,
                Some(InputCommand::Help) => println!("{HELP}"),
                None => println!("unknown command '{}'; {HELP}", line.trim()),
            }
        }
        let _ = quit.send(());
    });
}
