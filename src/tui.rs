//! Full-screen prompts built on ratatui.

mod events;
mod models;
mod rendering;

use std::io;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

pub use models::{PromptKind, PromptOutcome, PromptState};

use crate::error::{Result, SubdlError};
use crate::select::Chooser;

/// A [`Chooser`] that takes over the terminal for the duration of each prompt,
/// so log output between prompts stays readable.
#[derive(Debug, Default)]
pub struct TuiChooser;

impl TuiChooser {
    pub fn new() -> Self {
        Self
    }

    fn run(&mut self, mut state: PromptState) -> Result<PromptOutcome> {
        let terminal_err = |source: io::Error| SubdlError::Io {
            path: "<terminal>".into(),
            source,
        };

        enable_raw_mode().map_err(terminal_err)?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(terminal_err)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(terminal_err)?;

        let res = events::run_prompt(&mut terminal, &mut state);

        // Restore terminal
        disable_raw_mode().map_err(terminal_err)?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture).map_err(terminal_err)?;
        terminal.show_cursor().map_err(terminal_err)?;

        res.map_err(terminal_err)
    }
}

impl Chooser for TuiChooser {
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<usize> {
        if options.is_empty() {
            return Err(SubdlError::EmptyChoice(prompt.to_string()));
        }
        match self.run(PromptState::new(PromptKind::Single, prompt, options.to_vec()))? {
            PromptOutcome::Selected(indices) => indices.first().copied().ok_or(SubdlError::Cancelled),
            _ => Err(SubdlError::Cancelled),
        }
    }

    fn choose_many(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>> {
        if options.is_empty() {
            return Err(SubdlError::EmptyChoice(prompt.to_string()));
        }
        match self.run(PromptState::new(PromptKind::Multi, prompt, options.to_vec()))? {
            PromptOutcome::Selected(indices) => Ok(indices),
            _ => Err(SubdlError::Cancelled),
        }
    }

    fn confirm(&mut self, prompt: &str, details: &[String]) -> Result<bool> {
        match self.run(PromptState::new(PromptKind::Confirm, prompt, details.to_vec()))? {
            PromptOutcome::Confirmed(answer) => Ok(answer),
            _ => Err(SubdlError::Cancelled),
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        match self.run(PromptState::new(PromptKind::Text, prompt, Vec::new()))? {
            PromptOutcome::Text(text) => Ok(text),
            _ => Err(SubdlError::Cancelled),
        }
    }
}
