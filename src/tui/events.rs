use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{Terminal, backend::Backend};

use super::models::{PromptKind, PromptOutcome, PromptState};
use super::rendering::ui;

/// Draws `state` until the user answers or cancels.
pub fn run_prompt<B: Backend>(terminal: &mut Terminal<B>, state: &mut PromptState) -> io::Result<PromptOutcome> {
    loop {
        terminal.draw(|f| ui(f, state))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(state, key.code);
                }
            }
        }

        if let Some(outcome) = state.outcome.take() {
            return Ok(outcome);
        }
    }
}

pub fn handle_key(state: &mut PromptState, code: KeyCode) {
    if state.show_help {
        if matches!(code, KeyCode::Char('h') | KeyCode::Char('q') | KeyCode::Esc | KeyCode::F(1)) {
            state.toggle_help();
        }
        return;
    }

    if state.kind == PromptKind::Text {
        handle_text_key(state, code);
        return;
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => state.outcome = Some(PromptOutcome::Cancelled),
        KeyCode::Char('h') | KeyCode::F(1) => state.toggle_help(),
        KeyCode::Down | KeyCode::Char('j') => state.next(),
        KeyCode::Up | KeyCode::Char('k') => state.previous(),
        KeyCode::Char(' ') if state.kind == PromptKind::Multi => state.toggle_current(),
        KeyCode::Char('a') if state.kind == PromptKind::Multi => state.toggle_all(),
        KeyCode::Char('y') if state.kind == PromptKind::Confirm => {
            state.outcome = Some(PromptOutcome::Confirmed(true));
        }
        KeyCode::Char('n') if state.kind == PromptKind::Confirm => {
            state.outcome = Some(PromptOutcome::Confirmed(false));
        }
        KeyCode::Enter => submit(state),
        _ => {}
    }
}

fn submit(state: &mut PromptState) {
    match state.kind {
        PromptKind::Single => {
            if let Some(i) = state.list_state.selected() {
                state.outcome = Some(PromptOutcome::Selected(vec![i]));
            }
        }
        PromptKind::Multi => {
            let checked = state.checked_indices();
            if checked.is_empty() {
                state.status_message = Some("Select at least one item with SPACE, or press a for all".to_string());
            } else {
                state.outcome = Some(PromptOutcome::Selected(checked));
            }
        }
        PromptKind::Confirm => {
            state.status_message = Some("Press y to apply or n to skip".to_string());
        }
        PromptKind::Text => {}
    }
}

fn handle_text_key(state: &mut PromptState, code: KeyCode) {
    match code {
        KeyCode::Esc => state.outcome = Some(PromptOutcome::Cancelled),
        KeyCode::Enter => state.outcome = Some(PromptOutcome::Text(state.input.trim().to_string())),
        KeyCode::Backspace => {
            state.input.pop();
        }
        KeyCode::Char(c) => state.input.push(c),
        _ => {}
    }
}
