use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::models::{PromptKind, PromptState};

pub fn ui(f: &mut Frame, state: &PromptState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, chunks[0], state);
    if state.kind == PromptKind::Text {
        render_text_input(f, chunks[1], state);
    } else {
        render_item_list(f, chunks[1], state);
    }
    render_status_bar(f, chunks[2], state);

    if state.show_help {
        render_help_popup(f, state);
    }
}

pub fn render_header(f: &mut Frame, area: Rect, state: &PromptState) {
    let header = Paragraph::new(format!("subdl - {}", state.title))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::White))
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(header, area);
}

pub fn render_item_list(f: &mut Frame, area: Rect, state: &PromptState) {
    let items: Vec<ListItem> = state
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let line = match state.kind {
                PromptKind::Multi => {
                    let (mark, color) = if state.checked[i] {
                        ("[x] ", Color::Green)
                    } else {
                        ("[ ] ", Color::Gray)
                    };
                    Line::from(vec![
                        Span::styled(mark, Style::default().fg(color)),
                        Span::styled(item.clone(), Style::default().fg(Color::White)),
                    ])
                }
                _ => Line::from(Span::styled(item.clone(), Style::default().fg(Color::White))),
            };
            ListItem::new(line)
        })
        .collect();

    let title = match state.kind {
        PromptKind::Confirm => "Proposed Changes",
        _ => "Choices",
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::White))
                .border_style(Style::default().fg(Color::Blue)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut state.list_state.clone());
}

fn render_text_input(f: &mut Frame, area: Rect, state: &PromptState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input = Paragraph::new(state.input.as_str())
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Input")
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(input, chunks[0]);
}

pub fn render_status_bar(f: &mut Frame, area: Rect, state: &PromptState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let status = match (&state.status_message, state.kind) {
        (Some(message), _) => message.clone(),
        (None, PromptKind::Multi) => format!("{} of {} selected", state.checked_indices().len(), state.items.len()),
        (None, PromptKind::Confirm) => format!("{} change(s) proposed", state.items.len()),
        (None, PromptKind::Text) => "Type and press ENTER".to_string(),
        (None, PromptKind::Single) => format!("{} choice(s)", state.items.len()),
    };
    let status_style = if state.status_message.is_some() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Green)
    };
    let status = Paragraph::new(status)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[0]);

    let controls_text = match state.kind {
        PromptKind::Single => "ENTER select, h help, q quit",
        PromptKind::Multi => "SPACE toggle, a all, ENTER done, q quit",
        PromptKind::Confirm => "y apply, n skip, h help",
        PromptKind::Text => "ENTER confirm, ESC quit",
    };
    let controls = Paragraph::new(controls_text)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Controls"));
    f.render_widget(controls, chunks[1]);
}

pub fn render_help_popup(f: &mut Frame, _state: &PromptState) {
    let popup_area = centered_rect(60, 50, f.area());

    let help_text = vec![
        Line::from(vec![Span::styled(
            "subdl - Help",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  Up/k    - Move up"),
        Line::from("  Down/j  - Move down"),
        Line::from(""),
        Line::from("Actions:"),
        Line::from("  Enter   - Confirm the highlighted choice"),
        Line::from("  Space   - Toggle an episode"),
        Line::from("  a       - Select all episodes"),
        Line::from("  y/n     - Apply or skip the proposed renames"),
        Line::from("  h/F1    - Toggle this help"),
        Line::from("  q/Esc   - Cancel"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press Esc or h to close",
            Style::default().fg(Color::Gray),
        )]),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, popup_area);
    f.render_widget(paragraph, popup_area);
}

/// A rectangle of `percent_x` by `percent_y` centred in `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
