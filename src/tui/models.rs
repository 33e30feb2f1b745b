use ratatui::widgets::ListState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Single,
    Multi,
    Confirm,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Selected(Vec<usize>),
    Confirmed(bool),
    Text(String),
    Cancelled,
}

/// State of one full-screen prompt.
#[derive(Debug)]
pub struct PromptState {
    pub kind: PromptKind,
    pub title: String,
    /// Options, or detail lines for confirmations.
    pub items: Vec<String>,
    pub checked: Vec<bool>,
    pub list_state: ListState,
    pub input: String,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub outcome: Option<PromptOutcome>,
}

impl PromptState {
    pub fn new(kind: PromptKind, title: impl Into<String>, items: Vec<String>) -> Self {
        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            kind,
            title: title.into(),
            checked: vec![false; items.len()],
            items,
            list_state,
            input: String::new(),
            show_help: false,
            status_message: None,
            outcome: None,
        }
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    pub fn toggle_current(&mut self) {
        if let Some(checked) = self.list_state.selected().and_then(|i| self.checked.get_mut(i)) {
            *checked = !*checked;
        }
    }

    /// Checks everything, or clears everything if all items were checked.
    pub fn toggle_all(&mut self) {
        let all = self.checked.iter().all(|c| *c);
        self.checked.iter_mut().for_each(|c| *c = !all);
    }

    pub fn checked_indices(&self) -> Vec<usize> {
        self.checked
            .iter()
            .enumerate()
            .filter_map(|(i, checked)| checked.then_some(i))
            .collect()
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi() -> PromptState {
        PromptState::new(
            PromptKind::Multi,
            "Select episodes",
            vec!["01".into(), "02".into(), "03".into()],
        )
    }

    #[test]
    fn navigation_wraps() {
        let mut state = multi();
        state.previous();
        assert_eq!(state.list_state.selected(), Some(2));
        state.next();
        assert_eq!(state.list_state.selected(), Some(0));
    }

    #[test]
    fn toggle_all_flips_between_all_and_none() {
        let mut state = multi();
        state.toggle_current();
        state.toggle_all();
        assert_eq!(state.checked_indices(), [0, 1, 2]);
        state.toggle_all();
        assert!(state.checked_indices().is_empty());
    }
}
