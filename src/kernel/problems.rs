use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemSeverity {
    Error,
    Warning,
}

impl ProblemSeverity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeProblem {
    /// 1-based
    pub line: u32,
    pub message: String,
    pub severity: ProblemSeverity,
}

/// Lint 结果是短命的：每轮整体替换，从不与上一轮合并或求 diff。
#[derive(Debug, Default)]
pub struct ProblemsState {
    items: Vec<CodeProblem>,
    selected: usize,
    pub lint_in_flight: bool,
}

impl ProblemsState {
    pub fn items(&self) -> &[CodeProblem] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|p| p.severity == ProblemSeverity::Error)
            .count()
    }

    pub fn problem_on_line(&self, line: u32) -> Option<&CodeProblem> {
        self.items.iter().find(|p| p.line == line)
    }

    pub fn replace(&mut self, items: Vec<CodeProblem>) -> bool {
        let changed = self.items != items;
        self.items = items;
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
        changed
    }

    pub fn clear(&mut self) -> bool {
        self.replace(Vec::new())
    }

    pub fn move_selection(&mut self, delta: isize) -> bool {
        if self.items.is_empty() || delta == 0 {
            return false;
        }
        let prev = self.selected;
        let len = self.items.len();
        if delta < 0 {
            self.selected = self.selected.saturating_sub((-delta) as usize);
        } else {
            self.selected = (self.selected + delta as usize).min(len - 1);
        }
        self.selected != prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(line: u32, message: &str) -> CodeProblem {
        CodeProblem {
            line,
            message: message.to_string(),
            severity: ProblemSeverity::Warning,
        }
    }

    #[test]
    fn replace_is_wholesale() {
        let mut state = ProblemsState::default();
        assert!(state.replace(vec![problem(1, "a"), problem(9, "b")]));
        state.move_selection(1);
        assert!(state.replace(vec![problem(3, "c")]));
        assert_eq!(state.items().len(), 1);
        assert_eq!(state.selected(), 0);
        assert!(!state.replace(vec![problem(3, "c")]));
    }

    #[test]
    fn selection_clamps() {
        let mut state = ProblemsState::default();
        state.replace(vec![problem(1, "a"), problem(2, "b"), problem(3, "c")]);
        assert!(state.move_selection(10));
        assert_eq!(state.selected(), 2);
        assert!(state.move_selection(-10));
        assert_eq!(state.selected(), 0);
        state.clear();
        assert!(!state.move_selection(1));
    }
}
