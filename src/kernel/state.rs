use crate::kernel::chat::ChatState;
use crate::kernel::editor::EditorState;
use crate::kernel::layout::{BottomTab, PanelLayout};
use crate::kernel::problems::ProblemsState;
use crate::kernel::terminal::TerminalState;
use crate::kernel::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalState {
    pub title: String,
    pub body: String,
}

pub struct AppState {
    pub workspace: Workspace,
    pub editor: EditorState,
    pub problems: ProblemsState,
    pub terminals: TerminalState,
    pub chat: ChatState,
    pub layout: PanelLayout,
    pub notes: String,
    pub theme: Theme,
    pub modal: Option<ModalState>,
    /// 最近一次执行产出的 HTML，预览面板从这里取。
    pub last_web_output: String,
    pub executing: bool,
    /// 问题面板跳转请求，视图应用后清除。
    pub jump_to_line: Option<u32>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// 启动状态：初始工作区、打开的入口脚本和一个终端会话。
    pub fn new() -> Self {
        let workspace = Workspace::with_starter_files();
        let mut editor = EditorState::default();
        if let Some(index) = workspace.find_by_path("index.php") {
            editor.open(index);
        }

        let mut terminals = TerminalState::default();
        let first = terminals.create_session();
        let mut layout = PanelLayout::default();
        layout.bottom_tab = BottomTab::Terminal(first);

        Self {
            workspace,
            editor,
            problems: ProblemsState::default(),
            terminals,
            chat: ChatState::default(),
            layout,
            notes: String::new(),
            theme: Theme::Dark,
            modal: None,
            last_web_output: String::new(),
            executing: false,
            jump_to_line: None,
        }
    }

    pub fn active_file_name(&self) -> String {
        self.editor
            .active()
            .and_then(|id| self.workspace.name(id))
            .unwrap_or("none")
            .to_string()
    }
}
