//! 事件循环：crossterm 事件折叠成 Action，完成回执从通道里捞出来再折叠。

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;

use crate::kernel::chat::{AgentKind, AgentStatus};
use crate::kernel::editor::{line_range, splice, SuggestionStatus};
use crate::kernel::layout::{BottomTab, LeftPanelTab, RightPanelTab};
use crate::kernel::learning;
use crate::kernel::workspace::{NodeId, NodeKind};
use crate::kernel::{Action, AppState, Store};
use crate::oracle::{GeminiTransport, OracleClient};
use crate::runtime::{AppMessage, AsyncRuntime};
use crate::services::persistence;

use super::terminal_guard::TerminalGuard;
use super::view;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Editor,
    Bottom,
    Chat,
}

#[derive(Debug, Clone)]
pub enum PromptKind {
    CreateFile { parent: Option<NodeId> },
    CreateFolder { parent: Option<NodeId> },
    Rename { id: NodeId },
    Inline,
}

#[derive(Debug, Clone)]
pub struct PromptInput {
    pub kind: PromptKind,
    pub buffer: String,
}

/// 只属于界面的状态：焦点、光标、输入缓冲。内核对这些一无所知。
pub struct UiState {
    pub focus: Focus,
    pub sidebar_index: usize,
    pub learning_index: usize,
    pub cursor: usize,
    pub chat_input: String,
    pub prompt: Option<PromptInput>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            focus: Focus::Editor,
            sidebar_index: 0,
            learning_index: 0,
            cursor: 0,
            chat_input: String::new(),
            prompt: None,
        }
    }
}

pub fn run() -> io::Result<()> {
    let transport = match GeminiTransport::from_env() {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("phpdojo: {e}");
            return Ok(());
        }
    };
    let (tx, rx) = mpsc::channel();
    let runtime = AsyncRuntime::new(tx, OracleClient::new(transport))?;

    let mut app = App {
        store: Store::new(AppState::new()),
        runtime,
        rx,
        ui: UiState::default(),
        should_quit: false,
        viewport: Rect::default(),
    };

    let persisted = persistence::load();
    app.dispatch(Action::HydratePersisted {
        panel_sizes: persisted.panel_sizes,
        notes: persisted.notes,
    });
    // 启动就对打开的入口脚本跑一轮检查
    if let Some(content) = app.active_content() {
        app.dispatch(Action::EditActiveFile { content });
    }

    let mut guard = TerminalGuard::new()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    while !app.should_quit {
        app.viewport = terminal.size().map(|s| Rect::new(0, 0, s.width, s.height))?;
        terminal.draw(|frame| view::render(frame, app.store.state(), &app.ui))?;

        app.pump_messages();
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                _ => {}
            }
        }
        app.apply_jump();
    }

    // 卸载时无条件收掉拖拽态，再同步落盘，不依赖还在途的异步任务
    app.dispatch(Action::PanelDragReset);
    persistence::save(&persistence::PersistedState {
        panel_sizes: app.store.state().layout.panel_sizes(),
        notes: app.store.state().notes.clone(),
    });
    guard.restore()?;
    Ok(())
}

struct App {
    store: Store,
    runtime: AsyncRuntime,
    rx: Receiver<AppMessage>,
    ui: UiState,
    should_quit: bool,
    viewport: Rect,
}

impl App {
    fn dispatch(&mut self, action: Action) {
        let result = self.store.dispatch(action);
        for effect in result.effects {
            self.runtime.execute(effect);
        }
    }

    fn pump_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.dispatch(message.into_action());
        }
    }

    /// 问题面板请求的跳转：光标挪到目标行行首。
    fn apply_jump(&mut self) {
        let Some(line) = self.store.state().jump_to_line else {
            return;
        };
        if let Some(content) = self.active_content() {
            if let Some((start, _)) = line_range(&content, line) {
                self.ui.cursor = start;
                self.ui.focus = Focus::Editor;
            }
        }
        self.dispatch(Action::ClearJump);
    }

    fn active_content(&self) -> Option<String> {
        let id = self.store.state().editor.active()?;
        self.store
            .state()
            .workspace
            .file_content(id)
            .map(str::to_string)
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = view::border_hit(
                    &self.store.state().layout,
                    self.viewport,
                    mouse.column,
                    mouse.row,
                );
                if let Some(panel) = hit {
                    self.dispatch(Action::PanelDragStart { panel });
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.store.state().layout.interactions_suppressed() {
                    self.dispatch(Action::PointerMoved {
                        x: mouse.column,
                        y: mouse.row,
                        viewport_w: self.viewport.width,
                        viewport_h: self.viewport.height,
                    });
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.store.state().layout.interactions_suppressed() {
                    self.dispatch(Action::PointerReleased);
                }
            }
            _ => {}
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.store.state().modal.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.dispatch(Action::DismissModal);
            }
            return;
        }
        if self.ui.prompt.is_some() {
            self.on_prompt_key(key);
            return;
        }
        if self.on_suggestion_key(key) {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') | KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('r') => self.dispatch(Action::RunActiveFile),
                KeyCode::Char('b') => self.dispatch(Action::ToggleBottomPanel),
                KeyCode::Char('t') => self.dispatch(Action::ToggleTheme),
                KeyCode::Char('n') => {
                    self.dispatch(Action::TerminalCreate);
                    self.ui.focus = Focus::Bottom;
                }
                KeyCode::Char('e') => self.dispatch(Action::ExportWorkspace),
                KeyCode::Char('w') => {
                    if let Some(id) = self.store.state().editor.active() {
                        self.dispatch(Action::CloseTab { id });
                        self.ui.cursor = 0;
                    }
                }
                KeyCode::Char('k') => self.open_inline_prompt(),
                KeyCode::Char('a') => self.resolve_pending_plan(AgentStatus::Applied),
                KeyCode::Char('x') => self.resolve_pending_plan(AgentStatus::Rejected),
                KeyCode::Char('d') => {
                    if let BottomTab::Terminal(id) = self.store.state().layout.bottom_tab {
                        self.dispatch(Action::TerminalClose { id });
                    }
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::F(1) => self.show_left_tab(LeftPanelTab::Workspace),
            KeyCode::F(2) => self.show_left_tab(LeftPanelTab::Learning),
            KeyCode::F(3) => self.show_left_tab(LeftPanelTab::Notes),
            KeyCode::F(4) => {
                let next = match self.store.state().layout.right_tab {
                    Some(RightPanelTab::Webview) => None,
                    _ => Some(RightPanelTab::Webview),
                };
                self.dispatch(Action::SetRightTab { tab: next });
            }
            KeyCode::F(5) => {
                self.dispatch(Action::SetRightTab {
                    tab: Some(RightPanelTab::Agent),
                });
                self.ui.focus = Focus::Chat;
            }
            KeyCode::F(6) => {
                self.dispatch(Action::SetBottomTab {
                    tab: BottomTab::Problems,
                });
                self.ui.focus = Focus::Bottom;
            }
            KeyCode::F(8) => self.cycle_agent(),
            KeyCode::Tab if self.ui.focus != Focus::Editor || self.active_content().is_none() => {
                self.cycle_focus();
            }
            _ => match self.ui.focus {
                Focus::Sidebar => self.on_sidebar_key(key),
                Focus::Editor => self.on_editor_key(key),
                Focus::Bottom => self.on_bottom_key(key),
                Focus::Chat => self.on_chat_key(key),
            },
        }
    }

    fn cycle_focus(&mut self) {
        let has_chat = self.store.state().layout.right_tab == Some(RightPanelTab::Agent);
        let has_bottom = self.store.state().layout.bottom_visible;
        self.ui.focus = match self.ui.focus {
            Focus::Sidebar => Focus::Editor,
            Focus::Editor if has_bottom => Focus::Bottom,
            Focus::Editor if has_chat => Focus::Chat,
            Focus::Editor => Focus::Sidebar,
            Focus::Bottom if has_chat => Focus::Chat,
            Focus::Bottom => Focus::Sidebar,
            Focus::Chat => Focus::Sidebar,
        };
    }

    fn show_left_tab(&mut self, tab: LeftPanelTab) {
        self.dispatch(Action::SetLeftTab { tab });
        self.ui.focus = Focus::Sidebar;
    }

    fn cycle_agent(&mut self) {
        let current = self.store.state().chat.agent;
        let all = AgentKind::ALL;
        let index = all.iter().position(|a| *a == current).unwrap_or(0);
        let next = all[(index + 1) % all.len()];
        self.dispatch(Action::SetAgent { agent: next });
    }

    fn resolve_pending_plan(&mut self, status: AgentStatus) {
        let pending = self
            .store
            .state()
            .chat
            .messages
            .iter()
            .rev()
            .find(|m| m.agent_status == Some(AgentStatus::Pending))
            .map(|m| m.id);
        if let Some(message_id) = pending {
            match status {
                AgentStatus::Applied => self.dispatch(Action::ApplyAgentActions { message_id }),
                AgentStatus::Rejected => self.dispatch(Action::RejectAgentActions { message_id }),
                AgentStatus::Pending => {}
            }
        }
    }

    fn open_inline_prompt(&mut self) {
        if self.active_content().is_none() {
            return;
        }
        let at = self.clamped_cursor();
        self.dispatch(Action::InlineOpenPrompt { start: at, end: at });
        if self.store.state().editor.inline.prompt.is_some() {
            self.ui.prompt = Some(PromptInput {
                kind: PromptKind::Inline,
                buffer: String::new(),
            });
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        let Some(mut prompt) = self.ui.prompt.take() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                if matches!(prompt.kind, PromptKind::Inline) {
                    self.dispatch(Action::InlineClosePrompt);
                }
            }
            KeyCode::Enter => {
                let text = prompt.buffer.trim().to_string();
                match prompt.kind {
                    PromptKind::CreateFile { parent } => self.dispatch(Action::CreateNode {
                        name: text,
                        kind: NodeKind::File,
                        parent,
                    }),
                    PromptKind::CreateFolder { parent } => self.dispatch(Action::CreateNode {
                        name: text,
                        kind: NodeKind::Folder,
                        parent,
                    }),
                    PromptKind::Rename { id } => {
                        self.dispatch(Action::RenameNode { id, new_name: text })
                    }
                    PromptKind::Inline => self.dispatch(Action::InlineSubmit { prompt: text }),
                }
                // 重名等失败会弹出 modal；输入框连同已键入的名字留在原地
                if !matches!(prompt.kind, PromptKind::Inline)
                    && self.store.state().modal.is_some()
                {
                    self.ui.prompt = Some(prompt);
                }
            }
            KeyCode::Backspace => {
                prompt.buffer.pop();
                self.ui.prompt = Some(prompt);
            }
            KeyCode::Char(ch) => {
                prompt.buffer.push(ch);
                self.ui.prompt = Some(prompt);
            }
            _ => self.ui.prompt = Some(prompt),
        }
    }

    /// 建议视图抢占 Tab/Esc；加载中只允许 Esc 撤销。
    fn on_suggestion_key(&mut self, key: KeyEvent) -> bool {
        let Some(suggestion) = &self.store.state().editor.inline.suggestion else {
            return false;
        };
        match (key.code, &suggestion.status) {
            (KeyCode::Tab, SuggestionStatus::Ready { .. }) => {
                self.dispatch(Action::InlineAccept);
                true
            }
            (KeyCode::Esc, SuggestionStatus::Ready { .. }) => {
                self.dispatch(Action::InlineReject);
                true
            }
            (KeyCode::Esc, SuggestionStatus::Loading) => {
                self.dispatch(Action::InlineDismiss);
                true
            }
            _ => false,
        }
    }

    fn selected_row(&self) -> Option<crate::kernel::workspace::WorkspaceRow> {
        self.store
            .state()
            .workspace
            .rows()
            .into_iter()
            .nth(self.ui.sidebar_index)
    }

    fn create_parent(&self) -> Option<NodeId> {
        let row = self.selected_row()?;
        if row.is_folder {
            Some(row.id)
        } else {
            self.store.state().workspace.parent(row.id)
        }
    }

    fn on_sidebar_key(&mut self, key: KeyEvent) {
        match self.store.state().layout.left_tab {
            LeftPanelTab::Workspace => self.on_workspace_key(key),
            LeftPanelTab::Learning => self.on_learning_key(key),
            LeftPanelTab::Notes => self.on_notes_key(key),
        }
    }

    fn on_workspace_key(&mut self, key: KeyEvent) {
        let row_count = self.store.state().workspace.rows().len();
        match key.code {
            KeyCode::Up => self.ui.sidebar_index = self.ui.sidebar_index.saturating_sub(1),
            KeyCode::Down => {
                self.ui.sidebar_index = (self.ui.sidebar_index + 1).min(row_count.saturating_sub(1))
            }
            KeyCode::Enter => {
                if let Some(row) = self.selected_row() {
                    if row.is_folder {
                        self.dispatch(Action::ToggleExpand { id: row.id });
                    } else {
                        self.dispatch(Action::OpenFile { id: row.id });
                        self.ui.cursor = 0;
                        self.ui.focus = Focus::Editor;
                    }
                }
            }
            KeyCode::Char('n') => {
                self.ui.prompt = Some(PromptInput {
                    kind: PromptKind::CreateFile {
                        parent: self.create_parent(),
                    },
                    buffer: String::new(),
                });
            }
            KeyCode::Char('N') => {
                self.ui.prompt = Some(PromptInput {
                    kind: PromptKind::CreateFolder {
                        parent: self.create_parent(),
                    },
                    buffer: String::new(),
                });
            }
            KeyCode::Char('r') => {
                if let Some(row) = self.selected_row() {
                    self.ui.prompt = Some(PromptInput {
                        kind: PromptKind::Rename { id: row.id },
                        buffer: row.name,
                    });
                }
            }
            KeyCode::Char('d') => {
                if let Some(row) = self.selected_row() {
                    self.dispatch(Action::DeleteNode { id: row.id });
                    let rows = self.store.state().workspace.rows().len();
                    self.ui.sidebar_index = self.ui.sidebar_index.min(rows.saturating_sub(1));
                }
            }
            KeyCode::Char('e') => {
                if let Some(row) = self.selected_row() {
                    self.dispatch(Action::ExportNode { id: row.id });
                }
            }
            _ => {}
        }
    }

    fn on_learning_key(&mut self, key: KeyEvent) {
        let count = learning::topic_count();
        match key.code {
            KeyCode::Up => self.ui.learning_index = self.ui.learning_index.saturating_sub(1),
            KeyCode::Down => {
                self.ui.learning_index = (self.ui.learning_index + 1).min(count.saturating_sub(1))
            }
            KeyCode::Enter => {
                self.dispatch(Action::OpenTopic {
                    flat_index: self.ui.learning_index,
                });
                self.ui.cursor = 0;
                self.ui.focus = Focus::Editor;
            }
            _ => {}
        }
    }

    fn on_notes_key(&mut self, key: KeyEvent) {
        let mut notes = self.store.state().notes.clone();
        match key.code {
            KeyCode::Char(ch) => notes.push(ch),
            KeyCode::Enter => notes.push('\n'),
            KeyCode::Backspace => {
                notes.pop();
            }
            _ => return,
        }
        self.dispatch(Action::SetNotes { text: notes });
    }

    fn clamped_cursor(&self) -> usize {
        let len = self.active_content().map(|c| c.len()).unwrap_or(0);
        let mut at = self.ui.cursor.min(len);
        if let Some(content) = self.active_content() {
            while at > 0 && !content.is_char_boundary(at) {
                at -= 1;
            }
        }
        at
    }

    fn edit_active(&mut self, content: String, cursor: usize) {
        self.ui.cursor = cursor;
        self.dispatch(Action::EditActiveFile { content });
    }

    fn on_editor_key(&mut self, key: KeyEvent) {
        let Some(content) = self.active_content() else {
            return;
        };
        let at = self.clamped_cursor();
        match key.code {
            KeyCode::Char(ch) => {
                let mut buf = [0u8; 4];
                let inserted = ch.encode_utf8(&mut buf);
                let updated = splice(&content, at, at, inserted);
                self.edit_active(updated, at + inserted.len());
            }
            KeyCode::Enter => {
                let updated = splice(&content, at, at, "\n");
                self.edit_active(updated, at + 1);
            }
            KeyCode::Tab => {
                let updated = splice(&content, at, at, "    ");
                self.edit_active(updated, at + 4);
            }
            KeyCode::Backspace => {
                if let Some(prev) = content[..at].chars().next_back() {
                    let start = at - prev.len_utf8();
                    let updated = splice(&content, start, at, "");
                    self.edit_active(updated, start);
                }
            }
            KeyCode::Delete => {
                if let Some(next) = content[at..].chars().next() {
                    let updated = splice(&content, at, at + next.len_utf8(), "");
                    self.edit_active(updated, at);
                }
            }
            KeyCode::Left => {
                if let Some(prev) = content[..at].chars().next_back() {
                    self.ui.cursor = at - prev.len_utf8();
                }
            }
            KeyCode::Right => {
                if let Some(next) = content[at..].chars().next() {
                    self.ui.cursor = at + next.len_utf8();
                }
            }
            KeyCode::Up => self.ui.cursor = vertical_move(&content, at, -1),
            KeyCode::Down => self.ui.cursor = vertical_move(&content, at, 1),
            KeyCode::Home => {
                self.ui.cursor = content[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
            }
            KeyCode::End => {
                self.ui.cursor = content[at..].find('\n').map(|i| at + i).unwrap_or(content.len());
            }
            KeyCode::Esc => self.cycle_focus(),
            _ => {}
        }
    }

    fn on_bottom_key(&mut self, key: KeyEvent) {
        match self.store.state().layout.bottom_tab {
            BottomTab::Problems => {
                let selected_line = self
                    .store
                    .state()
                    .problems
                    .items()
                    .get(self.store.state().problems.selected())
                    .map(|p| p.line);
                match key.code {
                    KeyCode::Up => self.dispatch(Action::ProblemsMoveSelection { delta: -1 }),
                    KeyCode::Down => self.dispatch(Action::ProblemsMoveSelection { delta: 1 }),
                    KeyCode::Enter => self.dispatch(Action::ProblemsActivate),
                    KeyCode::Char('f') => {
                        if let Some(line) = selected_line {
                            self.dispatch(Action::FixProblem { line });
                        }
                    }
                    KeyCode::Char('F') => self.dispatch(Action::FixAllProblems),
                    _ => {}
                }
            }
            BottomTab::Terminal(id) => {
                let input = self
                    .store
                    .state()
                    .terminals
                    .session(id)
                    .map(|s| s.input.clone())
                    .unwrap_or_default();
                match key.code {
                    KeyCode::Char(ch) => {
                        let mut input = input;
                        input.push(ch);
                        self.dispatch(Action::TerminalSetInput { id, input });
                    }
                    KeyCode::Backspace => {
                        let mut input = input;
                        input.pop();
                        self.dispatch(Action::TerminalSetInput { id, input });
                    }
                    KeyCode::Enter => self.dispatch(Action::TerminalSubmit { id }),
                    KeyCode::Up => self.dispatch(Action::TerminalRecallPrev { id }),
                    KeyCode::Down => self.dispatch(Action::TerminalRecallNext { id }),
                    _ => {}
                }
            }
        }
    }

    fn on_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(ch) => self.ui.chat_input.push(ch),
            KeyCode::Backspace => {
                self.ui.chat_input.pop();
            }
            KeyCode::Enter => {
                let message = std::mem::take(&mut self.ui.chat_input).trim().to_string();
                if !message.is_empty() {
                    self.dispatch(Action::SendChat {
                        message,
                        image: None,
                    });
                }
            }
            _ => {}
        }
    }
}

/// 光标按显示行上下移动，列尽量保持。
fn vertical_move(content: &str, at: usize, delta: i32) -> usize {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut line = 0usize;
    let mut line_start = 0usize;
    for (i, l) in lines.iter().enumerate() {
        let end = line_start + l.len();
        if at <= end {
            line = i;
            break;
        }
        line_start = end + 1;
    }
    let col = at - line_start;
    let target = if delta < 0 {
        line.checked_sub(delta.unsigned_abs() as usize)
    } else {
        Some((line + delta as usize).min(lines.len().saturating_sub(1)))
    };
    let Some(target) = target else {
        return at;
    };
    let mut start = 0usize;
    for l in lines.iter().take(target) {
        start += l.len() + 1;
    }
    let target_len = lines.get(target).map(|l| l.len()).unwrap_or(0);
    let mut offset = start + col.min(target_len);
    while offset > 0 && !content.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        std::env::set_var("GEMINI_API_KEY", "test");
        let transport = GeminiTransport::from_env().unwrap();
        let (tx, rx) = mpsc::channel();
        App {
            store: Store::new(AppState::new()),
            runtime: AsyncRuntime::new(tx, OracleClient::new(transport)).unwrap(),
            rx,
            ui: UiState::default(),
            should_quit: false,
            viewport: Rect::default(),
        }
    }

    #[test]
    fn failed_create_keeps_prompt_open_with_typed_name() {
        let mut app = app();
        app.ui.prompt = Some(PromptInput {
            kind: PromptKind::CreateFile { parent: None },
            buffer: "index.php".into(),
        });
        app.on_prompt_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));

        // 重名弹 modal，但输入框和已键入的名字必须留着
        assert!(app.store.state().modal.is_some());
        let prompt = app.ui.prompt.as_ref().unwrap();
        assert_eq!(prompt.buffer, "index.php");
        assert!(matches!(prompt.kind, PromptKind::CreateFile { .. }));
    }

    #[test]
    fn vertical_move_keeps_column_when_possible() {
        let text = "abcdef\nxy\nlonger line";
        // 从第一行第 4 列下移：第二行只有 2 列，钉在行尾
        assert_eq!(vertical_move(text, 4, 1), 9);
        // 再下移到第三行，恢复到原列
        assert_eq!(vertical_move(text, 9, 1), 12);
        // 第一行再上移保持不动
        assert_eq!(vertical_move(text, 4, -1), 4);
    }
}
