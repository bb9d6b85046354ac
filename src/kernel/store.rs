//! 单一事件入口：`dispatch` 吃 Action，改状态，吐 Effect。

use crate::kernel::chat::{AgentKind, AgentResponse};
use crate::kernel::editor::{line_range, splice};
use crate::kernel::layout::BottomTab;
use crate::kernel::learning;
use crate::kernel::terminal::{MessageKind, TerminalId, TerminalMessage};
use crate::kernel::workspace::NodeKind;
use crate::oracle::prompts;
use crate::oracle::PackageManager;

use super::{Action, AppState, Effect, ModalState};

pub struct DispatchResult {
    pub effects: Vec<Effect>,
    pub state_changed: bool,
}

impl DispatchResult {
    fn none() -> Self {
        Self {
            effects: Vec::new(),
            state_changed: false,
        }
    }

    fn changed(state_changed: bool) -> Self {
        Self {
            effects: Vec::new(),
            state_changed,
        }
    }

    fn with(effects: Vec<Effect>, state_changed: bool) -> Self {
        Self {
            effects,
            state_changed,
        }
    }
}

const HELP_TEXT: &str = "Available commands:
  run                       Execute the active PHP file
  clear                     Clear this terminal
  composer require <pkg>    Look up a Composer package
  npm install <pkg>         Look up an NPM package
  help                      Show this message";

pub struct Store {
    state: AppState,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn modal(&mut self, title: &str, body: String) {
        self.state.modal = Some(ModalState {
            title: title.to_string(),
            body,
        });
    }

    fn workspace_json(&self) -> String {
        serde_json::to_string_pretty(&self.state.workspace.snapshot()).unwrap_or_default()
    }

    fn save_ui_effect(&self) -> Effect {
        Effect::SaveUiState {
            panel_sizes: self.state.layout.panel_sizes(),
            notes: self.state.notes.clone(),
        }
    }

    /// 给当前活动文件排一次 lint；没有活动文件时确保问题面板为空。
    fn lint_active(&mut self) -> Vec<Effect> {
        match self.state.editor.active() {
            Some(file) => match self.state.workspace.file_content(file) {
                Some(code) => {
                    self.state.problems.lint_in_flight = true;
                    vec![Effect::Lint {
                        file,
                        code: code.to_string(),
                    }]
                }
                None => Vec::new(),
            },
            None => {
                self.state.problems.clear();
                Vec::new()
            }
        }
    }

    /// 活动文件切换后的清场：旧文件的问题、修复、行内视图全部作废。
    fn on_active_changed(&mut self) -> Vec<Effect> {
        self.state.problems.clear();
        self.state.editor.fixes.clear();
        self.state.editor.inline.dismiss_views();
        self.lint_active()
    }

    fn append_terminal(&mut self, id: TerminalId, kind: MessageKind, text: impl Into<String>) {
        self.state
            .terminals
            .append(id, TerminalMessage::new(kind, text));
    }

    /// run 命令主体：执行活动文件，输出回到发起的终端。
    fn run_in_terminal(&mut self, terminal: TerminalId) -> Vec<Effect> {
        if self.state.executing {
            self.append_terminal(
                terminal,
                MessageKind::System,
                "Execution already in progress.",
            );
            return Vec::new();
        }
        let code = self
            .state
            .editor
            .active()
            .and_then(|id| self.state.workspace.file_content(id))
            .map(str::to_string);
        match code {
            Some(code) => {
                self.state.executing = true;
                vec![Effect::ExecutePhp { terminal, code }]
            }
            None => {
                self.append_terminal(terminal, MessageKind::Error, "No active file to run.");
                Vec::new()
            }
        }
    }

    fn submit_command(&mut self, id: TerminalId, command: String) -> Vec<Effect> {
        self.append_terminal(id, MessageKind::Command, command.clone());

        if command == "clear" {
            self.state.terminals.clear(id);
            Vec::new()
        } else if command == "help" {
            self.append_terminal(id, MessageKind::System, HELP_TEXT);
            Vec::new()
        } else if command == "run" {
            self.run_in_terminal(id)
        } else if let Some(rest) = command.strip_prefix("composer require") {
            self.package_lookup(id, PackageManager::Composer, rest.trim())
        } else if let Some(rest) = command.strip_prefix("npm install") {
            self.package_lookup(id, PackageManager::Npm, rest.trim())
        } else {
            self.append_terminal(id, MessageKind::Error, format!("command not found: {command}"));
            Vec::new()
        }
    }

    fn package_lookup(
        &mut self,
        terminal: TerminalId,
        manager: PackageManager,
        package: &str,
    ) -> Vec<Effect> {
        if package.is_empty() {
            let usage = match manager {
                PackageManager::Composer => "usage: composer require <package>",
                PackageManager::Npm => "usage: npm install <package>",
            };
            self.append_terminal(terminal, MessageKind::Error, usage);
            return Vec::new();
        }
        self.append_terminal(
            terminal,
            MessageKind::System,
            format!("Resolving {package}..."),
        );
        vec![Effect::PackageLookup {
            terminal,
            manager,
            package: package.to_string(),
        }]
    }

    /// run 按钮的目标终端：当前底栏终端、否则第一个会话、否则新建。
    fn run_target(&mut self) -> TerminalId {
        if let BottomTab::Terminal(id) = self.state.layout.bottom_tab {
            if self.state.terminals.session(id).is_some() {
                return id;
            }
        }
        match self.state.terminals.sessions.first() {
            Some(session) => session.id,
            None => self.state.terminals.create_session(),
        }
    }

    pub fn dispatch(&mut self, action: Action) -> DispatchResult {
        match action {
            // ------------------------------------------------------------------
            // 工作区
            Action::CreateNode { name, kind, parent } => {
                match self.state.workspace.create(name, kind, parent) {
                    Ok(id) => {
                        if let Some(parent_id) = parent {
                            self.state.workspace.expand(parent_id);
                        }
                        self.state.workspace.set_selected(Some(id));
                        let mut effects = Vec::new();
                        if kind == NodeKind::File {
                            self.state.editor.open(id);
                            effects = self.on_active_changed();
                        }
                        DispatchResult::with(effects, true)
                    }
                    Err(e) => {
                        self.modal("Workspace", e.to_string());
                        DispatchResult::changed(true)
                    }
                }
            }
            Action::RenameNode { id, new_name } => {
                match self.state.workspace.rename(id, new_name) {
                    Ok(()) => DispatchResult::changed(true),
                    Err(e) => {
                        self.modal("Workspace", e.to_string());
                        DispatchResult::changed(true)
                    }
                }
            }
            Action::DeleteNode { id } => match self.state.workspace.delete(id) {
                Ok(removed) => {
                    let was_active = self
                        .state
                        .editor
                        .active()
                        .is_some_and(|a| removed.contains(&a));
                    self.state.editor.evict(&removed);
                    let effects = if was_active {
                        self.on_active_changed()
                    } else {
                        Vec::new()
                    };
                    DispatchResult::with(effects, true)
                }
                Err(e) => {
                    self.modal("Workspace", e.to_string());
                    DispatchResult::changed(true)
                }
            },
            Action::ToggleExpand { id } => {
                self.state.workspace.toggle_expand(id);
                DispatchResult::changed(true)
            }
            Action::SelectNode { id } => {
                self.state.workspace.set_selected(id);
                DispatchResult::changed(true)
            }
            Action::OpenFile { id } => {
                if self.state.workspace.file_content(id).is_none() {
                    return DispatchResult::none();
                }
                let was_active = self.state.editor.active();
                let changed = self.state.editor.open(id);
                self.state.workspace.set_selected(Some(id));
                let effects = if was_active != Some(id) {
                    self.on_active_changed()
                } else {
                    Vec::new()
                };
                DispatchResult::with(effects, changed || was_active != Some(id))
            }
            Action::ExportNode { id } => {
                let Some(name) = self.state.workspace.name(id).map(str::to_string) else {
                    return DispatchResult::none();
                };
                let effect = if self.state.workspace.is_folder(id) {
                    Effect::ExportZip {
                        archive_name: format!("{name}.zip"),
                        entries: self.state.workspace.export_entries(id),
                    }
                } else {
                    match self.state.workspace.file_content(id) {
                        Some(content) => Effect::ExportFile {
                            name,
                            content: content.to_string(),
                        },
                        None => return DispatchResult::none(),
                    }
                };
                DispatchResult::with(vec![effect], false)
            }
            Action::ExportWorkspace => DispatchResult::with(
                vec![Effect::ExportZip {
                    archive_name: "workspace.zip".to_string(),
                    entries: self.state.workspace.export_all_entries(),
                }],
                false,
            ),

            // ------------------------------------------------------------------
            // 编辑器
            Action::ActivateTab { id } => {
                if self.state.editor.activate(id) {
                    let effects = self.on_active_changed();
                    DispatchResult::with(effects, true)
                } else {
                    DispatchResult::none()
                }
            }
            Action::CloseTab { id } => {
                let was_active = self.state.editor.active() == Some(id);
                let changed = self.state.editor.close(id);
                let effects = if changed && was_active {
                    self.on_active_changed()
                } else {
                    Vec::new()
                };
                DispatchResult::with(effects, changed)
            }
            Action::EditActiveFile { content } => {
                let Some(file) = self.state.editor.active() else {
                    return DispatchResult::none();
                };
                if !self.state.workspace.set_file_content(file, content) {
                    return DispatchResult::none();
                }
                let effects = self.lint_active();
                DispatchResult::with(effects, true)
            }
            Action::OpenTopic { flat_index } => {
                let Some((plan, index, topic)) = learning::topic_at(flat_index) else {
                    return DispatchResult::none();
                };
                let path = topic.scratch_path(plan.day, index);
                let id = match self.state.workspace.find_by_path(&path) {
                    Some(id) => {
                        self.state.workspace.set_file_content(id, topic.code.to_string());
                        Some(id)
                    }
                    None => self
                        .state
                        .workspace
                        .create_at_path(&path, NodeKind::File, Some(topic.code.to_string()))
                        .ok(),
                };
                match id {
                    Some(id) => {
                        self.state.editor.open(id);
                        let effects = self.on_active_changed();
                        DispatchResult::with(effects, true)
                    }
                    None => DispatchResult::none(),
                }
            }
            Action::RunActiveFile => {
                let terminal = self.run_target();
                self.state.layout.bottom_visible = true;
                self.state.layout.bottom_tab = BottomTab::Terminal(terminal);
                self.append_terminal(terminal, MessageKind::Command, "run");
                let effects = self.run_in_terminal(terminal);
                DispatchResult::with(effects, true)
            }

            // ------------------------------------------------------------------
            // 行内 AI 与修复
            Action::InlineOpenPrompt { start, end } => {
                if self.state.editor.active().is_none() {
                    return DispatchResult::none();
                }
                DispatchResult::changed(self.state.editor.inline.open_prompt(start, end))
            }
            Action::InlineClosePrompt => {
                DispatchResult::changed(self.state.editor.inline.close_prompt())
            }
            Action::InlineSubmit { prompt } => {
                let Some(range) = self.state.editor.inline.prompt else {
                    return DispatchResult::none();
                };
                let Some(file) = self.state.editor.active() else {
                    return DispatchResult::none();
                };
                let Some(content) = self.state.workspace.file_content(file).map(str::to_string)
                else {
                    return DispatchResult::none();
                };
                let effect = if range.is_generate() {
                    let request_id = self.state.editor.inline.submit_generate(range.start);
                    Effect::GenerateInline {
                        file,
                        request_id,
                        prompt,
                        context: content,
                    }
                } else {
                    let selected = content
                        .get(range.start..range.end)
                        .unwrap_or("")
                        .to_string();
                    let request_id = self.state.editor.inline.submit_edit(
                        range.start,
                        range.end,
                        selected.clone(),
                    );
                    Effect::EditInline {
                        file,
                        request_id,
                        prompt,
                        selected,
                        context: content,
                    }
                };
                DispatchResult::with(vec![effect], true)
            }
            Action::InlineAccept => {
                let Some((start, end, new_code, fix_line)) = self.state.editor.inline.accept()
                else {
                    return DispatchResult::none();
                };
                if let Some(line) = fix_line {
                    self.state.editor.fixes.finish_line(line);
                }
                let mut effects = Vec::new();
                if let Some(file) = self.state.editor.active() {
                    if let Some(content) = self.state.workspace.file_content(file) {
                        let updated = splice(content, start, end, &new_code);
                        self.state.workspace.set_file_content(file, updated);
                        effects = self.lint_active();
                    }
                }
                DispatchResult::with(effects, true)
            }
            Action::InlineReject => {
                if let Some(line) = self.state.editor.inline.reject() {
                    self.state.editor.fixes.finish_line(line);
                }
                DispatchResult::changed(true)
            }
            Action::InlineDismiss => {
                let (changed, fix_line) = self.state.editor.inline.dismiss_views();
                if let Some(line) = fix_line {
                    self.state.editor.fixes.finish_line(line);
                }
                DispatchResult::changed(changed)
            }
            Action::FixProblem { line } => {
                if !self.state.editor.fixes.can_fix_line(line)
                    || self.state.editor.inline.suggestion.is_some()
                {
                    return DispatchResult::none();
                }
                let Some(problem) = self.state.problems.problem_on_line(line).cloned() else {
                    return DispatchResult::none();
                };
                let Some(file) = self.state.editor.active() else {
                    return DispatchResult::none();
                };
                let Some(content) = self.state.workspace.file_content(file).map(str::to_string)
                else {
                    return DispatchResult::none();
                };
                let Some((start, end)) = line_range(&content, line) else {
                    return DispatchResult::none();
                };
                let selected = content.get(start..end).unwrap_or("").to_string();
                let request_id =
                    self.state
                        .editor
                        .inline
                        .submit_line_fix(line, start, end, selected.clone());
                self.state.editor.fixes.start_line(line);
                DispatchResult::with(
                    vec![Effect::EditInline {
                        file,
                        request_id,
                        prompt: prompts::line_fix_instruction(&problem),
                        selected,
                        context: content,
                    }],
                    true,
                )
            }
            Action::FixAllProblems => {
                if !self.state.editor.fixes.can_fix_all()
                    || self.state.problems.items().is_empty()
                    || self.state.editor.inline.suggestion.is_some()
                {
                    return DispatchResult::none();
                }
                let Some(file) = self.state.editor.active() else {
                    return DispatchResult::none();
                };
                let Some(code) = self.state.workspace.file_content(file).map(str::to_string)
                else {
                    return DispatchResult::none();
                };
                self.state.editor.fixes.start_all();
                DispatchResult::with(
                    vec![Effect::FixAll {
                        file,
                        code,
                        problems: self.state.problems.items().to_vec(),
                    }],
                    true,
                )
            }

            // ------------------------------------------------------------------
            // 问题面板
            Action::ProblemsMoveSelection { delta } => {
                DispatchResult::changed(self.state.problems.move_selection(delta))
            }
            Action::ProblemsActivate => {
                let line = self
                    .state
                    .problems
                    .items()
                    .get(self.state.problems.selected())
                    .map(|p| p.line);
                match line {
                    Some(line) => {
                        self.state.jump_to_line = Some(line);
                        DispatchResult::changed(true)
                    }
                    None => DispatchResult::none(),
                }
            }
            Action::ClearJump => {
                let had = self.state.jump_to_line.take().is_some();
                DispatchResult::changed(had)
            }

            // ------------------------------------------------------------------
            // 终端
            Action::TerminalCreate => {
                let id = self.state.terminals.create_session();
                self.state.layout.bottom_visible = true;
                self.state.layout.bottom_tab = BottomTab::Terminal(id);
                DispatchResult::changed(true)
            }
            Action::TerminalClose { id } => {
                let closed = self.state.terminals.close_session(id);
                if closed {
                    self.state.layout.on_terminal_closed(id);
                }
                DispatchResult::changed(closed)
            }
            Action::TerminalSetInput { id, input } => {
                match self.state.terminals.session_mut(id) {
                    Some(session) => {
                        session.input = input;
                        DispatchResult::changed(true)
                    }
                    None => DispatchResult::none(),
                }
            }
            Action::TerminalSubmit { id } => {
                let command = match self.state.terminals.session_mut(id) {
                    Some(session) => std::mem::take(&mut session.input).trim().to_string(),
                    None => return DispatchResult::none(),
                };
                if command.is_empty() {
                    return DispatchResult::none();
                }
                if let Some(session) = self.state.terminals.session_mut(id) {
                    session.recall.push(&command);
                }
                let effects = self.submit_command(id, command);
                DispatchResult::with(effects, true)
            }
            Action::TerminalRecallPrev { id } => match self.state.terminals.session_mut(id) {
                Some(session) => {
                    let entry = session.recall.prev().map(str::to_string);
                    match entry {
                        Some(entry) => {
                            session.input = entry;
                            DispatchResult::changed(true)
                        }
                        None => DispatchResult::none(),
                    }
                }
                None => DispatchResult::none(),
            },
            Action::TerminalRecallNext { id } => match self.state.terminals.session_mut(id) {
                Some(session) => {
                    let entry = session.recall.next().map(str::to_string);
                    match entry {
                        Some(entry) => {
                            session.input = entry;
                            DispatchResult::changed(true)
                        }
                        None => DispatchResult::none(),
                    }
                }
                None => DispatchResult::none(),
            },

            // ------------------------------------------------------------------
            // 布局
            Action::PanelDragStart { panel } => {
                self.state.layout.begin_drag(panel);
                DispatchResult::changed(true)
            }
            Action::PointerMoved {
                x,
                y,
                viewport_w,
                viewport_h,
            } => DispatchResult::changed(
                self.state.layout.pointer_moved(x, y, viewport_w, viewport_h),
            ),
            Action::PointerReleased => {
                let changed = self.state.layout.pointer_released();
                DispatchResult::with(vec![self.save_ui_effect()], changed)
            }
            Action::PanelDragReset => DispatchResult::changed(self.state.layout.reset()),
            Action::SetLeftTab { tab } => {
                let prev = self.state.layout.left_tab;
                self.state.layout.left_tab = tab;
                DispatchResult::changed(prev != tab)
            }
            Action::SetRightTab { tab } => {
                let prev = self.state.layout.right_tab;
                self.state.layout.right_tab = tab;
                DispatchResult::changed(prev != tab)
            }
            Action::ToggleBottomPanel => {
                self.state.layout.bottom_visible = !self.state.layout.bottom_visible;
                DispatchResult::changed(true)
            }
            Action::SetBottomTab { tab } => {
                let prev_visible = self.state.layout.bottom_visible;
                let prev = self.state.layout.bottom_tab;
                self.state.layout.bottom_visible = true;
                self.state.layout.bottom_tab = tab;
                DispatchResult::changed(!prev_visible || prev != tab)
            }

            // ------------------------------------------------------------------
            // 聊天与代理
            Action::SetAgent { agent } => {
                let prev = self.state.chat.agent;
                self.state.chat.agent = agent;
                DispatchResult::changed(prev != agent)
            }
            Action::SendChat { message, image } => {
                if self.state.chat.sending || (message.is_empty() && image.is_none()) {
                    return DispatchResult::none();
                }
                let image_label = image.as_ref().map(|i| format!("[image: {}]", i.mime_type));
                self.state.chat.push_user(message.clone(), image_label);
                self.state.chat.sending = true;

                let workspace_json = self.workspace_json();
                let active_file = self.state.active_file_name();
                let effect = if self.state.chat.agent == AgentKind::Builder {
                    Effect::BuildAgentPlan {
                        message,
                        workspace_json,
                        active_file,
                        image,
                    }
                } else {
                    Effect::Chat {
                        agent: self.state.chat.agent,
                        message,
                        workspace_json,
                        active_file,
                        image,
                    }
                };
                DispatchResult::with(vec![effect], true)
            }
            Action::ApplyAgentActions { message_id } => {
                let mut chat = std::mem::take(&mut self.state.chat);
                let removed = chat.apply_actions(message_id, &mut self.state.workspace);
                self.state.chat = chat;
                match removed {
                    Some(removed) => {
                        let was_active = self
                            .state
                            .editor
                            .active()
                            .is_some_and(|a| removed.contains(&a));
                        self.state.editor.evict(&removed);
                        let effects = if was_active {
                            self.on_active_changed()
                        } else {
                            // 代理可能改写了活动文件的内容
                            self.lint_active()
                        };
                        DispatchResult::with(effects, true)
                    }
                    None => DispatchResult::none(),
                }
            }
            Action::RejectAgentActions { message_id } => {
                DispatchResult::changed(self.state.chat.reject_actions(message_id))
            }
            Action::ChatFinished { result } => {
                self.state.chat.sending = false;
                match result {
                    Ok(text) => {
                        self.state.chat.push_model(text);
                    }
                    Err(e) => {
                        self.modal("Chat", e);
                    }
                }
                DispatchResult::changed(true)
            }
            Action::AgentPlanFinished { result } => {
                self.state.chat.sending = false;
                let response = match result {
                    Ok(response) => response,
                    // 失败折叠成致歉说明加空动作批，与会话流保持一致
                    Err(e) => AgentResponse {
                        explanation: format!(
                            "I'm sorry, I encountered an error while trying to process your request.\n\n**Error:**\n```\n{e}\n```"
                        ),
                        actions: Vec::new(),
                    },
                };
                self.state.chat.push_agent_response(response);
                DispatchResult::changed(true)
            }

            // ------------------------------------------------------------------
            // 杂项
            Action::SetNotes { text } => {
                self.state.notes = text;
                DispatchResult::with(vec![self.save_ui_effect()], true)
            }
            Action::ToggleTheme => {
                self.state.theme = self.state.theme.toggled();
                DispatchResult::changed(true)
            }
            Action::DismissModal => DispatchResult::changed(self.state.modal.take().is_some()),
            Action::HydratePersisted { panel_sizes, notes } => {
                self.state.layout.restore_sizes(&panel_sizes);
                self.state.notes = notes;
                DispatchResult::changed(true)
            }

            // ------------------------------------------------------------------
            // 异步完成回执
            Action::ExecutionFinished { terminal, result } => {
                self.state.executing = false;
                match result {
                    Ok(output) => {
                        if !output.terminal_output.is_empty() {
                            self.append_terminal(
                                terminal,
                                MessageKind::PhpOutput,
                                output.terminal_output,
                            );
                        }
                        if !output.web_output.is_empty() {
                            self.state.layout.right_tab =
                                Some(crate::kernel::layout::RightPanelTab::Webview);
                        }
                        self.state.last_web_output = output.web_output;
                    }
                    Err(e) => {
                        self.append_terminal(
                            terminal,
                            MessageKind::Error,
                            format!("// AI Execution Error //\n{e}"),
                        );
                        self.modal("Execution", e);
                    }
                }
                DispatchResult::changed(true)
            }
            Action::LintFinished { file, problems } => {
                self.state.problems.lint_in_flight = false;
                if self.state.editor.active() == Some(file) {
                    DispatchResult::changed(self.state.problems.replace(problems))
                } else {
                    // 活动文件已切换，结果作废
                    DispatchResult::changed(false)
                }
            }
            Action::FixAllFinished { file, result } => {
                self.state.editor.fixes.finish_all();
                match result {
                    Ok(fixed) => {
                        if !self.state.workspace.set_file_content(file, fixed) {
                            return DispatchResult::changed(true);
                        }
                        let effects = if self.state.editor.active() == Some(file) {
                            self.lint_active()
                        } else {
                            Vec::new()
                        };
                        DispatchResult::with(effects, true)
                    }
                    Err(e) => {
                        self.modal("Fix All", e);
                        DispatchResult::changed(true)
                    }
                }
            }
            Action::InlineGenerateFinished {
                file,
                request_id,
                result,
            } => match result {
                Ok(code) => {
                    let Some(at) = self.state.editor.inline.take_generate_target(request_id)
                    else {
                        return DispatchResult::none();
                    };
                    let Some(content) = self.state.workspace.file_content(file).map(str::to_string)
                    else {
                        return DispatchResult::changed(true);
                    };
                    let updated = splice(&content, at, at, &code);
                    self.state.workspace.set_file_content(file, updated);
                    let effects = if self.state.editor.active() == Some(file) {
                        self.lint_active()
                    } else {
                        Vec::new()
                    };
                    DispatchResult::with(effects, true)
                }
                Err(e) => {
                    self.state.editor.inline.take_failed(request_id);
                    self.modal("Inline AI", e);
                    DispatchResult::changed(true)
                }
            },
            Action::InlineEditFinished {
                file: _,
                request_id,
                result,
            } => {
                let current = self
                    .state
                    .editor
                    .inline
                    .suggestion
                    .as_ref()
                    .is_some_and(|s| s.request_id == request_id);
                if !current {
                    // 视图已被撤下，过期结果丢弃
                    return DispatchResult::none();
                }
                match result {
                    Ok(code) => DispatchResult::changed(
                        self.state.editor.inline.resolve_suggestion(request_id, code),
                    ),
                    Err(e) => {
                        if let Some(line) = self.state.editor.inline.take_failed(request_id) {
                            self.state.editor.fixes.finish_line(line);
                        }
                        self.modal("Inline AI", e);
                        DispatchResult::changed(true)
                    }
                }
            }
            Action::PackageLookupFinished {
                terminal,
                manager,
                result,
            } => {
                match result {
                    Ok(info) => self.append_terminal(
                        terminal,
                        MessageKind::Output,
                        format!("+ {} {}", info.package_name, info.latest_version),
                    ),
                    Err(e) => self.append_terminal(
                        terminal,
                        MessageKind::Error,
                        format!("{} lookup failed: {e}", manager.label()),
                    ),
                }
                DispatchResult::changed(true)
            }
            Action::ExportFinished { result } => {
                match result {
                    Ok(path) => self.modal("Export", format!("Saved to {}", path.display())),
                    Err(e) => self.modal("Export", e),
                }
                DispatchResult::changed(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::chat::{AgentAction, AgentActionKind, AgentStatus, ImageAttachment};
    use crate::kernel::problems::{CodeProblem, ProblemSeverity};
    use crate::oracle::ExecutionResult;

    fn store() -> Store {
        Store::new(AppState::new())
    }

    fn first_terminal(store: &Store) -> TerminalId {
        store.state().terminals.sessions[0].id
    }

    fn problem(line: u32, message: &str) -> CodeProblem {
        CodeProblem {
            line,
            message: message.to_string(),
            severity: ProblemSeverity::Error,
        }
    }

    #[test]
    fn starts_with_index_open_and_one_terminal() {
        let store = store();
        assert_eq!(store.state().active_file_name(), "index.php");
        assert_eq!(store.state().terminals.sessions.len(), 1);
    }

    #[test]
    fn duplicate_create_reports_via_modal_and_keeps_one_node() {
        let mut store = store();
        store.dispatch(Action::CreateNode {
            name: "a.php".into(),
            kind: NodeKind::File,
            parent: None,
        });
        store.dispatch(Action::CreateNode {
            name: "a.php".into(),
            kind: NodeKind::File,
            parent: None,
        });
        assert!(store.state().modal.is_some());
        let count = store
            .state()
            .workspace
            .rows()
            .iter()
            .filter(|r| r.name == "a.php")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn delete_active_file_cascades_and_relints() {
        let mut store = store();
        let helpers = store.state().workspace.find_by_path("src/helpers.php").unwrap();
        store.dispatch(Action::OpenFile { id: helpers });
        store.dispatch(Action::LintFinished {
            file: helpers,
            problems: vec![problem(1, "x")],
        });
        assert_eq!(store.state().problems.items().len(), 1);

        let src = store.state().workspace.find_by_path("src").unwrap();
        let result = store.dispatch(Action::DeleteNode { id: src });
        assert!(!store.state().editor.open_files().contains(&helpers));
        assert_eq!(store.state().active_file_name(), "index.php");
        // 旧文件的问题清场，新活动文件重新 lint
        assert!(store.state().problems.items().is_empty());
        assert!(matches!(result.effects.as_slice(), [Effect::Lint { .. }]));
    }

    #[test]
    fn run_command_executes_active_file() {
        let mut store = store();
        let terminal = first_terminal(&store);
        store.dispatch(Action::TerminalSetInput {
            id: terminal,
            input: "run".into(),
        });
        let result = store.dispatch(Action::TerminalSubmit { id: terminal });
        assert!(store.state().executing);
        match result.effects.as_slice() {
            [Effect::ExecutePhp { code, .. }] => assert!(code.contains("Hello, PHP!")),
            other => panic!("unexpected effects: {other:?}"),
        }

        store.dispatch(Action::ExecutionFinished {
            terminal,
            result: Ok(ExecutionResult {
                terminal_output: "Hello, PHP!".into(),
                web_output: "<h1>Hello</h1>".into(),
            }),
        });
        assert!(!store.state().executing);
        assert_eq!(store.state().last_web_output, "<h1>Hello</h1>");
        let session = store.state().terminals.session(terminal).unwrap();
        let last = session.history.last().unwrap();
        assert_eq!(last.kind, MessageKind::PhpOutput);
        assert_eq!(last.text, "Hello, PHP!");
    }

    #[test]
    fn execution_failure_lands_in_terminal_and_modal() {
        let mut store = store();
        let terminal = first_terminal(&store);
        store.dispatch(Action::ExecutionFinished {
            terminal,
            result: Err("quota exceeded".into()),
        });
        let session = store.state().terminals.session(terminal).unwrap();
        assert!(session
            .history
            .last()
            .unwrap()
            .text
            .starts_with("// AI Execution Error //"));
        assert!(store.state().modal.is_some());
    }

    #[test]
    fn unknown_command_and_help_are_local() {
        let mut store = store();
        let terminal = first_terminal(&store);
        for (input, kind) in [("frobnicate", MessageKind::Error), ("help", MessageKind::System)] {
            store.dispatch(Action::TerminalSetInput {
                id: terminal,
                input: input.into(),
            });
            let result = store.dispatch(Action::TerminalSubmit { id: terminal });
            assert!(result.effects.is_empty());
            let session = store.state().terminals.session(terminal).unwrap();
            assert_eq!(session.history.last().unwrap().kind, kind);
        }

        store.dispatch(Action::TerminalSetInput {
            id: terminal,
            input: "clear".into(),
        });
        store.dispatch(Action::TerminalSubmit { id: terminal });
        assert!(store
            .state()
            .terminals
            .session(terminal)
            .unwrap()
            .history
            .is_empty());
    }

    #[test]
    fn composer_require_schedules_lookup() {
        let mut store = store();
        let terminal = first_terminal(&store);
        store.dispatch(Action::TerminalSetInput {
            id: terminal,
            input: "composer require monolog/monolog".into(),
        });
        let result = store.dispatch(Action::TerminalSubmit { id: terminal });
        assert!(matches!(
            result.effects.as_slice(),
            [Effect::PackageLookup {
                manager: PackageManager::Composer,
                ..
            }]
        ));

        store.dispatch(Action::PackageLookupFinished {
            terminal,
            manager: PackageManager::Composer,
            result: Ok(crate::oracle::PackageInfo {
                package_name: "monolog/monolog".into(),
                latest_version: "^3.5".into(),
            }),
        });
        let session = store.state().terminals.session(terminal).unwrap();
        assert_eq!(session.history.last().unwrap().text, "+ monolog/monolog ^3.5");
    }

    #[test]
    fn stale_lint_results_are_dropped() {
        let mut store = store();
        let helpers = store.state().workspace.find_by_path("src/helpers.php").unwrap();
        // 活动文件是 index.php，helpers 的结果不得落盘
        store.dispatch(Action::LintFinished {
            file: helpers,
            problems: vec![problem(1, "stale")],
        });
        assert!(store.state().problems.items().is_empty());
    }

    #[test]
    fn fix_all_rewrites_buffer_and_relints() {
        let mut store = store();
        let index = store.state().editor.active().unwrap();
        store.dispatch(Action::LintFinished {
            file: index,
            problems: vec![problem(3, "missing semicolon")],
        });

        let result = store.dispatch(Action::FixAllProblems);
        assert!(matches!(result.effects.as_slice(), [Effect::FixAll { .. }]));
        // 在途期间重复触发被拒
        assert!(store.dispatch(Action::FixAllProblems).effects.is_empty());

        let result = store.dispatch(Action::FixAllFinished {
            file: index,
            result: Ok("<?php\necho \"fixed\";\n".into()),
        });
        assert_eq!(
            store.state().workspace.file_content(index),
            Some("<?php\necho \"fixed\";\n")
        );
        assert!(matches!(result.effects.as_slice(), [Effect::Lint { .. }]));
        assert!(store.state().editor.fixes.can_fix_all());
    }

    #[test]
    fn inline_generate_splices_at_cursor() {
        let mut store = store();
        let index = store.state().editor.active().unwrap();
        store.dispatch(Action::EditActiveFile {
            content: "<?php\n".into(),
        });
        store.dispatch(Action::InlineOpenPrompt { start: 6, end: 6 });
        let result = store.dispatch(Action::InlineSubmit {
            prompt: "echo hello".into(),
        });
        let request_id = match result.effects.as_slice() {
            [Effect::GenerateInline { request_id, .. }] => *request_id,
            other => panic!("unexpected effects: {other:?}"),
        };

        store.dispatch(Action::InlineGenerateFinished {
            file: index,
            request_id,
            result: Ok("echo 'hello';".into()),
        });
        assert_eq!(
            store.state().workspace.file_content(index),
            Some("<?php\necho 'hello';")
        );
    }

    #[test]
    fn inline_edit_flow_accepts_suggestion() {
        let mut store = store();
        let index = store.state().editor.active().unwrap();
        store.dispatch(Action::EditActiveFile {
            content: "<?php\necho \"old\";\n".into(),
        });
        store.dispatch(Action::InlineOpenPrompt { start: 6, end: 16 });
        let result = store.dispatch(Action::InlineSubmit {
            prompt: "say new".into(),
        });
        let request_id = match result.effects.as_slice() {
            [Effect::EditInline {
                request_id,
                selected,
                ..
            }] => {
                assert_eq!(selected, "echo \"old\"");
                *request_id
            }
            other => panic!("unexpected effects: {other:?}"),
        };

        store.dispatch(Action::InlineEditFinished {
            file: index,
            request_id,
            result: Ok("echo \"new\"".into()),
        });
        store.dispatch(Action::InlineAccept);
        assert_eq!(
            store.state().workspace.file_content(index),
            Some("<?php\necho \"new\";\n")
        );
        assert!(store.state().editor.inline.suggestion.is_none());
    }

    #[test]
    fn dismissed_edit_ignores_late_completion() {
        let mut store = store();
        let index = store.state().editor.active().unwrap();
        store.dispatch(Action::InlineOpenPrompt { start: 0, end: 5 });
        let result = store.dispatch(Action::InlineSubmit {
            prompt: "tweak".into(),
        });
        let request_id = match result.effects.as_slice() {
            [Effect::EditInline { request_id, .. }] => *request_id,
            other => panic!("unexpected effects: {other:?}"),
        };
        store.dispatch(Action::InlineDismiss);

        let result = store.dispatch(Action::InlineEditFinished {
            file: index,
            request_id,
            result: Ok("late".into()),
        });
        assert!(!result.state_changed);
        assert!(store.state().editor.inline.suggestion.is_none());
    }

    #[test]
    fn generate_survives_edits_made_while_request_in_flight() {
        let mut store = store();
        let index = store.state().editor.active().unwrap();
        store.dispatch(Action::EditActiveFile { content: "ab".into() });
        store.dispatch(Action::InlineOpenPrompt { start: 1, end: 1 });
        let result = store.dispatch(Action::InlineSubmit {
            prompt: "insert".into(),
        });
        let request_id = match result.effects.as_slice() {
            [Effect::GenerateInline { request_id, .. }] => *request_id,
            other => panic!("unexpected effects: {other:?}"),
        };

        // 请求在途期间用户继续编辑，记下的偏移 1 落进 é 的字节中间
        store.dispatch(Action::EditActiveFile { content: "éb".into() });
        store.dispatch(Action::InlineGenerateFinished {
            file: index,
            request_id,
            result: Ok("X".into()),
        });
        assert_eq!(store.state().workspace.file_content(index), Some("Xéb"));
    }

    #[test]
    fn per_line_fix_reserves_line_and_releases_on_reject() {
        let mut store = store();
        let index = store.state().editor.active().unwrap();
        store.dispatch(Action::EditActiveFile {
            content: "<?php\necho \"x\"\n".into(),
        });
        store.dispatch(Action::LintFinished {
            file: index,
            problems: vec![problem(2, "missing semicolon"), problem(3, "stray brace")],
        });

        let result = store.dispatch(Action::FixProblem { line: 2 });
        match result.effects.as_slice() {
            [Effect::EditInline { prompt, selected, .. }] => {
                assert!(prompt.contains("missing semicolon"));
                assert_eq!(selected, "echo \"x\"");
            }
            other => panic!("unexpected effects: {other:?}"),
        }
        assert!(!store.state().editor.fixes.can_fix_line(2));
        // 同一行重复触发被拒
        assert!(store.dispatch(Action::FixProblem { line: 2 }).effects.is_empty());
        // 建议视图只有一个槽位，另一行也要等它出结果
        assert!(store.dispatch(Action::FixProblem { line: 3 }).effects.is_empty());
        assert!(store.state().editor.fixes.can_fix_line(3));

        store.dispatch(Action::InlineReject);
        assert!(store.state().editor.fixes.can_fix_line(2));
        assert!(!store.dispatch(Action::FixProblem { line: 3 }).effects.is_empty());
    }

    #[test]
    fn builder_chat_proposes_then_applies_batch() {
        let mut store = store();
        store.dispatch(Action::SetAgent {
            agent: AgentKind::Builder,
        });
        let result = store.dispatch(Action::SendChat {
            message: "scaffold".into(),
            image: None,
        });
        assert!(matches!(
            result.effects.as_slice(),
            [Effect::BuildAgentPlan { .. }]
        ));
        assert!(store.state().chat.sending);
        // 在途期间再次发送被拒
        assert!(store
            .dispatch(Action::SendChat {
                message: "again".into(),
                image: None
            })
            .effects
            .is_empty());

        store.dispatch(Action::AgentPlanFinished {
            result: Ok(AgentResponse {
                explanation: "Creating app.php".into(),
                actions: vec![AgentAction {
                    kind: AgentActionKind::CreateFile,
                    path: "app.php".into(),
                    content: Some("<?php".into()),
                }],
            }),
        });
        let message_id = store.state().chat.messages.last().unwrap().id;
        assert_eq!(
            store.state().chat.message(message_id).unwrap().agent_status,
            Some(AgentStatus::Pending)
        );

        store.dispatch(Action::ApplyAgentActions { message_id });
        assert!(store.state().workspace.find_by_path("app.php").is_some());
        assert_eq!(
            store.state().chat.message(message_id).unwrap().agent_status,
            Some(AgentStatus::Applied)
        );
    }

    #[test]
    fn builder_failure_degrades_to_apology_without_actions() {
        let mut store = store();
        store.dispatch(Action::AgentPlanFinished {
            result: Err("model unavailable".into()),
        });
        let last = store.state().chat.messages.last().unwrap();
        assert!(last.content.contains("model unavailable"));
        assert_eq!(last.agent_status, None);
        assert!(store.state().modal.is_none());
    }

    #[test]
    fn chat_with_image_only_is_allowed() {
        let mut store = store();
        let result = store.dispatch(Action::SendChat {
            message: String::new(),
            image: Some(ImageAttachment {
                mime_type: "image/png".into(),
                data: "aGk=".into(),
            }),
        });
        assert!(matches!(result.effects.as_slice(), [Effect::Chat { .. }]));
        assert!(store
            .state()
            .chat
            .messages
            .last()
            .unwrap()
            .image_url
            .as_deref()
            .unwrap()
            .contains("image/png"));
    }

    #[test]
    fn pointer_release_persists_panel_sizes() {
        let mut store = store();
        store.dispatch(Action::PanelDragStart {
            panel: crate::kernel::layout::PanelId::Sidebar,
        });
        store.dispatch(Action::PointerMoved {
            x: 30,
            y: 0,
            viewport_w: 120,
            viewport_h: 40,
        });
        let result = store.dispatch(Action::PointerReleased);
        match result.effects.as_slice() {
            [Effect::SaveUiState { panel_sizes, .. }] => {
                assert_eq!(panel_sizes.get("panel.sidebar"), Some(&30));
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn drag_reset_recovers_from_lost_release() {
        let mut store = store();
        store.dispatch(Action::PanelDragStart {
            panel: crate::kernel::layout::PanelId::Sidebar,
        });
        assert!(store.state().layout.interactions_suppressed());

        // release 事件丢失，卸载路径兜底
        let result = store.dispatch(Action::PanelDragReset);
        assert!(result.state_changed);
        assert!(!store.state().layout.interactions_suppressed());
        assert!(!store.state().layout.sidebar.is_resizing());
        assert!(!store.dispatch(Action::PanelDragReset).state_changed);
    }

    #[test]
    fn export_node_picks_raw_file_or_zip() {
        let mut store = store();
        let index = store.state().workspace.find_by_path("index.php").unwrap();
        let result = store.dispatch(Action::ExportNode { id: index });
        assert!(matches!(
            result.effects.as_slice(),
            [Effect::ExportFile { .. }]
        ));

        let src = store.state().workspace.find_by_path("src").unwrap();
        let result = store.dispatch(Action::ExportNode { id: src });
        match result.effects.as_slice() {
            [Effect::ExportZip { archive_name, entries }] => {
                assert_eq!(archive_name, "src.zip");
                assert!(entries.iter().any(|e| e.path == "src/helpers.php"));
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn learning_topic_loads_sample_into_scratch_buffer() {
        let mut store = store();
        store.dispatch(Action::OpenTopic { flat_index: 0 });
        assert_eq!(
            store.state().active_file_name(),
            "day01-0-hello-world.php"
        );
        let id = store.state().editor.active().unwrap();
        assert!(store
            .state()
            .workspace
            .file_content(id)
            .unwrap()
            .contains("Hello, Modern PHP World!"));
    }

    #[test]
    fn closing_bottom_terminal_falls_back_to_problems() {
        let mut store = store();
        let terminal = first_terminal(&store);
        assert_eq!(store.state().layout.bottom_tab, BottomTab::Terminal(terminal));
        store.dispatch(Action::TerminalClose { id: terminal });
        assert_eq!(store.state().layout.bottom_tab, BottomTab::Problems);
    }
}
