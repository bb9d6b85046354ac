use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::kernel::chat::{AgentKind, AgentResponse, ImageAttachment};
use crate::kernel::layout::{BottomTab, LeftPanelTab, PanelId, RightPanelTab};
use crate::kernel::problems::CodeProblem;
use crate::kernel::terminal::TerminalId;
use crate::kernel::workspace::{NodeId, NodeKind};
use crate::oracle::{ExecutionResult, PackageInfo, PackageManager};

/// 所有进入内核的事件：UI 意图在前，异步完成回执在后。
#[derive(Debug, Clone)]
pub enum Action {
    // 工作区
    CreateNode {
        name: String,
        kind: NodeKind,
        parent: Option<NodeId>,
    },
    RenameNode {
        id: NodeId,
        new_name: String,
    },
    DeleteNode {
        id: NodeId,
    },
    ToggleExpand {
        id: NodeId,
    },
    SelectNode {
        id: Option<NodeId>,
    },
    OpenFile {
        id: NodeId,
    },
    ExportNode {
        id: NodeId,
    },
    ExportWorkspace,

    // 编辑器
    ActivateTab {
        id: NodeId,
    },
    CloseTab {
        id: NodeId,
    },
    EditActiveFile {
        content: String,
    },
    OpenTopic {
        flat_index: usize,
    },
    RunActiveFile,

    // 行内 AI 与修复
    InlineOpenPrompt {
        start: usize,
        end: usize,
    },
    InlineClosePrompt,
    InlineSubmit {
        prompt: String,
    },
    InlineAccept,
    InlineReject,
    InlineDismiss,
    FixProblem {
        line: u32,
    },
    FixAllProblems,

    // 问题面板
    ProblemsMoveSelection {
        delta: isize,
    },
    ProblemsActivate,
    ClearJump,

    // 终端
    TerminalCreate,
    TerminalClose {
        id: TerminalId,
    },
    TerminalSetInput {
        id: TerminalId,
        input: String,
    },
    TerminalSubmit {
        id: TerminalId,
    },
    TerminalRecallPrev {
        id: TerminalId,
    },
    TerminalRecallNext {
        id: TerminalId,
    },

    // 布局
    PanelDragStart {
        panel: PanelId,
    },
    PointerMoved {
        x: u16,
        y: u16,
        viewport_w: u16,
        viewport_h: u16,
    },
    PointerReleased,
    /// 兜底：release 事件丢失或界面卸载时无条件回 idle。
    PanelDragReset,
    SetLeftTab {
        tab: LeftPanelTab,
    },
    SetRightTab {
        tab: Option<RightPanelTab>,
    },
    ToggleBottomPanel,
    SetBottomTab {
        tab: BottomTab,
    },

    // 聊天与代理
    SetAgent {
        agent: AgentKind,
    },
    SendChat {
        message: String,
        image: Option<ImageAttachment>,
    },
    ApplyAgentActions {
        message_id: u64,
    },
    RejectAgentActions {
        message_id: u64,
    },

    // 杂项
    SetNotes {
        text: String,
    },
    ToggleTheme,
    DismissModal,
    HydratePersisted {
        panel_sizes: BTreeMap<String, u16>,
        notes: String,
    },

    // 异步完成回执；错误一律折叠成展示用字符串
    ExecutionFinished {
        terminal: TerminalId,
        result: Result<ExecutionResult, String>,
    },
    LintFinished {
        file: NodeId,
        problems: Vec<CodeProblem>,
    },
    FixAllFinished {
        file: NodeId,
        result: Result<String, String>,
    },
    InlineGenerateFinished {
        file: NodeId,
        request_id: u64,
        result: Result<String, String>,
    },
    InlineEditFinished {
        file: NodeId,
        request_id: u64,
        result: Result<String, String>,
    },
    ChatFinished {
        result: Result<String, String>,
    },
    AgentPlanFinished {
        result: Result<AgentResponse, String>,
    },
    PackageLookupFinished {
        terminal: TerminalId,
        manager: PackageManager,
        result: Result<PackageInfo, String>,
    },
    ExportFinished {
        result: Result<PathBuf, String>,
    },
}
