use std::collections::BTreeMap;

use crate::kernel::chat::{AgentKind, ImageAttachment};
use crate::kernel::problems::CodeProblem;
use crate::kernel::terminal::TerminalId;
use crate::kernel::workspace::{ExportEntry, NodeId};
use crate::oracle::PackageManager;

/// 需要网络或磁盘的副作用，由异步运行时执行，内核本身从不阻塞。
#[derive(Debug, Clone)]
pub enum Effect {
    ExecutePhp {
        terminal: TerminalId,
        code: String,
    },
    Lint {
        file: NodeId,
        code: String,
    },
    FixAll {
        file: NodeId,
        code: String,
        problems: Vec<CodeProblem>,
    },
    GenerateInline {
        file: NodeId,
        request_id: u64,
        prompt: String,
        context: String,
    },
    EditInline {
        file: NodeId,
        request_id: u64,
        prompt: String,
        selected: String,
        context: String,
    },
    Chat {
        agent: AgentKind,
        message: String,
        workspace_json: String,
        active_file: String,
        image: Option<ImageAttachment>,
    },
    BuildAgentPlan {
        message: String,
        workspace_json: String,
        active_file: String,
        image: Option<ImageAttachment>,
    },
    PackageLookup {
        terminal: TerminalId,
        manager: PackageManager,
        package: String,
    },
    ExportFile {
        name: String,
        content: String,
    },
    ExportZip {
        archive_name: String,
        entries: Vec<ExportEntry>,
    },
    SaveUiState {
        panel_sizes: BTreeMap<String, u16>,
        notes: String,
    },
}
