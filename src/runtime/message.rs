use std::path::PathBuf;

use crate::kernel::chat::AgentResponse;
use crate::kernel::problems::CodeProblem;
use crate::kernel::terminal::TerminalId;
use crate::kernel::workspace::NodeId;
use crate::kernel::Action;
use crate::oracle::{ExecutionResult, PackageInfo, PackageManager};

/// 异步任务完成后送回主循环的消息，逐一折叠成内核 Action。
#[derive(Debug)]
pub enum AppMessage {
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

impl AppMessage {
    pub fn into_action(self) -> Action {
        match self {
            AppMessage::ExecutionFinished { terminal, result } => {
                Action::ExecutionFinished { terminal, result }
            }
            AppMessage::LintFinished { file, problems } => Action::LintFinished { file, problems },
            AppMessage::FixAllFinished { file, result } => Action::FixAllFinished { file, result },
            AppMessage::InlineGenerateFinished {
                file,
                request_id,
                result,
            } => Action::InlineGenerateFinished {
                file,
                request_id,
                result,
            },
            AppMessage::InlineEditFinished {
                file,
                request_id,
                result,
            } => Action::InlineEditFinished {
                file,
                request_id,
                result,
            },
            AppMessage::ChatFinished { result } => Action::ChatFinished { result },
            AppMessage::AgentPlanFinished { result } => Action::AgentPlanFinished { result },
            AppMessage::PackageLookupFinished {
                terminal,
                manager,
                result,
            } => Action::PackageLookupFinished {
                terminal,
                manager,
                result,
            },
            AppMessage::ExportFinished { result } => Action::ExportFinished { result },
        }
    }
}
