use std::io;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::kernel::Effect;
use crate::oracle::{GeminiTransport, OracleClient};
use crate::services::{export, persistence, PersistedState};

use super::message::AppMessage;

/// 内核吐出的 Effect 在这里变成真正的网络与磁盘操作。
/// 每个 Effect 对应一个任务，任务结束恰好送回一条消息。
pub struct AsyncRuntime {
    runtime: tokio::runtime::Runtime,
    tx: Sender<AppMessage>,
    client: Arc<OracleClient<GeminiTransport>>,
}

impl AsyncRuntime {
    pub fn new(tx: Sender<AppMessage>, client: OracleClient<GeminiTransport>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::error!(
                    error = %e,
                    "Failed to create multi-thread tokio runtime, falling back to current-thread"
                );
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
            })?;
        Ok(Self {
            runtime,
            tx,
            client: Arc::new(client),
        })
    }

    pub fn execute(&self, effect: Effect) {
        let tx = self.tx.clone();
        let client = Arc::clone(&self.client);
        match effect {
            Effect::ExecutePhp { terminal, code } => {
                self.runtime.spawn(async move {
                    let result = client.execute(&code).await.map_err(|e| e.to_string());
                    let _ = tx.send(AppMessage::ExecutionFinished { terminal, result });
                });
            }
            Effect::Lint { file, code } => {
                self.runtime.spawn(async move {
                    let problems = client.lint(&code).await;
                    let _ = tx.send(AppMessage::LintFinished { file, problems });
                });
            }
            Effect::FixAll {
                file,
                code,
                problems,
            } => {
                self.runtime.spawn(async move {
                    let result = client
                        .fix_all(&code, &problems)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(AppMessage::FixAllFinished { file, result });
                });
            }
            Effect::GenerateInline {
                file,
                request_id,
                prompt,
                context,
            } => {
                self.runtime.spawn(async move {
                    let result = client
                        .generate_inline(&prompt, &context)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(AppMessage::InlineGenerateFinished {
                        file,
                        request_id,
                        result,
                    });
                });
            }
            Effect::EditInline {
                file,
                request_id,
                prompt,
                selected,
                context,
            } => {
                self.runtime.spawn(async move {
                    let result = client
                        .edit_inline(&prompt, &selected, &context)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(AppMessage::InlineEditFinished {
                        file,
                        request_id,
                        result,
                    });
                });
            }
            Effect::Chat {
                agent,
                message,
                workspace_json,
                active_file,
                image,
            } => {
                self.runtime.spawn(async move {
                    let result = client
                        .chat(agent, &message, &workspace_json, &active_file, image)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(AppMessage::ChatFinished { result });
                });
            }
            Effect::BuildAgentPlan {
                message,
                workspace_json,
                active_file,
                image,
            } => {
                self.runtime.spawn(async move {
                    let result = client
                        .build_plan(&message, &workspace_json, &active_file, image)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(AppMessage::AgentPlanFinished { result });
                });
            }
            Effect::PackageLookup {
                terminal,
                manager,
                package,
            } => {
                self.runtime.spawn(async move {
                    let result = client
                        .package_info(manager, &package)
                        .await
                        .map_err(|e| e.to_string());
                    let _ = tx.send(AppMessage::PackageLookupFinished {
                        terminal,
                        manager,
                        result,
                    });
                });
            }
            Effect::ExportFile { name, content } => {
                self.runtime.spawn(async move {
                    let result = tokio::task::spawn_blocking(move || {
                        export::write_file_export(&name, &content).map_err(|e| e.to_string())
                    })
                    .await
                    .unwrap_or_else(|e| Err(e.to_string()));
                    let _ = tx.send(AppMessage::ExportFinished { result });
                });
            }
            Effect::ExportZip {
                archive_name,
                entries,
            } => {
                self.runtime.spawn(async move {
                    let result = tokio::task::spawn_blocking(move || {
                        export::write_zip_export(&archive_name, &entries)
                            .map_err(|e| e.to_string())
                    })
                    .await
                    .unwrap_or_else(|e| Err(e.to_string()));
                    let _ = tx.send(AppMessage::ExportFinished { result });
                });
            }
            Effect::SaveUiState { panel_sizes, notes } => {
                // 没有回执，失败只记日志
                self.runtime.spawn(async move {
                    let _ = tokio::task::spawn_blocking(move || {
                        persistence::save(&PersistedState { panel_sizes, notes });
                    })
                    .await;
                });
            }
        }
    }
}
