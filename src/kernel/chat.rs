//! AI 聊天与代理动作：动作按消息成批提出，由用户一次性接受或拒绝。

use serde::{Deserialize, Serialize};

use super::workspace::{NodeId, NodeKind, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Agent,
    Writer,
    Fixer,
    Documenter,
    Tutor,
    Builder,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Agent,
        AgentKind::Writer,
        AgentKind::Fixer,
        AgentKind::Documenter,
        AgentKind::Tutor,
        AgentKind::Builder,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Agent => "Codebase Agent",
            Self::Writer => "Code Writer",
            Self::Fixer => "Bug Fixer",
            Self::Documenter => "Documenter",
            Self::Tutor => "PHP Tutor",
            Self::Builder => "Agent Builder",
        }
    }

    /// 只有 Builder 会提出文件系统动作，其余是纯会话。
    pub fn proposes_actions(self) -> bool {
        matches!(self, Self::Builder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentActionKind {
    CreateFile,
    UpdateFile,
    DeleteFile,
    CreateFolder,
    DeleteFolder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    #[serde(rename = "type")]
    pub kind: AgentActionKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub explanation: String,
    pub actions: Vec<AgentAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Pending,
    Applied,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub mime_type: String,
    /// base64 编码的图片字节
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub image_url: Option<String>,
    pub agent_response: Option<AgentResponse>,
    pub agent_status: Option<AgentStatus>,
}

#[derive(Debug)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    next_id: u64,
    pub agent: AgentKind,
    /// 同一时刻只允许一个聊天请求在途（发送按钮禁用）。
    pub sending: bool,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
            agent: AgentKind::Agent,
            sending: false,
        }
    }
}

impl ChatState {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_user(&mut self, content: String, image_url: Option<String>) -> u64 {
        let id = self.next_id();
        self.messages.push(ChatMessage {
            id,
            role: Role::User,
            content,
            image_url,
            agent_response: None,
            agent_status: None,
        });
        id
    }

    pub fn push_model(&mut self, content: String) -> u64 {
        let id = self.next_id();
        self.messages.push(ChatMessage {
            id,
            role: Role::Model,
            content,
            image_url: None,
            agent_response: None,
            agent_status: None,
        });
        id
    }

    pub fn push_agent_response(&mut self, response: AgentResponse) -> u64 {
        let id = self.next_id();
        let status = if response.actions.is_empty() {
            None
        } else {
            Some(AgentStatus::Pending)
        };
        self.messages.push(ChatMessage {
            id,
            role: Role::Model,
            content: response.explanation.clone(),
            image_url: None,
            agent_response: Some(response),
            agent_status: status,
        });
        id
    }

    pub fn message(&self, id: u64) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: u64) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// 整批应用：动作按提案顺序逐个执行，失效的跳过并告警，批次仍转 Applied。
    /// 返回被删除的节点 id（供编辑器驱逐）；批次不处于 Pending 时不做任何事。
    pub fn apply_actions(&mut self, id: u64, workspace: &mut Workspace) -> Option<Vec<NodeId>> {
        let actions = {
            let message = self.message_mut(id)?;
            if message.agent_status != Some(AgentStatus::Pending) {
                return None;
            }
            message
                .agent_response
                .as_ref()
                .map(|r| r.actions.clone())?
        };

        let mut removed = Vec::new();
        for action in &actions {
            let result = match action.kind {
                AgentActionKind::CreateFile => workspace
                    .create_at_path(&action.path, NodeKind::File, action.content.clone())
                    .map(|_| ()),
                AgentActionKind::CreateFolder => workspace
                    .create_at_path(&action.path, NodeKind::Folder, None)
                    .map(|_| ()),
                AgentActionKind::UpdateFile => workspace
                    .update_at_path(&action.path, action.content.clone().unwrap_or_default()),
                AgentActionKind::DeleteFile | AgentActionKind::DeleteFolder => workspace
                    .delete_at_path(&action.path)
                    .map(|mut ids| removed.append(&mut ids)),
            };
            if let Err(e) = result {
                tracing::warn!(path = %action.path, action = ?action.kind, error = %e, "agent action skipped");
            }
        }

        if let Some(message) = self.message_mut(id) {
            message.agent_status = Some(AgentStatus::Applied);
        }
        Some(removed)
    }

    pub fn reject_actions(&mut self, id: u64) -> bool {
        match self.message_mut(id) {
            Some(message) if message.agent_status == Some(AgentStatus::Pending) => {
                message.agent_status = Some(AgentStatus::Rejected);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_batch() -> AgentResponse {
        AgentResponse {
            explanation: "Scaffold a tiny app".to_string(),
            actions: vec![
                AgentAction {
                    kind: AgentActionKind::CreateFolder,
                    path: "public".to_string(),
                    content: None,
                },
                AgentAction {
                    kind: AgentActionKind::CreateFile,
                    path: "public/index.php".to_string(),
                    content: Some("<?php echo 'hi';".to_string()),
                },
                AgentAction {
                    kind: AgentActionKind::UpdateFile,
                    path: "missing.php".to_string(),
                    content: Some("x".to_string()),
                },
            ],
        }
    }

    #[test]
    fn apply_runs_batch_in_order_and_marks_applied() {
        let mut chat = ChatState::default();
        let mut ws = Workspace::new();
        let id = chat.push_agent_response(builder_batch());

        let removed = chat.apply_actions(id, &mut ws).unwrap();
        assert!(removed.is_empty());
        assert_eq!(
            ws.file_content(ws.find_by_path("public/index.php").unwrap()),
            Some("<?php echo 'hi';")
        );
        assert_eq!(chat.message(id).unwrap().agent_status, Some(AgentStatus::Applied));

        // 不再处于 Pending，重复应用无效
        assert!(chat.apply_actions(id, &mut ws).is_none());
    }

    #[test]
    fn reject_leaves_workspace_untouched() {
        let mut chat = ChatState::default();
        let mut ws = Workspace::new();
        let id = chat.push_agent_response(builder_batch());

        assert!(chat.reject_actions(id));
        assert!(ws.find_by_path("public").is_none());
        assert_eq!(chat.message(id).unwrap().agent_status, Some(AgentStatus::Rejected));
        assert!(!chat.reject_actions(id));
    }

    #[test]
    fn delete_actions_report_removed_ids() {
        let mut chat = ChatState::default();
        let mut ws = Workspace::new();
        let file = ws
            .create_at_path("src/app.php", NodeKind::File, Some("<?php".into()))
            .unwrap();
        let id = chat.push_agent_response(AgentResponse {
            explanation: "drop src".to_string(),
            actions: vec![AgentAction {
                kind: AgentActionKind::DeleteFolder,
                path: "src".to_string(),
                content: None,
            }],
        });

        let removed = chat.apply_actions(id, &mut ws).unwrap();
        assert!(removed.contains(&file));
        assert!(ws.find_by_path("src").is_none());
    }

    #[test]
    fn empty_action_batch_has_no_status() {
        let mut chat = ChatState::default();
        let id = chat.push_agent_response(AgentResponse {
            explanation: "just an answer".to_string(),
            actions: Vec::new(),
        });
        assert_eq!(chat.message(id).unwrap().agent_status, None);
    }

    #[test]
    fn action_kind_uses_wire_tags() {
        let action: AgentAction = serde_json::from_str(
            r#"{"type":"CREATE_FILE","path":"a.php","content":"<?php"}"#,
        )
        .unwrap();
        assert_eq!(action.kind, AgentActionKind::CreateFile);
    }
}
