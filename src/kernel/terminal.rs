//! 终端会话模型：多个命名会话，各自一条只增不减的消息日志。

use std::time::{SystemTime, UNIX_EPOCH};

pub type TerminalId = u64;

const COMMAND_RECALL_CAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Command,
    Output,
    Error,
    System,
    PhpOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalMessage {
    pub kind: MessageKind,
    pub text: String,
    pub timestamp: String,
}

impl TerminalMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            timestamp: clock_hhmmss(),
        }
    }
}

fn clock_hhmmss() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let day_secs = secs % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        day_secs / 3600,
        (day_secs % 3600) / 60,
        day_secs % 60
    )
}

/// 每个终端输入框各自的命令回溯；连续重复不入栈，封顶后淘汰最旧的。
#[derive(Debug, Default)]
pub struct CommandRecall {
    entries: Vec<String>,
    cursor: usize,
}

impl CommandRecall {
    pub fn push(&mut self, command: &str) {
        if !command.is_empty() && self.entries.last().map(String::as_str) != Some(command) {
            self.entries.push(command.to_string());
            if self.entries.len() > COMMAND_RECALL_CAP {
                self.entries.remove(0);
            }
        }
        self.cursor = self.entries.len();
    }

    pub fn prev(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// 越过最新一条时回到空输入位。
    pub fn next(&mut self) -> Option<&str> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(
            self.entries
                .get(self.cursor)
                .map(String::as_str)
                .unwrap_or(""),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct TerminalSession {
    pub id: TerminalId,
    pub name: String,
    pub history: Vec<TerminalMessage>,
    pub recall: CommandRecall,
    pub input: String,
}

#[derive(Debug)]
pub struct TerminalState {
    pub sessions: Vec<TerminalSession>,
    next_id: TerminalId,
}

impl Default for TerminalState {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            next_id: 1,
        }
    }
}

impl TerminalState {
    pub fn create_session(&mut self) -> TerminalId {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.push(TerminalSession {
            id,
            name: format!("Terminal {id}"),
            history: Vec::new(),
            recall: CommandRecall::default(),
            input: String::new(),
        });
        id
    }

    pub fn close_session(&mut self, id: TerminalId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        before != self.sessions.len()
    }

    pub fn session(&self, id: TerminalId) -> Option<&TerminalSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn session_mut(&mut self, id: TerminalId) -> Option<&mut TerminalSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn append(&mut self, id: TerminalId, message: TerminalMessage) -> bool {
        match self.session_mut(id) {
            Some(session) => {
                session.history.push(message);
                true
            }
            None => false,
        }
    }

    /// 清空历史，会话本身保留并继续接受输入。
    pub fn clear(&mut self, id: TerminalId) -> bool {
        match self.session_mut(id) {
            Some(session) => {
                session.history.clear();
                true
            }
            None => false,
        }
    }
}
