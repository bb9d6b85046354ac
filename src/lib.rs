//! phpdojo - 终端里的 PHP 学习工作台
//!
//! 模块结构：
//! - kernel: 无头内核（工作区树、编辑器、面板布局、终端、聊天）
//! - oracle: AI 预言机客户端（执行、lint、修复、补全、会话）
//! - services: 磁盘侧服务（落盘、导出、数据目录）
//! - runtime: 异步运行时（Effect 执行与完成回执）
//! - tui: 终端界面（ratatui 工作台）

pub mod kernel;
pub mod logging;
pub mod oracle;
pub mod runtime;
pub mod services;

#[cfg(feature = "tui")]
pub mod tui;
