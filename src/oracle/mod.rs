//! AI 预言机：所有 PHP 语义（执行、lint、修复、补全、会话）都委托给远端模型。

pub mod client;
pub mod prompts;
pub mod schema;

pub use client::{GeminiTransport, GenerateRequest, OracleClient, OracleError, OracleTransport};
pub use schema::{ExecutionResult, PackageInfo, PackageManager};
