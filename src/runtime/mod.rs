//! 异步运行时：持有 tokio 运行时与预言机客户端，执行内核的副作用。

pub mod async_runtime;
pub mod message;

pub use async_runtime::AsyncRuntime;
pub use message::AppMessage;
