//! 终端界面：一个 ratatui 工作台，内核状态只读渲染，事件折叠成 Action。

pub mod app;
pub mod terminal_guard;
pub mod view;

pub use app::run;
