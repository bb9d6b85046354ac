//! 无头内核：纯状态机，副作用全部以 [`Effect`] 描述后交给运行时。

pub mod action;
pub mod chat;
pub mod diff;
pub mod editor;
pub mod effect;
pub mod layout;
pub mod learning;
pub mod problems;
pub mod state;
pub mod store;
pub mod terminal;
pub mod workspace;

pub use action::Action;
pub use effect::Effect;
pub use state::{AppState, ModalState, Theme};
pub use store::{DispatchResult, Store};
