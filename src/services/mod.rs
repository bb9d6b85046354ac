//! 磁盘侧服务：数据目录、界面状态落盘、导出。

pub mod export;
pub mod persistence;
pub mod storage;

pub use persistence::PersistedState;
