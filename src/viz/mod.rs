//! 可视化事件记录（用于离线回放）
//!
//! MAC 观察者事件被转成结构化 JSON，而不是解析文本日志。
//! 记录只在 `NetWorld` 启用 logger 时发生，不影响仿真结果。

mod types;

pub use types::{VizEvent, VizEventKind, VizLogger, VizNodeInfo};
