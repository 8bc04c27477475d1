//! 流量源
//!
//! 应用层流量以调度器事件的形式注入 MAC 队列。

mod cbr;

pub use cbr::CbrSource;
