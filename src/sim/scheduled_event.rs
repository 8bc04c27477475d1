//! 调度事件
//!
//! 定义调度事件结构及其优先级比较。

use super::event::{Event, EventId};
use super::time::SimTime;
use std::cmp::Ordering;

/// 调度事件，包含执行时间、序列号和事件对象。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) seq: u64,
    pub(crate) id: EventId,
    /// `Some(p)`：触发后按周期 p 重新挂起
    pub(crate) period: Option<SimTime>,
    pub(crate) ev: Box<dyn Event>,
}

// BinaryHeap 是 max-heap；我们需要最小时间优先，因此反向比较。
// 同一时刻按插入顺序（seq）处理。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.at.cmp(&other.at) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
        .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

/// “时间推进”事件：不在堆中排序，每次非零推进触发一次。
pub(crate) struct AdvanceEvent {
    pub(crate) id: EventId,
    pub(crate) ev: Box<dyn Event>,
}
