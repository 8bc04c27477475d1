//! 世界 trait
//!
//! 定义仿真世界接口：调度器只通过它调用节点，不了解节点内部。

use super::simulator::Simulator;
use super::time::SimTime;
use std::any::Any;

/// 仿真世界：由业务层实现（例如无线节点集合/信道分发/统计）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 节点数量（整个仿真期间固定）
    fn node_count(&self) -> usize;

    /// 调用第 `idx` 个节点，`elapsed` 为距该节点上次被调用经过的时间。
    ///
    /// 返回下一次希望被调用的延迟；`None` 表示只在外部变化（信道/流量）时唤醒。
    fn run_node(&mut self, idx: usize, elapsed: SimTime, now: SimTime) -> Option<SimTime>;

    /// 把各节点发送缓冲中的帧分发给其他节点，返回分发的帧数。
    fn distribute_frames(&mut self, now: SimTime) -> usize;

    /// 本 tick 内需要立即调用的节点（例如刚注入了流量）。
    fn take_wakeups(&mut self) -> Vec<usize> {
        Vec::new()
    }

    fn on_tick(&mut self, _sim: &Simulator) {}
}
