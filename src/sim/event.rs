//! 事件 trait
//!
//! 定义仿真事件接口、事件标识符和周期性。

use super::simulator::Simulator;
use super::time::SimTime;
use super::world::World;

/// 事件标识符，由 `Simulator` 分配，可用于取消。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

/// 事件的周期性。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Periodicity {
    /// 触发一次后丢弃
    Once,
    /// 触发后在 `fire_at + period` 重新挂起
    Every(SimTime),
    /// 每次非零时间推进触发一次，与绝对时间无关
    OnTimeAdvance,
}

impl Periodicity {
    /// 周期为 0 即为“时间推进”事件。
    pub fn from_period(period: Option<SimTime>) -> Self {
        match period {
            None => Periodicity::Once,
            Some(p) if p.is_zero() => Periodicity::OnTimeAdvance,
            Some(p) => Periodicity::Every(p),
        }
    }
}

/// 事件：可被调度执行。周期事件会被多次执行，因此使用 `&mut self`。
pub trait Event: Send + 'static {
    fn execute(&mut self, sim: &mut Simulator, world: &mut dyn World);
}

impl<F> Event for F
where
    F: FnMut(&mut Simulator, &mut dyn World) + Send + 'static,
{
    fn execute(&mut self, sim: &mut Simulator, world: &mut dyn World) {
        self(sim, world)
    }
}
