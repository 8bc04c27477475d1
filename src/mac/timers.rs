//! 具名定时器表
//!
//! 每个定时器是一个倒计时；`None` 表示未启动，`Some(0)` 表示已到期但尚未被清除。

use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 等待 CTS/Ack/Block-Ack
    ResponseTimeout,
    /// 传统 NAV
    Nav,
    /// 空间复用：本 BSS NAV
    IntraNav,
    /// 空间复用：其他 BSS NAV
    InterNav,
    /// 由 RTS 设置的 NAV 在此时间内未见接收则作废
    NavReset,
    Eifs,
    /// 当前子状态的阶段计时（SIFS 等待、帧发送时长）
    Phase,
}

impl TimerKind {
    pub const ALL: [TimerKind; 7] = [
        TimerKind::ResponseTimeout,
        TimerKind::Nav,
        TimerKind::IntraNav,
        TimerKind::InterNav,
        TimerKind::NavReset,
        TimerKind::Eifs,
        TimerKind::Phase,
    ];

    pub const NAVS: [TimerKind; 3] = [TimerKind::Nav, TimerKind::IntraNav, TimerKind::InterNav];

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimerTable {
    remaining: [Option<SimTime>; 7],
}

impl TimerTable {
    pub fn arm(&mut self, kind: TimerKind, after: SimTime) {
        self.remaining[kind.slot()] = Some(after);
    }

    /// 保持较大值（NAV 语义）
    pub fn arm_max(&mut self, kind: TimerKind, after: SimTime) {
        let slot = &mut self.remaining[kind.slot()];
        *slot = Some(slot.map_or(after, |cur| cur.max(after)));
    }

    pub fn clear(&mut self, kind: TimerKind) {
        self.remaining[kind.slot()] = None;
    }

    pub fn remaining(&self, kind: TimerKind) -> Option<SimTime> {
        self.remaining[kind.slot()]
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.remaining(kind).is_some()
    }

    /// 已启动且倒计时归零
    pub fn expired(&self, kind: TimerKind) -> bool {
        self.remaining(kind).is_some_and(|t| t.is_zero())
    }

    /// 已启动且尚未归零
    pub fn running(&self, kind: TimerKind) -> bool {
        self.remaining(kind).is_some_and(|t| !t.is_zero())
    }

    pub fn advance(&mut self, elapsed: SimTime) {
        if elapsed.is_zero() {
            return;
        }
        for t in self.remaining.iter_mut().flatten() {
            *t = t.saturating_sub(elapsed);
        }
    }

    /// 最近一个仍在走的定时器
    pub fn next_expiry(&self) -> Option<SimTime> {
        self.remaining
            .iter()
            .flatten()
            .filter(|t| !t.is_zero())
            .min()
            .copied()
    }
}
