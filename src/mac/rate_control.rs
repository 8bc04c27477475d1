//! 速率控制
//!
//! MAC 每次收到响应（成功）或响应失败时通知速率控制；
//! 速率控制只决定下一次数据帧使用的 MCS。

use std::collections::BTreeMap;

use crate::net::MacAddress;

pub trait RateControl: std::fmt::Debug + Send {
    /// 发往 `dst` 的下一帧使用的 MCS
    fn mcs(&self, dst: MacAddress) -> u8;
    fn on_success(&mut self, dst: MacAddress);
    fn on_failure(&mut self, dst: MacAddress);
}

/// 固定 MCS
#[derive(Debug, Clone, Copy)]
pub struct FixedRate {
    mcs: u8,
}

impl FixedRate {
    pub fn new(mcs: u8) -> Self {
        Self { mcs }
    }
}

impl RateControl for FixedRate {
    fn mcs(&self, _dst: MacAddress) -> u8 {
        self.mcs
    }

    fn on_success(&mut self, _dst: MacAddress) {}

    fn on_failure(&mut self, _dst: MacAddress) {}
}

const ARF_UP_AFTER: u32 = 10;
const ARF_DOWN_AFTER: u32 = 2;

#[derive(Debug, Clone, Copy)]
struct ArfState {
    idx: usize,
    successes: u32,
    failures: u32,
}

/// Auto Rate Fallback：连续 10 次成功升一级，连续 2 次失败降一级。
#[derive(Debug, Clone)]
pub struct Arf {
    /// 可用 MCS，升序
    ladder: Vec<u8>,
    start: usize,
    per_dst: BTreeMap<MacAddress, ArfState>,
}

impl Arf {
    /// `ladder` 不能为空；从最高一级开始
    pub fn new(ladder: Vec<u8>) -> Self {
        let start = ladder.len().saturating_sub(1);
        Self {
            ladder,
            start,
            per_dst: BTreeMap::new(),
        }
    }

    fn state(&mut self, dst: MacAddress) -> &mut ArfState {
        let start = self.start;
        self.per_dst.entry(dst).or_insert(ArfState {
            idx: start,
            successes: 0,
            failures: 0,
        })
    }
}

impl RateControl for Arf {
    fn mcs(&self, dst: MacAddress) -> u8 {
        let idx = self.per_dst.get(&dst).map_or(self.start, |s| s.idx);
        self.ladder.get(idx).copied().unwrap_or(0)
    }

    fn on_success(&mut self, dst: MacAddress) {
        let top = self.ladder.len().saturating_sub(1);
        let s = self.state(dst);
        s.failures = 0;
        s.successes += 1;
        if s.successes >= ARF_UP_AFTER {
            s.successes = 0;
            s.idx = (s.idx + 1).min(top);
        }
    }

    fn on_failure(&mut self, dst: MacAddress) {
        let s = self.state(dst);
        s.successes = 0;
        s.failures += 1;
        if s.failures >= ARF_DOWN_AFTER {
            s.failures = 0;
            s.idx = s.idx.saturating_sub(1);
        }
    }
}
