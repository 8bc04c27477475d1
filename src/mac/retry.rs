//! 重传计数与竞争窗口

use super::config::EdcaParams;

/// 某个 (目的站, AC) 的短/长重传计数。
///
/// 计数永远小于对应上限：达到上限的那一次递增会立即清零并报告 `Exhausted`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCounters {
    pub short: u8,
    pub long: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Retry,
    /// 重传次数用尽，等待确认的帧必须全部丢弃
    Exhausted,
}

impl RetryCounters {
    pub fn increment(&mut self, long: bool, max_short: u8, max_long: u8) -> RetryOutcome {
        let (counter, max) = if long {
            (&mut self.long, max_long)
        } else {
            (&mut self.short, max_short)
        };
        *counter = counter.saturating_add(1);
        if *counter >= max {
            self.reset();
            RetryOutcome::Exhausted
        } else {
            RetryOutcome::Retry
        }
    }

    pub fn reset(&mut self) {
        self.short = 0;
        self.long = 0;
    }

    /// 当前已用的重传次数
    pub fn total(&self) -> u8 {
        self.short.max(self.long)
    }
}

/// 竞争窗口：CWmin ≤ CW ≤ CWmax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentionWindow {
    cw: u32,
    cw_min: u32,
    cw_max: u32,
}

impl ContentionWindow {
    pub fn new(params: &EdcaParams) -> Self {
        Self {
            cw: params.cw_min,
            cw_min: params.cw_min,
            cw_max: params.cw_max,
        }
    }

    pub fn value(&self) -> u32 {
        self.cw
    }

    pub fn min(&self) -> u32 {
        self.cw_min
    }

    pub fn max(&self) -> u32 {
        self.cw_max
    }

    /// CW = min(2·CW + 1, CWmax)
    pub fn double(&mut self) {
        self.cw = self.cw.saturating_mul(2).saturating_add(1).min(self.cw_max);
    }

    pub fn reset(&mut self) {
        self.cw = self.cw_min;
    }
}
