//! Idle / Contention / Eifs 处理与每 AC 退避
//!
//! 四个 AC 各自独立退避：AC 在介质连续空闲 `AIFS[AC] + slots × slot` 后获得发送机会。
//! 介质变忙时冻结：已完整经过的时隙从计数中扣除，AIFS 需重新等待。
//! 多个 AC 在同一时刻到期时最高优先级的 AC 发送，其余按冲突处理（CW 加倍后重新抽取）。

use rand::Rng;
use tracing::{debug, trace};

use super::ac::AccessCategory;
use super::edca::{EdcaMac, Step};
use super::state::{MacState, ReceivingSubstate, SendingSubstate};
use super::timers::TimerKind;
use crate::phy::PhyIndication;
use crate::sim::SimTime;

/// 需要交给接收流程的指示
fn is_reception(ind: &Option<PhyIndication>) -> bool {
    matches!(
        ind,
        Some(PhyIndication::RxStart(_) | PhyIndication::RxEnd(_) | PhyIndication::RxError)
    )
}

impl EdcaMac {
    pub(super) fn on_idle(&mut self, ind: Option<PhyIndication>) -> Step {
        if self.cca_busy || is_reception(&ind) {
            self.transition(MacState::Receiving(ReceivingSubstate::Processing));
            return Step::Continue(ind);
        }
        if self.has_any_traffic() {
            self.transition(MacState::Contention);
            return Step::Continue(None);
        }
        Step::Done
    }

    pub(super) fn on_contention(&mut self, ind: Option<PhyIndication>) -> Step {
        if self.cca_busy || is_reception(&ind) {
            self.transition(MacState::Receiving(ReceivingSubstate::Processing));
            return Step::Continue(ind);
        }
        if !self.has_any_traffic() {
            self.transition(MacState::Idle);
            return Step::Done;
        }
        for ac in AccessCategory::ALL {
            if self.has_traffic(ac) && self.backoff[ac.index()].is_none() {
                self.draw_backoff(ac);
            }
        }
        if !self.medium_idle() {
            return Step::Done;
        }

        let ready: Vec<AccessCategory> = AccessCategory::ALL
            .into_iter()
            .filter(|&ac| {
                self.has_traffic(ac)
                    && self.backoff[ac.index()]
                        .is_some_and(|s| self.contention_idle >= self.backoff_deadline(ac, s))
            })
            .collect();
        let Some(&winner) = ready.iter().max() else {
            return Step::Done;
        };

        self.backoff[winner.index()] = None;
        self.freeze_backoff();
        for &ac in ready.iter().filter(|&&ac| ac != winner) {
            debug!(node = ?self.id, %winner, loser = %ac, "内部冲突");
            self.cw[ac.index()].double();
            self.draw_backoff(ac);
        }
        trace!(node = ?self.id, ac = %winner, "赢得信道");
        self.access_ac = Some(winner);
        self.transition(MacState::SendingData(SendingSubstate::Init));
        Step::Continue(None)
    }

    pub(super) fn on_eifs(&mut self, ind: Option<PhyIndication>) -> Step {
        if self.cca_busy || is_reception(&ind) {
            // pending_eifs 保持，等下一次空闲再等 EIFS
            self.transition(MacState::Receiving(ReceivingSubstate::Processing));
            return Step::Continue(ind);
        }
        if self.timers.expired(TimerKind::Eifs) {
            self.pending_eifs = false;
            self.transition(MacState::Contention);
            return Step::Continue(None);
        }
        Step::Done
    }

    /// 在 [0, CW] 中均匀抽取退避时隙数
    pub(super) fn draw_backoff(&mut self, ac: AccessCategory) {
        let cw = self.cw[ac.index()].value();
        let slots = self.rng.gen_range(0..=cw);
        trace!(node = ?self.id, %ac, cw, slots, "抽取退避");
        self.backoff[ac.index()] = Some(slots);
    }

    /// 空闲多久后该 AC 可以发送
    pub(super) fn backoff_deadline(&self, ac: AccessCategory, slots: u32) -> SimTime {
        self.cfg
            .aifs(ac)
            .saturating_add(self.cfg.slot_time.saturating_mul(slots as u64))
    }

    /// 介质变忙（或离开竞争）：扣除已完整经过的时隙，空闲计时归零
    pub(super) fn freeze_backoff(&mut self) {
        let idle = std::mem::take(&mut self.contention_idle);
        let slot = self.cfg.slot_time.as_micros().max(1);
        for ac in AccessCategory::ALL {
            let aifs = self.cfg.aifs(ac);
            let Some(slots) = self.backoff[ac.index()].as_mut() else {
                continue;
            };
            if idle > aifs {
                let consumed = idle.saturating_sub(aifs).as_micros() / slot;
                *slots -= consumed.min(*slots as u64) as u32;
            }
        }
    }
}
