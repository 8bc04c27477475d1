//! WaitForRx：等待 CTS / Ack / Block-Ack，处理成功、部分成功与失败

use tracing::{debug, info, trace};

use super::block_ack::BaRecord;
use super::edca::{EdcaMac, OnAir, Step};
use super::frame::{AckPolicy, FrameType, MacFrame};
use super::observer::MacEvent;
use super::retry::RetryOutcome;
use super::state::{MacState, ReceivingSubstate, SendingSubstate};
use super::timers::TimerKind;
use crate::net::MacAddress;
use crate::phy::PhyIndication;

impl EdcaMac {
    pub(super) fn on_wait_for_rx(&mut self, ind: Option<PhyIndication>) -> Step {
        match ind {
            Some(PhyIndication::RxStart(_)) => {
                // 有帧开始到达，超时不再适用，等它结束
                self.timers.clear(TimerKind::ResponseTimeout);
                return Step::Done;
            }
            Some(PhyIndication::RxEnd(frame)) => {
                if self.is_expected_response(&frame) {
                    return self.on_response(*frame);
                }
                debug!(node = ?self.id, frame_type = ?frame.frame_type, "等待响应时收到其他帧");
                self.response_failed();
                self.transition(MacState::Receiving(ReceivingSubstate::Processing));
                return Step::Continue(Some(PhyIndication::RxEnd(frame)));
            }
            Some(PhyIndication::RxError) => {
                self.events.push(MacEvent::RxError);
                self.response_failed();
                self.pending_eifs = true;
                let next = if self.cca_busy {
                    MacState::Receiving(ReceivingSubstate::Processing)
                } else {
                    MacState::Eifs
                };
                self.transition(next);
                return Step::Continue(None);
            }
            _ => {}
        }
        if self.timers.expired(TimerKind::ResponseTimeout) {
            debug!(node = ?self.id, "⏰ 响应超时");
            self.response_failed();
            self.transition(MacState::Contention);
            return Step::Continue(None);
        }
        Step::Done
    }

    fn is_expected_response(&self, frame: &MacFrame) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        let expected = match (tx.sent, tx.data.ack_policy) {
            (OnAir::Rts, _) => FrameType::Cts,
            (OnAir::Data, AckPolicy::BlockAck) => FrameType::BlockAck,
            (OnAir::Data, _) => FrameType::Ack,
        };
        frame.frame_type == expected
            && frame.receiver == MacAddress::Unicast(self.id)
            && tx.dst == MacAddress::Unicast(frame.transmitter)
    }

    fn on_response(&mut self, frame: MacFrame) -> Step {
        self.pending_eifs = false;
        self.events.push(MacEvent::FrameRx {
            frame_type: frame.frame_type,
            transmitter: frame.transmitter,
            psdu_length: frame.psdu_length,
        });
        match frame.frame_type {
            FrameType::Cts => {
                if let Some(tx) = &self.tx {
                    if let Some(c) = self.retries.get_mut(&(tx.dst, tx.ac)) {
                        c.short = 0;
                    }
                }
                trace!(node = ?self.id, "收到 CTS，SIFS 后发送数据");
                self.transition(MacState::SendingData(SendingSubstate::TransmitData));
                self.timers.arm(TimerKind::Phase, self.cfg.sifs);
            }
            FrameType::Ack => self.exchange_succeeded(),
            FrameType::BlockAck => self.on_block_ack(frame),
            _ => {}
        }
        Step::Continue(None)
    }

    fn on_block_ack(&mut self, frame: MacFrame) {
        let (Some(tx), Some(info)) = (&self.tx, frame.block_ack) else {
            self.response_failed();
            self.transition(MacState::Contention);
            return;
        };
        let record = BaRecord {
            ssn: info.ssn,
            bitmap: info.bitmap,
        };
        let acked: Vec<u16> = tx
            .seqs
            .iter()
            .copied()
            .filter(|&s| record.is_acked(s))
            .collect();
        if acked.is_empty() {
            debug!(node = ?self.id, "Block-Ack 未确认任何子帧");
            self.response_failed();
        } else if acked.len() == tx.seqs.len() {
            self.exchange_succeeded();
            return;
        } else {
            self.partially_acked(&acked);
        }
        self.transition(MacState::Contention);
    }

    /// 全部确认：计数与 CW 复位，帧以成功出队
    fn exchange_succeeded(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        self.access_ac = None;
        self.rate_control.on_success(tx.dst);
        self.discard(tx.dst, tx.ac, &tx.seqs, true);
        self.retries.remove(&(tx.dst, tx.ac));
        self.cw[tx.ac.index()].reset();
        self.draw_backoff(tx.ac);
        trace!(node = ?self.id, dst = %tx.dst, "✅ 帧交换成功");
        self.transition(MacState::Contention);
    }

    /// 部分确认：已确认的出队，其余留待重传，计入一次长重传但不加倍 CW
    fn partially_acked(&mut self, acked: &[u16]) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        self.access_ac = None;
        self.rate_control.on_success(tx.dst);
        self.discard(tx.dst, tx.ac, acked, true);
        self.cw[tx.ac.index()].reset();
        let (max_short, max_long) = (self.cfg.max_short_retries, self.cfg.max_long_retries);
        let outcome = self
            .retries
            .entry((tx.dst, tx.ac))
            .or_default()
            .increment(true, max_short, max_long);
        if outcome == RetryOutcome::Exhausted {
            let rest = self.pending_seqs(tx.dst, tx.ac);
            self.discard(tx.dst, tx.ac, &rest, false);
        }
        debug!(
            node = ?self.id,
            dst = %tx.dst,
            acked = acked.len(),
            remaining = self.waiting_for_ack(tx.dst, tx.ac),
            "Block-Ack 部分确认"
        );
        self.draw_backoff(tx.ac);
    }

    /// 响应失败（超时、解码失败或收到意外帧）：递增重传计数，
    /// 未耗尽则 CW 加倍，耗尽则丢弃该 (目的站, AC) 所有待确认帧并复位 CW。
    pub(super) fn response_failed(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        self.access_ac = None;
        self.rate_control.on_failure(tx.dst);
        let long = tx.sent == OnAir::Data && tx.is_long;
        let (max_short, max_long) = (self.cfg.max_short_retries, self.cfg.max_long_retries);
        let outcome = self
            .retries
            .entry((tx.dst, tx.ac))
            .or_default()
            .increment(long, max_short, max_long);
        match outcome {
            RetryOutcome::Retry => {
                self.cw[tx.ac.index()].double();
                debug!(
                    node = ?self.id,
                    dst = %tx.dst,
                    ac = %tx.ac,
                    long,
                    cw = self.cw[tx.ac.index()].value(),
                    "🔁 准备重传"
                );
            }
            RetryOutcome::Exhausted => {
                let all = self.pending_seqs(tx.dst, tx.ac);
                info!(node = ?self.id, dst = %tx.dst, ac = %tx.ac, dropped = all.len(), "重传次数用尽");
                self.discard(tx.dst, tx.ac, &all, false);
                self.retries.remove(&(tx.dst, tx.ac));
                self.cw[tx.ac.index()].reset();
            }
        }
        self.draw_backoff(tx.ac);
    }
}
