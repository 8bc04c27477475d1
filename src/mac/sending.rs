//! SendingData：选站、出队、RTS/数据发送

use tracing::{debug, trace, warn};

use super::ac::AccessCategory;
use super::edca::{EdcaMac, OnAir, Step, TxContext, TxMpdu};
use super::frame::{AckPolicy, MacFrame, RTS_LEN, Subframe, mpdu_length};
use super::seqnum::seq_sub;
use super::state::{MacState, SendingSubstate};
use super::timers::TimerKind;
use crate::net::MacAddress;
use crate::phy::{FrameFormat, PhyIndication, PhyRate, PhyRequestKind};

impl EdcaMac {
    pub(super) fn on_sending(&mut self, sub: SendingSubstate, ind: Option<PhyIndication>) -> Step {
        match sub {
            SendingSubstate::Init => self.sending_init(),
            SendingSubstate::TransmitRts | SendingSubstate::TransmitData => {
                self.sending_transmit(sub, ind)
            }
            SendingSubstate::WaitForPhy => self.sending_wait_for_phy(ind),
        }
    }

    fn sending_init(&mut self) -> Step {
        let Some(ac) = self.access_ac else {
            self.transition(MacState::Contention);
            return Step::Continue(None);
        };
        let Some(dst) = self.select_destination(ac) else {
            self.access_ac = None;
            self.transition(MacState::Contention);
            return Step::Continue(None);
        };

        let limit = if dst.is_broadcast() {
            1
        } else {
            self.cfg.max_subframes
        };
        self.fill_pending(dst, ac, limit);
        let mpdus: Vec<TxMpdu> = self
            .tx_pending
            .get(&(dst, ac))
            .map(|v| v.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        if mpdus.is_empty() {
            self.access_ac = None;
            self.transition(MacState::Contention);
            return Step::Continue(None);
        }

        let subframes: Vec<Subframe> = mpdus
            .iter()
            .map(|m| Subframe {
                seq: m.seq,
                retransmission: m.attempts > 0,
                mpdu_length: mpdu_length(m.packet.length),
                timestamp: m.packet.timestamp,
                packet_id: m.packet.id,
                payload_ref: m.packet.payload_ref,
            })
            .collect();
        let seqs: Vec<u16> = mpdus.iter().map(|m| m.seq).collect();
        let aggregated = subframes.len() > 1;
        let ack_policy = if dst.is_broadcast() || self.cfg.disable_ack {
            AckPolicy::NoAck
        } else if aggregated {
            AckPolicy::BlockAck
        } else {
            AckPolicy::Normal
        };
        let data_rate = match dst {
            MacAddress::Broadcast => self.basic,
            MacAddress::Unicast(_) => self.data_rate_for(dst),
        };

        let mut data = MacFrame::qos_data(self.id, dst, ac, ack_policy, subframes);
        data.bss_color = self.cfg.bss_color;
        let sifs = self.cfg.sifs;
        let response = self.response_time(ack_policy);
        if ack_policy != AckPolicy::NoAck {
            data.duration = sifs + response;
        }
        let data_time = data_rate.duration(data.psdu_length);

        let rts = match dst {
            MacAddress::Unicast(node)
                if data.psdu_length >= self.cfg.rts_threshold
                    && data_rate.format != FrameFormat::HeMu =>
            {
                let cts = self.cts_time();
                let nav = if ack_policy == AckPolicy::NoAck {
                    sifs.saturating_mul(2) + cts + data_time
                } else {
                    sifs.saturating_mul(3) + cts + data_time + response
                };
                let mut rts = MacFrame::rts(self.id, node, nav);
                rts.bss_color = self.cfg.bss_color;
                Some(rts)
            }
            _ => None,
        };
        let is_long = aggregated || data.psdu_length >= self.cfg.rts_threshold;
        let next = if rts.is_some() {
            SendingSubstate::TransmitRts
        } else {
            SendingSubstate::TransmitData
        };
        debug!(
            node = ?self.id,
            %dst,
            %ac,
            mpdus = seqs.len(),
            psdu = data.psdu_length,
            mcs = data_rate.mcs,
            rts = rts.is_some(),
            "准备发送"
        );

        self.tx = Some(TxContext {
            dst,
            ac,
            data,
            data_rate,
            rts,
            is_long,
            sent: if next == SendingSubstate::TransmitRts {
                OnAir::Rts
            } else {
                OnAir::Data
            },
            seqs,
        });
        self.transition(MacState::SendingData(next));
        Step::Continue(None)
    }

    fn sending_transmit(&mut self, sub: SendingSubstate, ind: Option<PhyIndication>) -> Step {
        if matches!(ind, Some(PhyIndication::TxStartConfirm)) && self.awaiting_confirm {
            self.awaiting_confirm = false;
            return self.hand_off(sub);
        }
        if let Some(other) = ind {
            trace!(node = ?self.id, ?other, "发送流程中忽略指示");
        }
        if self.awaiting_confirm || self.timers.running(TimerKind::Phase) {
            return Step::Done;
        }
        self.timers.clear(TimerKind::Phase);
        let Some((rate, psdu)) = self.on_air_rate(sub == SendingSubstate::TransmitRts) else {
            self.transition(MacState::Contention);
            return Step::Continue(None);
        };
        self.out.request = Some(self.phy_request(PhyRequestKind::Start, &rate, psdu));
        self.awaiting_confirm = true;
        Step::Done
    }

    /// Tx-start 已确认：交出帧并开始倒计时
    fn hand_off(&mut self, sub: SendingSubstate) -> Step {
        let basic = self.basic;
        let Some(tx) = self.tx.as_mut() else {
            self.transition(MacState::Contention);
            return Step::Continue(None);
        };
        let (frame, rate) = match (sub, &tx.rts) {
            (SendingSubstate::TransmitRts, Some(rts)) => {
                tx.sent = OnAir::Rts;
                (rts.clone(), basic)
            }
            _ => {
                tx.sent = OnAir::Data;
                (tx.data.clone(), tx.data_rate)
            }
        };
        let (dst, ac, seqs) = (tx.dst, tx.ac, tx.seqs.clone());
        if frame.is_data() {
            self.bump_attempts(dst, ac, &seqs);
        }
        let airtime = rate.duration(frame.psdu_length);
        self.notify_tx(&frame, &rate, airtime);
        self.out.frame = Some(frame);
        self.transition(MacState::SendingData(SendingSubstate::WaitForPhy));
        self.timers.arm(TimerKind::Phase, airtime);
        Step::Done
    }

    fn sending_wait_for_phy(&mut self, ind: Option<PhyIndication>) -> Step {
        if matches!(ind, Some(PhyIndication::TxEndConfirm)) && self.awaiting_confirm {
            self.awaiting_confirm = false;
            return self.transmission_finished();
        }
        if self.awaiting_confirm || self.timers.running(TimerKind::Phase) {
            return Step::Done;
        }
        let rts = self.tx.as_ref().is_some_and(|tx| tx.sent == OnAir::Rts);
        let Some((rate, psdu)) = self.on_air_rate(rts) else {
            self.transition(MacState::Contention);
            return Step::Continue(None);
        };
        self.out.request = Some(self.phy_request(PhyRequestKind::End, &rate, psdu));
        self.awaiting_confirm = true;
        Step::Done
    }

    fn transmission_finished(&mut self) -> Step {
        let Some(tx) = self.tx.as_ref() else {
            self.transition(MacState::Contention);
            return Step::Continue(None);
        };
        if tx.sent == OnAir::Data && tx.data.ack_policy == AckPolicy::NoAck {
            let (dst, ac, seqs) = (tx.dst, tx.ac, tx.seqs.clone());
            trace!(node = ?self.id, %dst, "无需确认，直接完成");
            self.tx = None;
            self.access_ac = None;
            self.discard(dst, ac, &seqs, true);
            self.cw[ac.index()].reset();
            self.draw_backoff(ac);
            self.transition(MacState::Contention);
            return Step::Continue(None);
        }
        self.transition(MacState::WaitForRx);
        Step::Continue(None)
    }

    /// 正在（或将要）发送的帧的速率与长度
    fn on_air_rate(&self, rts: bool) -> Option<(PhyRate, u32)> {
        let tx = self.tx.as_ref()?;
        if rts {
            Some((self.basic, RTS_LEN))
        } else {
            Some((tx.data_rate, tx.data.psdu_length))
        }
    }

    fn bump_attempts(&mut self, dst: MacAddress, ac: AccessCategory, seqs: &[u16]) {
        if let Some(pending) = self.tx_pending.get_mut(&(dst, ac)) {
            for m in pending.iter_mut().filter(|m| seqs.contains(&m.seq)) {
                m.attempts = m.attempts.saturating_add(1);
            }
        }
    }

    /// 轮询选站：已有待确认帧的目的站达到上限时，只在它们之间选择。
    fn select_destination(&mut self, ac: AccessCategory) -> Option<MacAddress> {
        let in_flight: Vec<MacAddress> = self
            .tx_pending
            .iter()
            .filter(|((_, a), v)| *a == ac && !v.is_empty())
            .map(|((dst, _), _)| *dst)
            .collect();
        let mut candidates = in_flight.clone();
        if in_flight.len() < self.cfg.max_dl_stations {
            candidates.extend(self.queues.destinations(ac));
            candidates.sort();
            candidates.dedup();
        }
        self.scheduler.select(ac, &candidates)
    }

    /// 从队列补充待发送帧，直到达到聚合上限或超出 Block-Ack 窗口
    fn fill_pending(&mut self, dst: MacAddress, ac: AccessCategory, limit: usize) {
        let window = self.cfg.ba_window;
        let pending = self.tx_pending.entry((dst, ac)).or_default();
        while pending.len() < limit {
            if let Some(first) = pending.first() {
                if seq_sub(self.seqnums.peek(dst, ac), first.seq) >= window {
                    break;
                }
            }
            let Some(packet) = self.queues.dequeue(ac, dst) else {
                break;
            };
            let seq = self.seqnums.next(dst, ac);
            pending.push(TxMpdu {
                packet,
                seq,
                attempts: 0,
            });
        }
        if pending.is_empty() {
            self.tx_pending.remove(&(dst, ac));
        }
    }

    fn data_rate_for(&self, dst: MacAddress) -> PhyRate {
        let mcs = self.rate_control.mcs(dst);
        self.rates.get(&mcs).copied().unwrap_or_else(|| {
            warn!(node = ?self.id, mcs, "速率控制给出了不可用的 MCS，改用基本速率");
            self.basic
        })
    }
}
