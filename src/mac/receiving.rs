//! Receiving：解码、去重交付、响应（CTS/Ack/Block-Ack）与 NAV 更新

use tracing::{debug, trace};

use super::block_ack::{BaRecord, update_ba_bitmap};
use super::edca::{EdcaMac, Step};
use super::frame::{AckPolicy, FrameType, MacFrame};
use super::observer::MacEvent;
use super::state::{MacState, ReceivingSubstate};
use super::timers::TimerKind;
use crate::net::MacAddress;
use crate::phy::{PhyIndication, PhyRequestKind, RX_PHY_START_DELAY};

impl EdcaMac {
    pub(super) fn on_receiving(&mut self, sub: ReceivingSubstate, ind: Option<PhyIndication>) -> Step {
        match sub {
            ReceivingSubstate::Processing => self.on_processing(ind),
            ReceivingSubstate::Responding => self.on_responding(ind),
            ReceivingSubstate::TxEndRequest => self.on_tx_end_request(ind),
            ReceivingSubstate::NavWait => self.on_nav_wait(ind),
        }
    }

    fn on_processing(&mut self, ind: Option<PhyIndication>) -> Step {
        match ind {
            Some(PhyIndication::RxStart(_)) => {
                // 看到了 RTS 之后的接收，NAV 不再复位
                self.timers.clear(TimerKind::NavReset);
                Step::Done
            }
            Some(PhyIndication::RxEnd(frame)) => self.process_frame(*frame),
            Some(PhyIndication::RxError) => {
                self.events.push(MacEvent::RxError);
                self.pending_eifs = true;
                self.after_reception()
            }
            _ => self.after_reception(),
        }
    }

    /// 信道空闲后离开接收：EIFS、NAV 等待或回到竞争
    fn after_reception(&mut self) -> Step {
        if self.cca_busy {
            return Step::Done;
        }
        let next = if self.pending_eifs {
            MacState::Eifs
        } else if self.nav_active() {
            MacState::Receiving(ReceivingSubstate::NavWait)
        } else {
            MacState::Contention
        };
        self.transition(next);
        Step::Continue(None)
    }

    fn process_frame(&mut self, frame: MacFrame) -> Step {
        self.pending_eifs = false;
        self.events.push(MacEvent::FrameRx {
            frame_type: frame.frame_type,
            transmitter: frame.transmitter,
            psdu_length: frame.psdu_length,
        });
        let to_me = frame.receiver == MacAddress::Unicast(self.id);

        match frame.frame_type {
            FrameType::Rts if to_me => {
                if self.nav_active() {
                    debug!(node = ?self.id, from = ?frame.transmitter, "NAV 未结束，不回 CTS");
                    return self.after_reception();
                }
                let duration = frame
                    .duration
                    .saturating_sub(self.cfg.sifs)
                    .saturating_sub(self.cts_time());
                let mut cts = MacFrame::cts(self.id, frame.transmitter, duration);
                cts.bss_color = self.cfg.bss_color;
                self.respond(cts)
            }
            FrameType::QosData if frame.receiver.accepts(self.id) => {
                self.deliver(&frame);
                match self.build_ack(&frame) {
                    Some(resp) => self.respond(resp),
                    None => self.after_reception(),
                }
            }
            _ if !to_me => {
                self.update_nav(&frame);
                self.after_reception()
            }
            // 发给自己但不在等待的控制帧
            _ => {
                trace!(node = ?self.id, frame_type = ?frame.frame_type, "忽略意外的控制帧");
                self.after_reception()
            }
        }
    }

    /// 去重后把子帧交付上层，并维护 Block-Ack 记分板
    fn deliver(&mut self, frame: &MacFrame) {
        let key = (frame.transmitter, frame.ac);
        let unicast = !frame.receiver.is_broadcast();
        let last = self.last_rx_seq.get(&key).copied();
        let record = self.ba_rx.get(&key);

        for sf in &frame.subframes {
            let duplicate = sf.retransmission
                && if frame.aggregated {
                    record.is_some_and(|r| r.is_acked(sf.seq))
                } else {
                    last == Some(sf.seq)
                };
            if duplicate {
                debug!(node = ?self.id, from = ?frame.transmitter, seq = sf.seq, "重复帧");
                self.events.push(MacEvent::Duplicate {
                    transmitter: frame.transmitter,
                    ac: frame.ac,
                    seq: sf.seq,
                });
            } else {
                self.events.push(MacEvent::DataRx {
                    transmitter: frame.transmitter,
                    ac: frame.ac,
                    seq: sf.seq,
                    packet_id: sf.packet_id,
                    length: sf.msdu_length(),
                    enqueued_at: sf.timestamp,
                });
            }
        }

        if !unicast {
            return;
        }
        let seqs: Vec<u16> = frame.sequence_numbers().collect();
        if let Some(&seq) = seqs.last() {
            self.last_rx_seq.insert(key, seq);
        }
        if frame.ack_policy == AckPolicy::BlockAck || self.ba_rx.contains_key(&key) {
            let Some(&first) = seqs.first() else {
                return;
            };
            let window = self.cfg.ba_window;
            let record = self
                .ba_rx
                .entry(key)
                .or_insert_with(|| BaRecord::new(first, window));
            let update = update_ba_bitmap(record, &seqs);
            trace!(
                node = ?self.id,
                ssn = record.ssn,
                shifted = update.shifted,
                stale = update.stale,
                "更新 Block-Ack 位图"
            );
        }
    }

    /// 单播数据需要的确认帧
    fn build_ack(&self, frame: &MacFrame) -> Option<MacFrame> {
        let MacAddress::Unicast(_) = frame.receiver else {
            return None;
        };
        let sifs = self.cfg.sifs;
        match frame.ack_policy {
            AckPolicy::NoAck => None,
            AckPolicy::Normal => {
                let duration = frame
                    .duration
                    .saturating_sub(sifs)
                    .saturating_sub(self.ack_time());
                let mut ack = MacFrame::ack(self.id, frame.transmitter, duration);
                ack.bss_color = self.cfg.bss_color;
                Some(ack)
            }
            AckPolicy::BlockAck => {
                let record = self.ba_rx.get(&(frame.transmitter, frame.ac))?;
                let duration = frame
                    .duration
                    .saturating_sub(sifs)
                    .saturating_sub(self.block_ack_time());
                let mut ba = MacFrame::block_ack(
                    self.id,
                    frame.transmitter,
                    frame.ac,
                    record.ssn,
                    record.bitmap.clone(),
                    duration,
                );
                ba.bss_color = self.cfg.bss_color;
                Some(ba)
            }
        }
    }

    /// 偷听到发给别人的帧：按 Duration 字段延长 NAV
    fn update_nav(&mut self, frame: &MacFrame) {
        if frame.duration.is_zero() {
            return;
        }
        let kind = if !self.cfg.spatial_reuse {
            TimerKind::Nav
        } else if frame.bss_color == self.cfg.bss_color {
            TimerKind::IntraNav
        } else {
            TimerKind::InterNav
        };
        self.timers.arm_max(kind, frame.duration);
        if frame.frame_type == FrameType::Rts {
            let reset = self.cfg.sifs.saturating_mul(2)
                + self.cts_time()
                + RX_PHY_START_DELAY
                + self.cfg.slot_time.saturating_mul(2);
            self.timers.arm(TimerKind::NavReset, reset);
        }
        debug!(node = ?self.id, ?kind, duration = %frame.duration, "🚧 更新 NAV");
    }

    fn respond(&mut self, frame: MacFrame) -> Step {
        trace!(node = ?self.id, frame_type = ?frame.frame_type, "SIFS 后响应");
        self.response = Some(frame);
        self.transition(MacState::Receiving(ReceivingSubstate::Responding));
        Step::Continue(None)
    }

    fn on_responding(&mut self, ind: Option<PhyIndication>) -> Step {
        if matches!(ind, Some(PhyIndication::TxStartConfirm)) && self.awaiting_confirm {
            self.awaiting_confirm = false;
            let Some(frame) = self.response.clone() else {
                return self.after_reception();
            };
            let basic = self.basic;
            let airtime = basic.duration(frame.psdu_length);
            self.notify_tx(&frame, &basic, airtime);
            self.out.frame = Some(frame);
            self.transition(MacState::Receiving(ReceivingSubstate::TxEndRequest));
            self.timers.arm(TimerKind::Phase, airtime);
            return Step::Done;
        }
        if self.awaiting_confirm || self.timers.running(TimerKind::Phase) {
            return Step::Done;
        }
        let Some(psdu) = self.response.as_ref().map(|f| f.psdu_length) else {
            return self.after_reception();
        };
        self.timers.clear(TimerKind::Phase);
        self.out.request = Some(self.phy_request(PhyRequestKind::Start, &self.basic, psdu));
        self.awaiting_confirm = true;
        Step::Done
    }

    fn on_tx_end_request(&mut self, ind: Option<PhyIndication>) -> Step {
        if matches!(ind, Some(PhyIndication::TxEndConfirm)) && self.awaiting_confirm {
            self.awaiting_confirm = false;
            self.response = None;
            return self.after_reception();
        }
        if self.awaiting_confirm || self.timers.running(TimerKind::Phase) {
            return Step::Done;
        }
        let psdu = self.response.as_ref().map_or(0, |f| f.psdu_length);
        self.out.request = Some(self.phy_request(PhyRequestKind::End, &self.basic, psdu));
        self.awaiting_confirm = true;
        Step::Done
    }

    fn on_nav_wait(&mut self, ind: Option<PhyIndication>) -> Step {
        let reception = matches!(
            ind,
            Some(PhyIndication::RxStart(_) | PhyIndication::RxEnd(_) | PhyIndication::RxError)
        );
        if self.cca_busy || reception {
            self.transition(MacState::Receiving(ReceivingSubstate::Processing));
            return Step::Continue(ind);
        }
        if self.nav_active() {
            return Step::Done;
        }
        for kind in TimerKind::NAVS {
            self.timers.clear(kind);
        }
        self.timers.clear(TimerKind::NavReset);
        self.transition(MacState::Contention);
        Step::Continue(None)
    }
}
