//! 抽象 PHY
//!
//! 半双工黑盒：
//! - 发送：Start 请求 -> `TxStartConfirm`；MAC 交付帧后生成一个 `ChannelFrame`；End 请求 -> `TxEndConfirm`
//! - 接收：对数距离路径损耗计算接收功率，低于 CCA 门限的信号直接忽略；
//!   信道无能量时到达的信号被解码（`CcaBusy` + `RxStart`），任何重叠都会破坏它（结束时 `RxError`）；
//!   所有能量结束后给出 `CcaIdle`。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::timing::PhyRate;
use super::types::{PhyIndication, PhyRequest, PhyRequestKind, RxVector};
use crate::mac::MacFrame;
use crate::net::{ChannelFrame, NodeId, Position};
use crate::sim::SimTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhyConfig {
    pub tx_power_dbm: f64,
    /// CCA 能量检测门限
    pub cca_threshold_dbm: f64,
    /// 1 米处参考损耗
    pub reference_loss_db: f64,
    pub path_loss_exponent: f64,
    pub frequency_id: u32,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            tx_power_dbm: 20.0,
            cca_threshold_dbm: -82.0,
            reference_loss_db: 46.7,
            path_loss_exponent: 3.0,
            frequency_id: 1,
        }
    }
}

impl PhyConfig {
    /// 对数距离模型下的接收功率
    pub fn rx_power_dbm(&self, tx_power_dbm: f64, distance_m: f64) -> f64 {
        let d = distance_m.max(1.0);
        tx_power_dbm - self.reference_loss_db - 10.0 * self.path_loss_exponent * d.log10()
    }
}

#[derive(Debug)]
struct Signal {
    id: u64,
    remaining: SimTime,
    frame: MacFrame,
    corrupted: bool,
}

#[derive(Debug, Clone)]
struct ActiveTx {
    request: PhyRequest,
    duration: SimTime,
}

#[derive(Debug)]
pub struct AbstractPhy {
    node: NodeId,
    cfg: PhyConfig,
    tx: Option<ActiveTx>,
    signals: Vec<Signal>,
    decoding: Option<u64>,
    next_signal_id: u64,
    cca_busy: bool,
    pending: VecDeque<PhyIndication>,
}

impl AbstractPhy {
    pub fn new(node: NodeId, cfg: PhyConfig) -> Self {
        Self {
            node,
            cfg,
            tx: None,
            signals: Vec::new(),
            decoding: None,
            next_signal_id: 0,
            cca_busy: false,
            pending: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &PhyConfig {
        &self.cfg
    }

    pub fn frequency_id(&self) -> u32 {
        self.cfg.frequency_id
    }

    pub fn is_transmitting(&self) -> bool {
        self.tx.is_some()
    }

    pub fn is_cca_busy(&self) -> bool {
        self.cca_busy
    }

    pub fn pop_indication(&mut self) -> Option<PhyIndication> {
        self.pending.pop_front()
    }

    pub fn has_indications(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 距离最早结束的信号的时间
    pub fn next_invoke(&self) -> Option<SimTime> {
        self.signals.iter().map(|s| s.remaining).min()
    }

    /// 推进时间：结束的信号产生 RxEnd/RxError，能量全部消失时产生 CcaIdle。
    pub fn advance(&mut self, elapsed: SimTime) {
        if elapsed.is_zero() || self.signals.is_empty() {
            return;
        }
        for s in self.signals.iter_mut() {
            s.remaining = s.remaining.saturating_sub(elapsed);
        }
        let (ended, active): (Vec<Signal>, Vec<Signal>) = std::mem::take(&mut self.signals)
            .into_iter()
            .partition(|s| s.remaining.is_zero());
        self.signals = active;

        for s in ended {
            if self.decoding != Some(s.id) {
                continue;
            }
            self.decoding = None;
            if s.corrupted {
                debug!(node = ?self.node, "接收失败（信号重叠）");
                self.pending.push_back(PhyIndication::RxError);
            } else {
                trace!(node = ?self.node, frame_type = ?s.frame.frame_type, "接收完成");
                self.pending.push_back(PhyIndication::RxEnd(Box::new(s.frame)));
            }
        }

        if self.signals.is_empty() && self.cca_busy && self.tx.is_none() {
            self.cca_busy = false;
            self.pending.push_back(PhyIndication::CcaIdle);
        }
    }

    /// 信道上到达一帧
    pub fn receive(&mut self, own_position: Position, frame: &ChannelFrame) {
        if frame.frequency_id != self.cfg.frequency_id {
            return;
        }
        let distance = own_position.distance_to(&frame.source_position);
        let rssi = self.cfg.rx_power_dbm(frame.tx_power_dbm, distance);
        if rssi < self.cfg.cca_threshold_dbm {
            trace!(node = ?self.node, rssi, "信号低于 CCA 门限，忽略");
            return;
        }

        let id = self.next_signal_id;
        self.next_signal_id = self.next_signal_id.wrapping_add(1);

        // 已有能量（包括自己发送期间到达的信号）时无法解码新信号
        let decodable = self.tx.is_none() && self.signals.is_empty();
        if let Some(cur) = self.decoding {
            if let Some(s) = self.signals.iter_mut().find(|s| s.id == cur) {
                s.corrupted = true;
            }
        }
        self.signals.push(Signal {
            id,
            remaining: frame.duration,
            frame: frame.frame.clone(),
            corrupted: false,
        });

        if self.tx.is_some() {
            return;
        }
        if !self.cca_busy {
            self.cca_busy = true;
            self.pending.push_back(PhyIndication::CcaBusy);
        }
        if decodable {
            self.decoding = Some(id);
            self.pending.push_back(PhyIndication::RxStart(RxVector {
                psdu_length: frame.frame.psdu_length,
                mcs: frame.mcs,
                frame_format: frame.frame_format,
                aggregated: frame.frame.aggregated,
                bandwidth: frame.bandwidth,
                rssi_dbm: rssi,
            }));
        }
    }

    /// 处理 MAC 的 Start/End 请求，确认立即排入指示队列。
    pub fn request(&mut self, req: PhyRequest) {
        match req.kind {
            PhyRequestKind::Start => {
                let duration = request_duration(&req);
                // 半双工：开始发送即放弃当前解码
                self.decoding = None;
                self.tx = Some(ActiveTx {
                    request: req,
                    duration,
                });
                self.pending.push_back(PhyIndication::TxStartConfirm);
            }
            PhyRequestKind::End => {
                self.tx = None;
                self.pending.push_back(PhyIndication::TxEndConfirm);
                if !self.signals.is_empty() && !self.cca_busy {
                    self.cca_busy = true;
                    self.pending.push_back(PhyIndication::CcaBusy);
                } else if self.signals.is_empty() && self.cca_busy {
                    self.cca_busy = false;
                    self.pending.push_back(PhyIndication::CcaIdle);
                }
            }
        }
    }

    /// MAC 在 TxStartConfirm 之后交付帧，生成信道上的帧封装。
    pub fn transmit(&mut self, position: Position, frame: MacFrame) -> Option<ChannelFrame> {
        let Some(tx) = &self.tx else {
            warn!(node = ?self.node, "未请求发送就交付了帧，丢弃");
            return None;
        };
        Some(ChannelFrame {
            source: self.node,
            source_position: position,
            frequency_id: self.cfg.frequency_id,
            tx_power_dbm: self.cfg.tx_power_dbm,
            frame_format: tx.request.frame_format,
            bandwidth: tx.request.bandwidth,
            mcs: tx.request.mcs_per_user.first().copied().unwrap_or(0),
            duration: tx.duration,
            frame,
        })
    }
}

fn request_duration(req: &PhyRequest) -> SimTime {
    let mcs = req.mcs_per_user.first().copied().unwrap_or(0);
    let len = req.psdu_length_per_user.first().copied().unwrap_or(0);
    match PhyRate::new(req.frame_format, req.bandwidth, mcs, req.num_spatial_streams) {
        Ok(rate) => rate.duration(len),
        Err(err) => {
            // MAC 只会请求配置阶段校验过的速率
            warn!(%err, "PHY 请求了不支持的速率");
            SimTime::ZERO
        }
    }
}
