//! 统计信息
//!
//! 由 MAC 观察者事件累加得到；统计只读事件，不反过来影响仿真。

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::id::NodeId;
use crate::mac::{FrameType, MacEvent};
use crate::sim::SimTime;

/// 单个节点的计数
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct NodeStats {
    pub tx_frames: u64,
    pub tx_data_frames: u64,
    pub tx_bytes: u64,
    pub tx_airtime_us: u64,
    pub retransmissions: u64,
    /// 已确认（或无需确认）出队的包
    pub acked_pkts: u64,
    pub acked_bytes: u64,
    /// 重传耗尽丢弃的包
    pub failed_pkts: u64,
    pub rx_frames: u64,
    pub rx_data_pkts: u64,
    pub rx_data_bytes: u64,
    pub duplicates: u64,
    pub rx_errors: u64,
    pub queue_overflows: u64,
    /// 交付时延（入队到交付）累计
    pub latency_sum_us: u64,
}

impl NodeStats {
    pub fn mean_latency_us(&self) -> Option<f64> {
        (self.rx_data_pkts > 0).then(|| self.latency_sum_us as f64 / self.rx_data_pkts as f64)
    }
}

impl fmt::Display for NodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx_frames={} tx_data={} retrans={} acked={} failed={} rx_data={} rx_bytes={} dup={} rx_err={} overflow={}",
            self.tx_frames,
            self.tx_data_frames,
            self.retransmissions,
            self.acked_pkts,
            self.failed_pkts,
            self.rx_data_pkts,
            self.rx_data_bytes,
            self.duplicates,
            self.rx_errors,
            self.queue_overflows,
        )?;
        if let Some(lat) = self.mean_latency_us() {
            write!(f, " mean_latency_us={lat:.1}")?;
        }
        Ok(())
    }
}

/// 网络统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub nodes: BTreeMap<NodeId, NodeStats>,
}

impl Stats {
    pub fn node(&self, id: NodeId) -> NodeStats {
        self.nodes.get(&id).cloned().unwrap_or_default()
    }

    pub fn record(&mut self, node: NodeId, now: SimTime, ev: &MacEvent) {
        let s = self.nodes.entry(node).or_default();
        match ev {
            MacEvent::FrameTx {
                frame_type,
                psdu_length,
                airtime,
                retransmission,
                ..
            } => {
                s.tx_frames += 1;
                s.tx_bytes += u64::from(*psdu_length);
                s.tx_airtime_us += airtime.as_micros();
                if *frame_type == FrameType::QosData {
                    s.tx_data_frames += 1;
                    if *retransmission {
                        s.retransmissions += 1;
                    }
                }
            }
            MacEvent::FrameRx { .. } => s.rx_frames += 1,
            MacEvent::DataRx {
                length, enqueued_at, ..
            } => {
                s.rx_data_pkts += 1;
                s.rx_data_bytes += u64::from(*length);
                s.latency_sum_us += now.saturating_sub(*enqueued_at).as_micros();
            }
            MacEvent::PacketsDiscarded {
                success,
                count,
                bytes,
                ..
            } => {
                if *success {
                    s.acked_pkts += *count as u64;
                    s.acked_bytes += bytes;
                } else {
                    s.failed_pkts += *count as u64;
                }
            }
            MacEvent::QueueOverflow { .. } => s.queue_overflows += 1,
            MacEvent::Duplicate { .. } => s.duplicates += 1,
            MacEvent::RxError => s.rx_errors += 1,
        }
    }

    pub fn total(&self) -> NodeStats {
        let mut t = NodeStats::default();
        for s in self.nodes.values() {
            t.tx_frames += s.tx_frames;
            t.tx_data_frames += s.tx_data_frames;
            t.tx_bytes += s.tx_bytes;
            t.tx_airtime_us += s.tx_airtime_us;
            t.retransmissions += s.retransmissions;
            t.acked_pkts += s.acked_pkts;
            t.acked_bytes += s.acked_bytes;
            t.failed_pkts += s.failed_pkts;
            t.rx_frames += s.rx_frames;
            t.rx_data_pkts += s.rx_data_pkts;
            t.rx_data_bytes += s.rx_data_bytes;
            t.duplicates += s.duplicates;
            t.rx_errors += s.rx_errors;
            t.queue_overflows += s.queue_overflows;
            t.latency_sum_us += s.latency_sum_us;
        }
        t
    }

    /// 丢失比例：(重传耗尽 + 队列溢出) / (出队结束 + 队列溢出)
    pub fn loss_ratio(&self) -> f64 {
        let t = self.total();
        let lost = t.failed_pkts + t.queue_overflows;
        let offered = t.acked_pkts + t.failed_pkts + t.queue_overflows;
        if offered == 0 {
            0.0
        } else {
            lost as f64 / offered as f64
        }
    }
}
