use serde::{Deserialize, Serialize};

use crate::mac::{AccessCategory, FrameType, MacEvent};
use crate::net::{MacAddress, NodeId, Position};
use crate::sim::SimTime;

/// 可视化事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 节点元信息（作为 t=0 的第一条事件）
    Meta { nodes: Vec<VizNodeInfo> },
    /// 一帧交给 PHY 发送
    FrameTx {
        frame_type: FrameType,
        receiver: MacAddress,
        ac: AccessCategory,
        mcs: u8,
        psdu_length: u32,
        airtime_us: u64,
        subframes: usize,
        retransmission: bool,
    },
    /// 成功解码一帧
    FrameRx {
        frame_type: FrameType,
        transmitter: NodeId,
        psdu_length: u32,
    },
    /// MSDU 交付上层
    DataRx {
        transmitter: NodeId,
        ac: AccessCategory,
        seq: u16,
        packet_id: u64,
        length: u32,
        latency_us: u64,
    },
    /// 待确认帧出队（成功或重传耗尽）
    Discard {
        receiver: MacAddress,
        ac: AccessCategory,
        success: bool,
        count: usize,
        bytes: u64,
        retry_count: u8,
    },
    QueueOverflow {
        receiver: MacAddress,
        ac: AccessCategory,
        packet_id: u64,
    },
    Duplicate {
        transmitter: NodeId,
        ac: AccessCategory,
        seq: u16,
    },
    RxError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizNodeInfo {
    pub id: NodeId,
    pub name: String,
    pub position: Position,
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizEvent {
    /// 仿真时间（微秒，和 `SimTime.0` 同口径）
    pub t_us: u64,
    /// 产生事件的节点；`meta` 为 None
    pub node: Option<NodeId>,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

impl VizEvent {
    pub fn from_mac(now: SimTime, node: NodeId, ev: &MacEvent) -> Self {
        let kind = match ev.clone() {
            MacEvent::FrameTx {
                frame_type,
                receiver,
                ac,
                mcs,
                psdu_length,
                airtime,
                subframes,
                retransmission,
            } => VizEventKind::FrameTx {
                frame_type,
                receiver,
                ac,
                mcs,
                psdu_length,
                airtime_us: airtime.as_micros(),
                subframes,
                retransmission,
            },
            MacEvent::FrameRx {
                frame_type,
                transmitter,
                psdu_length,
            } => VizEventKind::FrameRx {
                frame_type,
                transmitter,
                psdu_length,
            },
            MacEvent::DataRx {
                transmitter,
                ac,
                seq,
                packet_id,
                length,
                enqueued_at,
            } => VizEventKind::DataRx {
                transmitter,
                ac,
                seq,
                packet_id,
                length,
                latency_us: now.saturating_sub(enqueued_at).as_micros(),
            },
            MacEvent::PacketsDiscarded {
                receiver,
                ac,
                success,
                count,
                bytes,
                retry_count,
            } => VizEventKind::Discard {
                receiver,
                ac,
                success,
                count,
                bytes,
                retry_count,
            },
            MacEvent::QueueOverflow {
                receiver,
                ac,
                packet_id,
                ..
            } => VizEventKind::QueueOverflow {
                receiver,
                ac,
                packet_id,
            },
            MacEvent::Duplicate {
                transmitter,
                ac,
                seq,
            } => VizEventKind::Duplicate {
                transmitter,
                ac,
                seq,
            },
            MacEvent::RxError => VizEventKind::RxError,
        };
        Self {
            t_us: now.as_micros(),
            node: Some(node),
            kind,
        }
    }
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
