//! MAC 帧描述符
//!
//! 只保存头部字段和负载长度/引用，不做比特级编解码。

use serde::{Deserialize, Serialize};

use super::ac::AccessCategory;
use super::block_ack::BaBitmap;
use crate::net::{MacAddress, NodeId};
use crate::sim::SimTime;

/// QoS 数据帧 MAC 头长度
pub const QOS_HEADER_LEN: u32 = 26;
pub const FCS_LEN: u32 = 4;
pub const RTS_LEN: u32 = 20;
pub const CTS_LEN: u32 = 14;
pub const ACK_LEN: u32 = 14;
/// Block-Ack 帧除位图外的长度（头 + BA 控制 + SSN + FCS）
pub const BLOCK_ACK_BASE_LEN: u32 = 24;
pub const MPDU_DELIMITER_LEN: u32 = 4;
/// 单个 MSDU 的最大负载长度
pub const MAX_MSDU_LEN: u32 = 2304;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Rts,
    Cts,
    Ack,
    BlockAck,
    QosData,
}

impl FrameType {
    pub fn is_control(self) -> bool {
        !matches!(self, FrameType::QosData)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    Normal,
    NoAck,
    BlockAck,
}

/// A-MPDU 中的一个子帧（非聚合帧只有一个）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subframe {
    pub seq: u16,
    pub retransmission: bool,
    pub mpdu_length: u32,
    /// 数据包入队时间
    pub timestamp: SimTime,
    pub packet_id: u64,
    pub payload_ref: u64,
}

impl Subframe {
    pub fn msdu_length(&self) -> u32 {
        self.mpdu_length.saturating_sub(QOS_HEADER_LEN + FCS_LEN)
    }
}

/// Block-Ack 帧携带的 (SSN, 位图)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAckInfo {
    pub ssn: u16,
    pub bitmap: BaBitmap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacFrame {
    pub frame_type: FrameType,
    pub transmitter: NodeId,
    pub receiver: MacAddress,
    /// Duration/NAV 字段：本帧结束后介质仍被占用的时间
    pub duration: SimTime,
    pub ac: AccessCategory,
    pub ack_policy: AckPolicy,
    pub bss_color: u8,
    pub aggregated: bool,
    pub subframes: Vec<Subframe>,
    pub block_ack: Option<BlockAckInfo>,
    pub psdu_length: u32,
}

impl MacFrame {
    fn control(
        frame_type: FrameType,
        transmitter: NodeId,
        receiver: MacAddress,
        duration: SimTime,
        psdu_length: u32,
    ) -> Self {
        Self {
            frame_type,
            transmitter,
            receiver,
            duration,
            ac: AccessCategory::BestEffort,
            ack_policy: AckPolicy::NoAck,
            bss_color: 0,
            aggregated: false,
            subframes: Vec::new(),
            block_ack: None,
            psdu_length,
        }
    }

    pub fn rts(transmitter: NodeId, receiver: NodeId, duration: SimTime) -> Self {
        Self::control(FrameType::Rts, transmitter, receiver.into(), duration, RTS_LEN)
    }

    pub fn cts(transmitter: NodeId, receiver: NodeId, duration: SimTime) -> Self {
        Self::control(FrameType::Cts, transmitter, receiver.into(), duration, CTS_LEN)
    }

    pub fn ack(transmitter: NodeId, receiver: NodeId, duration: SimTime) -> Self {
        Self::control(FrameType::Ack, transmitter, receiver.into(), duration, ACK_LEN)
    }

    pub fn block_ack(
        transmitter: NodeId,
        receiver: NodeId,
        ac: AccessCategory,
        ssn: u16,
        bitmap: BaBitmap,
        duration: SimTime,
    ) -> Self {
        let len = block_ack_length(bitmap.len());
        let mut f = Self::control(FrameType::BlockAck, transmitter, receiver.into(), duration, len);
        f.ac = ac;
        f.block_ack = Some(BlockAckInfo { ssn, bitmap });
        f
    }

    /// QoS 数据帧；多于一个子帧即为 A-MPDU
    pub fn qos_data(
        transmitter: NodeId,
        receiver: MacAddress,
        ac: AccessCategory,
        ack_policy: AckPolicy,
        subframes: Vec<Subframe>,
    ) -> Self {
        let aggregated = subframes.len() > 1;
        let psdu_length = if aggregated {
            ampdu_length(subframes.iter().map(|s| s.mpdu_length))
        } else {
            subframes.first().map_or(0, |s| s.mpdu_length)
        };
        Self {
            frame_type: FrameType::QosData,
            transmitter,
            receiver,
            duration: SimTime::ZERO,
            ac,
            ack_policy,
            bss_color: 0,
            aggregated,
            subframes,
            block_ack: None,
            psdu_length,
        }
    }

    pub fn is_data(&self) -> bool {
        self.frame_type == FrameType::QosData
    }

    pub fn is_retransmission(&self) -> bool {
        self.subframes.iter().any(|s| s.retransmission)
    }

    pub fn sequence_numbers(&self) -> impl Iterator<Item = u16> + '_ {
        self.subframes.iter().map(|s| s.seq)
    }
}

pub fn mpdu_length(msdu_length: u32) -> u32 {
    msdu_length + QOS_HEADER_LEN + FCS_LEN
}

pub fn block_ack_length(window: u16) -> u32 {
    BLOCK_ACK_BASE_LEN + (window as u32).div_ceil(8)
}

/// A-MPDU 长度：每个子帧前加 4 字节分隔符，除最后一个外填充到 4 字节对齐
pub fn ampdu_length(mpdu_lengths: impl IntoIterator<Item = u32>) -> u32 {
    let lens: Vec<u32> = mpdu_lengths.into_iter().collect();
    let n = lens.len();
    lens.iter()
        .enumerate()
        .map(|(i, &len)| {
            let sub = MPDU_DELIMITER_LEN + len;
            if i + 1 < n { sub.next_multiple_of(4) } else { sub }
        })
        .sum()
}
