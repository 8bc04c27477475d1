//! MAC 观察者事件
//!
//! MAC 把发送/接收/丢弃等通知推入事件缓冲，由节点取走交给统计与可视化。
//! 这些事件只是副作用，MAC 自己从不读取它们。

use super::ac::AccessCategory;
use super::frame::FrameType;
use crate::net::{MacAddress, NodeId};
use crate::sim::SimTime;

#[derive(Debug, Clone, PartialEq)]
pub enum MacEvent {
    /// 一帧交给 PHY 发送
    FrameTx {
        frame_type: FrameType,
        receiver: MacAddress,
        ac: AccessCategory,
        mcs: u8,
        psdu_length: u32,
        airtime: SimTime,
        subframes: usize,
        retransmission: bool,
    },
    /// 成功解码一帧（不论是否发给自己）
    FrameRx {
        frame_type: FrameType,
        transmitter: NodeId,
        psdu_length: u32,
    },
    /// 一个 MSDU 交付上层
    DataRx {
        transmitter: NodeId,
        ac: AccessCategory,
        seq: u16,
        packet_id: u64,
        length: u32,
        enqueued_at: SimTime,
    },
    /// 待确认帧出队：成功（已确认/无需确认）或重传耗尽
    PacketsDiscarded {
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
        length: u32,
    },
    Duplicate {
        transmitter: NodeId,
        ac: AccessCategory,
        seq: u16,
    },
    RxError,
}
