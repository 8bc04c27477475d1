//! 信道
//!
//! 调度器只负责把发送缓冲中的 `ChannelFrame` 复制给其他节点；
//! 每对节点之间是否送达由 `ChannelModel` 决定，功率与干扰交给接收方 PHY。

use super::id::NodeId;
use super::position::Position;
use crate::mac::MacFrame;
use crate::phy::{Bandwidth, FrameFormat};
use crate::sim::SimTime;

/// 信道上传播的帧封装（`pushChannelData` 的载荷）
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFrame {
    pub source: NodeId,
    pub source_position: Position,
    pub frequency_id: u32,
    pub tx_power_dbm: f64,
    pub frame_format: FrameFormat,
    pub bandwidth: Bandwidth,
    pub mcs: u8,
    /// 信道占用时长
    pub duration: SimTime,
    pub frame: MacFrame,
}

/// 逐对投递判决
pub trait ChannelModel: std::fmt::Debug {
    fn should_deliver(&mut self, from: NodeId, to: NodeId, frame: &ChannelFrame) -> bool;
}

/// 全部投递（由接收方 PHY 做门限判决）
#[derive(Debug, Default, Clone, Copy)]
pub struct Broadcast;

impl ChannelModel for Broadcast {
    fn should_deliver(&mut self, _from: NodeId, _to: NodeId, _frame: &ChannelFrame) -> bool {
        true
    }
}
