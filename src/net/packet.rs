//! 应用层数据包
//!
//! 由流量源注入 MAC 队列的数据单元，MAC 只关心长度与目的地址。

use super::id::{MacAddress, NodeId};
use crate::mac::AccessCategory;
use crate::sim::SimTime;

#[derive(Debug, Clone, PartialEq)]
pub struct AppPacket {
    pub id: u64,
    pub src: NodeId,
    pub dst: MacAddress,
    pub ac: AccessCategory,
    /// MSDU 长度（字节）
    pub length: u32,
    /// 负载引用（由应用层解释，MAC 透传）
    pub payload_ref: u64,
    /// 入队时间戳
    pub timestamp: SimTime,
}

impl AppPacket {
    pub fn is_broadcast(&self) -> bool {
        self.dst.is_broadcast()
    }
}
