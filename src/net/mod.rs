//! 网络模拟模块
//!
//! 节点、无线接口、信道分发、数据包和统计。

mod channel;
mod id;
mod net_world;
mod node;
mod packet;
mod position;
mod stats;

pub use channel::{Broadcast, ChannelFrame, ChannelModel};
pub use id::{MacAddress, NodeId};
pub use net_world::NetWorld;
pub use node::{Interface, Node, WlanNode};
pub use packet::AppPacket;
pub use position::Position;
pub use stats::{NodeStats, Stats};
