//! 标识符类型
//!
//! 定义节点标识符与 MAC 层地址。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 节点标识符（同时作为注册表下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// MAC 接收地址：单播到某个节点，或广播
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacAddress {
    Unicast(NodeId),
    Broadcast,
}

impl MacAddress {
    pub fn is_broadcast(self) -> bool {
        matches!(self, MacAddress::Broadcast)
    }

    pub fn node(self) -> Option<NodeId> {
        match self {
            MacAddress::Unicast(id) => Some(id),
            MacAddress::Broadcast => None,
        }
    }

    /// 该地址是否应被 `me` 接收
    pub fn accepts(self, me: NodeId) -> bool {
        match self {
            MacAddress::Unicast(id) => id == me,
            MacAddress::Broadcast => true,
        }
    }
}

impl From<NodeId> for MacAddress {
    fn from(id: NodeId) -> Self {
        MacAddress::Unicast(id)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacAddress::Unicast(id) => write!(f, "{id}"),
            MacAddress::Broadcast => f.write_str("broadcast"),
        }
    }
}
