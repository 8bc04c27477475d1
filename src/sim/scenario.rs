//! 场景文件格式（JSON）
//!
//! 只描述“跑什么”：节点、各自的 MAC/PHY 配置、流量。校验与构建在 `topo::scenario`。

use serde::{Deserialize, Serialize};

use crate::mac::{AccessCategory, MacConfig};
use crate::net::Position;
use crate::phy::PhyConfig;

pub const SCENARIO_SCHEMA_VERSION: u32 = 1;

fn default_duration_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// 所有节点共用的 MAC 配置；节点可整体覆盖
    #[serde(default)]
    pub mac: Option<MacConfig>,
    #[serde(default)]
    pub phy: Option<PhyConfig>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub traffic: Vec<TrafficSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub mac: Option<MacConfig>,
    #[serde(default)]
    pub phy: Option<PhyConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastKeyword {
    #[serde(rename = "broadcast")]
    Broadcast,
}

/// 目的地：节点 id 或 `"broadcast"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DestinationSpec {
    Node(usize),
    Broadcast(BroadcastKeyword),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSpec {
    pub src: usize,
    pub dst: DestinationSpec,
    #[serde(default)]
    pub ac: AccessCategory,
    pub packet_bytes: u32,
    pub interval_us: u64,
    /// 包数上限；None 表示一直发到仿真结束
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub start_us: u64,
}
