//! 场景构建
//!
//! 把配置变成一个已校验的 `NetWorld`，并把流量注册为调度器事件。
//! 所有校验都在这里完成，仿真循环开始后不再出现配置错误。

pub mod bss;
pub mod scenario;

use crate::error::ConfigError;
use crate::mac::{EdcaMac, MacConfig};
use crate::net::{Interface, NodeId, Position, WlanNode};
use crate::phy::{AbstractPhy, PhyConfig};

/// 创建一个单接口无线节点（MAC 配置在这里校验）
pub fn wlan_node(
    id: NodeId,
    name: impl Into<String>,
    position: Position,
    mac: MacConfig,
    phy: PhyConfig,
    seed: u64,
) -> Result<WlanNode, ConfigError> {
    let mac = EdcaMac::new(id, mac, seed)?;
    let phy = AbstractPhy::new(id, phy);
    Ok(WlanNode::new(id, name, position).with_interface(Interface::new(mac, phy)))
}
