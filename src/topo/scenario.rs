//! 从场景文件构建

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::wlan_node;
use crate::error::ConfigError;
use crate::net::{MacAddress, NetWorld, NodeId};
use crate::sim::{
    DestinationSpec, SCENARIO_SCHEMA_VERSION, ScenarioSpec, SimTime, Simulator,
};
use crate::traffic::CbrSource;

/// 读取并解析场景文件
pub fn load_scenario(path: &Path) -> Result<ScenarioSpec, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// 校验场景并构建节点与流量，返回仿真时长。
pub fn build_from_spec(
    spec: &ScenarioSpec,
    world: &mut NetWorld,
    sim: &mut Simulator,
) -> Result<SimTime, ConfigError> {
    if spec.schema_version != SCENARIO_SCHEMA_VERSION {
        return Err(ConfigError::UnsupportedSchema(spec.schema_version));
    }
    if spec.duration_ms == 0 {
        return Err(ConfigError::ZeroValue {
            field: "duration_ms",
        });
    }

    for n in &spec.nodes {
        let id = NodeId(n.id);
        let mac = n.mac.clone().or_else(|| spec.mac.clone()).unwrap_or_default();
        let phy = n.phy.clone().or_else(|| spec.phy.clone()).unwrap_or_default();
        let name = n.name.clone().unwrap_or_else(|| id.to_string());
        debug!(node = ?id, %name, "构建节点");
        let node = wlan_node(id, name, n.position, mac, phy, spec.seed)?;
        world.add_node(Box::new(node))?;
    }

    for t in &spec.traffic {
        let src = NodeId(t.src);
        if !world.contains(src) {
            return Err(ConfigError::UnknownNode(t.src));
        }
        let dst = match t.dst {
            DestinationSpec::Node(id) if id == t.src => {
                return Err(ConfigError::SelfAddressed(id));
            }
            DestinationSpec::Node(id) if world.contains(NodeId(id)) => MacAddress::Unicast(NodeId(id)),
            DestinationSpec::Node(id) => return Err(ConfigError::UnknownNode(id)),
            DestinationSpec::Broadcast(_) => MacAddress::Broadcast,
        };
        if t.interval_us == 0 {
            return Err(ConfigError::ZeroValue {
                field: "interval_us",
            });
        }
        CbrSource::check_packet_bytes(t.packet_bytes)?;
        let cbr = CbrSource {
            src,
            dst,
            ac: t.ac,
            packet_bytes: t.packet_bytes,
            remaining: t.count,
        };
        cbr.schedule(
            sim,
            SimTime::from_micros(t.start_us),
            SimTime::from_micros(t.interval_us),
        );
    }

    info!(
        nodes = spec.nodes.len(),
        flows = spec.traffic.len(),
        duration_ms = spec.duration_ms,
        "场景构建完成"
    );
    Ok(SimTime::from_millis(spec.duration_ms))
}
