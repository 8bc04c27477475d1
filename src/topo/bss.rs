//! 单 BSS 拓扑构建：一个 AP 加 N 个 STA

use tracing::info;

use super::wlan_node;
use crate::error::ConfigError;
use crate::mac::{AccessCategory, MacConfig};
use crate::net::{MacAddress, NetWorld, NodeId, Position};
use crate::phy::PhyConfig;
use crate::sim::{SimTime, Simulator};
use crate::traffic::CbrSource;

/// BSS 配置选项
#[derive(Debug, Clone)]
pub struct BssOpts {
    pub stations: usize,
    /// STA 均匀分布在以 AP 为圆心的圆上
    pub radius_m: f64,
    pub mac: MacConfig,
    pub phy: PhyConfig,
    pub seed: u64,
    pub ac: AccessCategory,
    pub packet_bytes: u32,
    pub interval: SimTime,
    /// 每条流的包数上限
    pub count: Option<u64>,
    pub downlink: bool,
    pub uplink: bool,
}

impl Default for BssOpts {
    fn default() -> Self {
        Self {
            stations: 4,
            radius_m: 10.0,
            mac: MacConfig::default(),
            phy: PhyConfig::default(),
            seed: 1,
            ac: AccessCategory::BestEffort,
            packet_bytes: 1500,
            interval: SimTime::from_micros(1000),
            count: None,
            downlink: true,
            uplink: false,
        }
    }
}

/// 构建结果
#[derive(Debug, Clone)]
pub struct Bss {
    pub ap: NodeId,
    pub stations: Vec<NodeId>,
}

/// 构建 BSS
///
/// 拓扑结构：ap (n0) 位于原点，sta1..staN (n1..nN) 在半径 `radius_m` 的圆上。
/// 下行流 ap -> 每个 STA，上行流每个 STA -> ap。
pub fn build_bss(
    world: &mut NetWorld,
    sim: &mut Simulator,
    opts: &BssOpts,
) -> Result<Bss, ConfigError> {
    if opts.interval.is_zero() {
        return Err(ConfigError::ZeroValue { field: "interval" });
    }
    CbrSource::check_packet_bytes(opts.packet_bytes)?;

    let ap = NodeId(0);
    world.add_node(Box::new(wlan_node(
        ap,
        "ap",
        Position::default(),
        opts.mac.clone(),
        opts.phy.clone(),
        opts.seed,
    )?))?;

    let mut stations = Vec::with_capacity(opts.stations);
    for i in 0..opts.stations {
        let id = NodeId(i + 1);
        let angle = std::f64::consts::TAU * i as f64 / opts.stations as f64;
        let pos = Position::new(opts.radius_m * angle.cos(), opts.radius_m * angle.sin(), 0.0);
        let node = wlan_node(
            id,
            format!("sta{}", i + 1),
            pos,
            opts.mac.clone(),
            opts.phy.clone(),
            opts.seed,
        )?;
        world.add_node(Box::new(node))?;
        stations.push(id);
    }

    for &sta in &stations {
        let flows = [
            (opts.downlink, ap, MacAddress::Unicast(sta)),
            (opts.uplink, sta, MacAddress::Unicast(ap)),
        ];
        for (enabled, src, dst) in flows {
            if !enabled {
                continue;
            }
            let src_cbr = CbrSource {
                src,
                dst,
                ac: opts.ac,
                packet_bytes: opts.packet_bytes,
                remaining: opts.count,
            };
            src_cbr.schedule(sim, SimTime::ZERO, opts.interval);
        }
    }

    info!(ap = ?ap, stations = stations.len(), "BSS 构建完成");
    Ok(Bss { ap, stations })
}
