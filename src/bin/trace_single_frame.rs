//! 单帧追踪模式
//!
//! 两个节点，只发送一个数据帧，打印详细的 MAC 状态切换与帧交换过程

use clap::Parser;
use tracing::{debug, info};
use wlansim_rs::error::ConfigError;
use wlansim_rs::mac::{AccessCategory, MacConfig};
use wlansim_rs::net::{MacAddress, NetWorld, NodeId, Position};
use wlansim_rs::phy::PhyConfig;
use wlansim_rs::sim::{Event, SimTime, Simulator, World};
use wlansim_rs::topo::wlan_node;
use wlansim_rs::traffic::CbrSource;

#[derive(Debug, Parser)]
#[command(name = "trace-single-frame", about = "单帧追踪模式：只发送一个数据帧，打印详细的执行流程")]
struct Args {
    #[arg(long, default_value_t = 1500)]
    packet_bytes: u32,
    #[arg(long, default_value_t = 7)]
    mcs: u8,
    /// 两节点间距离（米）
    #[arg(long, default_value_t = 10.0)]
    distance_m: f64,
    /// 设为不大于包长即启用 RTS/CTS
    #[arg(long, default_value_t = 65_535)]
    rts_threshold: u32,
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

/// 单帧追踪事件：注入一个数据包
#[derive(Debug)]
struct TraceSingleFrame {
    src: NodeId,
    dst: NodeId,
    packet_bytes: u32,
}

impl Event for TraceSingleFrame {
    #[tracing::instrument(skip(self, sim, world), fields(src = ?self.src, dst = ?self.dst, packet_bytes = self.packet_bytes))]
    fn execute(&mut self, sim: &mut Simulator, world: &mut dyn World) {
        info!("📦 创建并注入单个数据包");

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        let pkt = w.make_packet(
            self.src,
            MacAddress::Unicast(self.dst),
            AccessCategory::BestEffort,
            self.packet_bytes,
            sim.now(),
        );
        debug!(pkt_id = pkt.id, now = ?sim.now(), "创建数据包");
        if w.enqueue(pkt).is_err() {
            info!("队列已满，数据包被丢弃");
        }
    }
}

fn main() -> Result<(), ConfigError> {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    CbrSource::check_packet_bytes(args.packet_bytes)?;

    let mac = MacConfig {
        mcs: args.mcs,
        rts_threshold: args.rts_threshold,
        ..MacConfig::default()
    };
    let src = NodeId(0);
    let dst = NodeId(1);

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();

    info!("╔════════════════════════════════════════════════════════════════════════════════╗");
    info!("║                    单帧追踪模式启动                                            ║");
    info!("╚════════════════════════════════════════════════════════════════════════════════╝");

    world.add_node(Box::new(wlan_node(
        src,
        "tx",
        Position::default(),
        mac.clone(),
        PhyConfig::default(),
        args.seed,
    )?))?;
    world.add_node(Box::new(wlan_node(
        dst,
        "rx",
        Position::new(args.distance_m, 0.0, 0.0),
        mac,
        PhyConfig::default(),
        args.seed,
    )?))?;

    info!("在 t=0 调度 TraceSingleFrame 事件");
    sim.schedule(
        SimTime::ZERO,
        TraceSingleFrame {
            src,
            dst,
            packet_bytes: args.packet_bytes,
        },
    );

    sim.run(SimTime::from_millis(10), &mut world);

    info!("╔════════════════════════════════════════════════════════════════════════════════╗");
    info!("║                    仿真完成                                                    ║");
    info!("╚════════════════════════════════════════════════════════════════════════════════╝");

    let tx = world.stats.node(src);
    let rx = world.stats.node(dst);
    println!(
        "done @ {}, acked_pkts={}, delivered_pkts={}, delivered_bytes={}",
        sim.now(),
        tx.acked_pkts,
        rx.rx_data_pkts,
        rx.rx_data_bytes
    );
    Ok(())
}
