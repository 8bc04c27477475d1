//! 单 BSS 仿真
//!
//! 一个 AP 加 N 个 STA，参数全部来自命令行。

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use wlansim_rs::error::ConfigError;
use wlansim_rs::mac::{AccessCategory, MacConfig, RateControlKind};
use wlansim_rs::net::NetWorld;
use wlansim_rs::phy::{FrameFormat, PhyConfig};
use wlansim_rs::sim::{SimTime, Simulator};
use wlansim_rs::topo::bss::{BssOpts, build_bss};
use wlansim_rs::viz::VizLogger;

fn parse_format(s: &str) -> Result<FrameFormat, String> {
    match s {
        "non_ht" => Ok(FrameFormat::NonHt),
        "ht" | "ht_mixed" => Ok(FrameFormat::HtMixed),
        "vht" => Ok(FrameFormat::Vht),
        "he_su" => Ok(FrameFormat::HeSu),
        "he_ext_su" => Ok(FrameFormat::HeExtSu),
        "he_mu" => Ok(FrameFormat::HeMu),
        other => Err(format!(
            "unknown frame format: {other} (use non_ht/ht/vht/he_su/he_ext_su/he_mu)"
        )),
    }
}

#[derive(Debug, Parser)]
#[command(name = "bss", about = "单 BSS 仿真：AP + N 个 STA 的 CBR 流量")]
struct Args {
    #[arg(long, default_value_t = 4)]
    stations: usize,
    /// STA 到 AP 的距离（米）
    #[arg(long, default_value_t = 10.0)]
    radius_m: f64,
    #[arg(long, default_value = "he_su", value_parser = parse_format)]
    format: FrameFormat,
    #[arg(long, default_value_t = 7)]
    mcs: u8,
    /// 接入类别：bk/be/vi/vo
    #[arg(long, default_value = "be")]
    ac: AccessCategory,
    #[arg(long, default_value_t = 1500)]
    packet_bytes: u32,
    /// 两个包注入间隔（微秒）
    #[arg(long, default_value_t = 1000)]
    interval_us: u64,
    /// 每条流的包数上限
    #[arg(long)]
    count: Option<u64>,
    /// 增加 STA -> AP 上行流
    #[arg(long)]
    uplink: bool,
    /// 关闭 AP -> STA 下行流
    #[arg(long)]
    no_downlink: bool,
    #[arg(long, default_value_t = 65_535)]
    rts_threshold: u32,
    /// A-MPDU 最大子帧数（non_ht 下强制为 1）
    #[arg(long, default_value_t = 64)]
    max_subframes: usize,
    #[arg(long, default_value_t = 64)]
    ba_window: u16,
    /// 使用 ARF 速率控制
    #[arg(long)]
    arf: bool,
    #[arg(long)]
    disable_ack: bool,
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// 仿真运行到多少毫秒
    #[arg(long, default_value_t = 100)]
    duration_ms: u64,
    /// Output viz JSON file
    #[arg(long)]
    viz_json: Option<PathBuf>,
}

fn main() -> Result<(), ConfigError> {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mac = MacConfig {
        frame_format: args.format,
        mcs: args.mcs,
        rts_threshold: args.rts_threshold,
        max_subframes: if args.format.supports_aggregation() {
            args.max_subframes
        } else {
            1
        },
        ba_window: args.ba_window,
        rate_control: if args.arf {
            RateControlKind::Arf
        } else {
            RateControlKind::Fixed
        },
        disable_ack: args.disable_ack,
        ..MacConfig::default()
    };
    let opts = BssOpts {
        stations: args.stations,
        radius_m: args.radius_m,
        mac,
        phy: PhyConfig::default(),
        seed: args.seed,
        ac: args.ac,
        packet_bytes: args.packet_bytes,
        interval: SimTime::from_micros(args.interval_us),
        count: args.count,
        downlink: !args.no_downlink,
        uplink: args.uplink,
    };

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    if args.viz_json.is_some() {
        world.viz = Some(VizLogger::default());
    }

    let bss = build_bss(&mut world, &mut sim, &opts)?;
    world.emit_viz_meta();
    info!(ap = ?bss.ap, stations = ?bss.stations, "构建 BSS 拓扑");

    sim.run(SimTime::from_millis(args.duration_ms), &mut world);

    println!("done @ {}", sim.now());
    for id in world.node_ids() {
        let name = world.node(id).map(|n| n.name().to_string()).unwrap_or_default();
        println!("node {id} ({name}): {}", world.stats.node(id));
    }
    println!(
        "total: {} loss_ratio={:.4}",
        world.stats.total(),
        world.stats.loss_ratio()
    );

    if let Some(path) = args.viz_json {
        if let Some(v) = world.viz.take() {
            fs::write(&path, v.to_json()?)?;
            eprintln!("wrote viz events to {}", path.display());
        }
    }
    Ok(())
}
