//! 场景文件仿真
//!
//! 读取 scenario.json，构建节点与流量并运行到指定时长。

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use wlansim_rs::error::ConfigError;
use wlansim_rs::net::NetWorld;
use wlansim_rs::sim::{SimTime, Simulator};
use wlansim_rs::topo::scenario::{build_from_spec, load_scenario};
use wlansim_rs::viz::VizLogger;

#[derive(Debug, Parser)]
#[command(name = "wlan-sim", about = "Run scenario.json on the 802.11 EDCA simulator")]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Output viz JSON file
    #[arg(long)]
    viz_json: Option<PathBuf>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the scenario duration (ms)
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Print the statistics as JSON instead of text lines
    #[arg(long)]
    json: bool,
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

    let mut spec = load_scenario(&args.scenario)?;
    if let Some(seed) = args.seed {
        spec.seed = seed;
    }
    if let Some(ms) = args.duration_ms {
        spec.duration_ms = ms;
    }

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    if args.viz_json.is_some() {
        world.viz = Some(VizLogger::default());
    }

    let duration = build_from_spec(&spec, &mut world, &mut sim)?;
    world.emit_viz_meta();

    info!(seed = spec.seed, %duration, "开始仿真");
    sim.run(duration, &mut world);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&world.stats)?);
    } else {
        print_summary(&world, sim.now());
    }

    if let Some(path) = args.viz_json {
        if let Some(v) = world.viz.take() {
            fs::write(&path, v.to_json()?)?;
            eprintln!("wrote viz events to {}", path.display());
        }
    }
    Ok(())
}

fn print_summary(world: &NetWorld, now: SimTime) {
    println!("done @ {now}");
    for id in world.node_ids() {
        let name = world.node(id).map(|n| n.name().to_string()).unwrap_or_default();
        println!("node {id} ({name}): {}", world.stats.node(id));
    }
    println!(
        "total: {} loss_ratio={:.4}",
        world.stats.total(),
        world.stats.loss_ratio()
    );
}
