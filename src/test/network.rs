//! 端到端：调度器 + NetWorld + 节点 + 信道

use crate::mac::{AccessCategory, MacConfig, MacState};
use crate::net::{MacAddress, NetWorld, NodeId, Position};
use crate::phy::PhyConfig;
use crate::sim::{SimTime, Simulator};
use crate::topo::bss::{BssOpts, build_bss};
use crate::topo::wlan_node;
use crate::traffic::CbrSource;
use crate::viz::{VizEventKind, VizLogger};

fn add(world: &mut NetWorld, id: usize, x: f64, mac: MacConfig) {
    let node = wlan_node(
        NodeId(id),
        format!("n{id}"),
        Position::new(x, 0.0, 0.0),
        mac,
        PhyConfig::default(),
        7,
    )
    .unwrap();
    world.add_node(Box::new(node)).unwrap();
}

fn flow(src: usize, dst: MacAddress, count: u64) -> CbrSource {
    CbrSource {
        src: NodeId(src),
        dst,
        ac: AccessCategory::BestEffort,
        packet_bytes: 1000,
        remaining: Some(count),
    }
}

#[test]
fn single_frame_is_delivered_and_acked() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    world.viz = Some(VizLogger::default());
    add(&mut world, 0, 0.0, MacConfig::default());
    add(&mut world, 1, 10.0, MacConfig::default());

    flow(0, MacAddress::Unicast(NodeId(1)), 1).schedule(
        &mut sim,
        SimTime::ZERO,
        SimTime::from_micros(100),
    );
    sim.run(SimTime::from_millis(5), &mut world);

    let tx = world.stats.node(NodeId(0));
    let rx = world.stats.node(NodeId(1));
    assert_eq!(tx.acked_pkts, 1);
    assert_eq!(tx.acked_bytes, 1000);
    assert_eq!(tx.failed_pkts, 0);
    assert_eq!(tx.retransmissions, 0);
    assert_eq!(rx.rx_data_pkts, 1);
    assert_eq!(rx.rx_data_bytes, 1000);
    // 数据帧 + Ack
    assert_eq!(world.stats.total().tx_frames, 2);
    assert_eq!(world.mac(NodeId(0)).unwrap().state(), MacState::Idle);

    let viz = world.viz.as_ref().unwrap();
    let delivered: Vec<u64> = viz
        .events
        .iter()
        .filter_map(|e| match &e.kind {
            VizEventKind::DataRx { latency_us, .. } => Some(*latency_us),
            _ => None,
        })
        .collect();
    assert_eq!(delivered.len(), 1);
    // 至少要等 AIFS
    assert!(delivered[0] >= 43);
}

#[test]
fn out_of_range_receiver_exhausts_retries() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    add(&mut world, 0, 0.0, MacConfig::default());
    add(&mut world, 1, 500.0, MacConfig::default());

    flow(0, MacAddress::Unicast(NodeId(1)), 1).schedule(
        &mut sim,
        SimTime::ZERO,
        SimTime::from_micros(100),
    );
    sim.run(SimTime::from_millis(100), &mut world);

    let tx = world.stats.node(NodeId(0));
    assert_eq!(tx.failed_pkts, 1);
    assert_eq!(tx.tx_data_frames, 7);
    assert_eq!(tx.retransmissions, 6);
    assert_eq!(world.stats.node(NodeId(1)).rx_frames, 0);
    assert!((world.stats.loss_ratio() - 1.0).abs() < 1e-9);
}

#[test]
fn broadcast_reaches_every_station() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let opts = BssOpts {
        stations: 3,
        downlink: false,
        ..BssOpts::default()
    };
    let bss = build_bss(&mut world, &mut sim, &opts).unwrap();
    flow(0, MacAddress::Broadcast, 5).schedule(
        &mut sim,
        SimTime::ZERO,
        SimTime::from_millis(1),
    );
    sim.run(SimTime::from_millis(20), &mut world);

    for sta in bss.stations {
        assert_eq!(world.stats.node(sta).rx_data_pkts, 5, "{sta}");
    }
    let ap = world.stats.node(bss.ap);
    assert_eq!(ap.acked_pkts, 5);
    // 广播不需要确认
    assert_eq!(world.stats.total().tx_frames, 5);
}

#[test]
fn bss_downlink_and_uplink_deliver_traffic() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let opts = BssOpts {
        stations: 4,
        uplink: true,
        interval: SimTime::from_micros(2000),
        ..BssOpts::default()
    };
    let bss = build_bss(&mut world, &mut sim, &opts).unwrap();
    sim.run(SimTime::from_millis(50), &mut world);

    let total = world.stats.total();
    assert!(total.acked_pkts > 0);
    // 每个被确认的包都已交付（重复交付会被过滤）
    assert!(total.rx_data_pkts >= total.acked_pkts);
    assert!(world.stats.node(bss.ap).rx_data_pkts > 0);
    for sta in &bss.stations {
        assert!(world.stats.node(*sta).rx_data_pkts > 0, "{sta}");
    }
}

#[test]
fn aggregation_packs_backlog_into_one_exchange() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    add(&mut world, 0, 0.0, MacConfig::default());
    add(&mut world, 1, 10.0, MacConfig::default());

    // 同一时刻注入 8 个包
    for _ in 0..8 {
        let pkt = world.make_packet(
            NodeId(0),
            MacAddress::Unicast(NodeId(1)),
            AccessCategory::BestEffort,
            500,
            SimTime::ZERO,
        );
        assert!(world.enqueue(pkt).is_ok());
    }
    sim.run(SimTime::from_millis(5), &mut world);

    let tx = world.stats.node(NodeId(0));
    assert_eq!(tx.acked_pkts, 8);
    assert_eq!(tx.tx_data_frames, 1);
    assert_eq!(world.stats.node(NodeId(1)).rx_data_pkts, 8);
}

#[test]
fn hidden_stations_collide_at_the_ap() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let mac = MacConfig {
        max_subframes: 1,
        ..MacConfig::default()
    };
    add(&mut world, 0, 0.0, mac.clone());
    // 两个 STA 相距 120 米，互相听不到
    add(&mut world, 1, -60.0, mac.clone());
    add(&mut world, 2, 60.0, mac);

    for sta in [1, 2] {
        CbrSource {
            src: NodeId(sta),
            dst: MacAddress::Unicast(NodeId(0)),
            ac: AccessCategory::BestEffort,
            packet_bytes: 1500,
            remaining: None,
        }
        .schedule(&mut sim, SimTime::ZERO, SimTime::from_micros(300));
    }
    sim.run(SimTime::from_millis(50), &mut world);

    let ap = world.stats.node(NodeId(0));
    assert!(ap.rx_errors > 0);
    assert!(ap.rx_data_pkts > 0);
    assert!(world.stats.total().retransmissions > 0);
}

#[test]
fn same_seed_gives_identical_statistics() {
    let run = || {
        let mut sim = Simulator::default();
        let mut world = NetWorld::default();
        let opts = BssOpts {
            stations: 3,
            uplink: true,
            seed: 42,
            ..BssOpts::default()
        };
        build_bss(&mut world, &mut sim, &opts).unwrap();
        sim.run(SimTime::from_millis(30), &mut world);
        serde_json::to_string(&world.stats).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn duplicate_node_is_rejected() {
    let mut world = NetWorld::default();
    add(&mut world, 0, 0.0, MacConfig::default());
    let dup = wlan_node(
        NodeId(0),
        "again",
        Position::default(),
        MacConfig::default(),
        PhyConfig::default(),
        1,
    )
    .unwrap();
    assert!(matches!(
        world.add_node(Box::new(dup)),
        Err(crate::error::ConfigError::DuplicateNode(0))
    ));
}
