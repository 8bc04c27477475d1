use crate::mac::{AccessCategory, FrameType, MacEvent};
use crate::net::{MacAddress, NodeId, Stats};
use crate::sim::SimTime;

fn discarded(success: bool, count: usize) -> MacEvent {
    MacEvent::PacketsDiscarded {
        receiver: MacAddress::Unicast(NodeId(1)),
        ac: AccessCategory::BestEffort,
        success,
        count,
        bytes: 100 * count as u64,
        retry_count: 0,
    }
}

#[test]
fn records_tx_and_discards() {
    let mut stats = Stats::default();
    let n0 = NodeId(0);
    for retransmission in [false, true] {
        stats.record(
            n0,
            SimTime(10),
            &MacEvent::FrameTx {
                frame_type: FrameType::QosData,
                receiver: MacAddress::Unicast(NodeId(1)),
                ac: AccessCategory::BestEffort,
                mcs: 7,
                psdu_length: 130,
                airtime: SimTime(80),
                subframes: 1,
                retransmission,
            },
        );
    }
    stats.record(n0, SimTime(300), &discarded(true, 3));
    stats.record(n0, SimTime(400), &discarded(false, 1));
    stats.record(
        n0,
        SimTime(400),
        &MacEvent::QueueOverflow {
            receiver: MacAddress::Broadcast,
            ac: AccessCategory::Voice,
            packet_id: 4,
            length: 50,
        },
    );

    let s = stats.node(n0);
    assert_eq!(s.tx_frames, 2);
    assert_eq!(s.tx_data_frames, 2);
    assert_eq!(s.retransmissions, 1);
    assert_eq!(s.tx_airtime_us, 160);
    assert_eq!(s.acked_pkts, 3);
    assert_eq!(s.acked_bytes, 300);
    assert_eq!(s.failed_pkts, 1);
    assert_eq!(s.queue_overflows, 1);
    // (1 + 1) / (3 + 1 + 1)
    assert!((stats.loss_ratio() - 0.4).abs() < 1e-9);
}

#[test]
fn latency_is_measured_from_enqueue() {
    let mut stats = Stats::default();
    let n1 = NodeId(1);
    for (now, enqueued) in [(500, 100), (900, 300)] {
        stats.record(
            n1,
            SimTime(now),
            &MacEvent::DataRx {
                transmitter: NodeId(0),
                ac: AccessCategory::BestEffort,
                seq: 0,
                packet_id: 0,
                length: 100,
                enqueued_at: SimTime(enqueued),
            },
        );
    }
    let s = stats.node(n1);
    assert_eq!(s.rx_data_pkts, 2);
    assert_eq!(s.rx_data_bytes, 200);
    assert_eq!(s.mean_latency_us(), Some(500.0));
    assert!(s.to_string().ends_with("mean_latency_us=500.0"));
}

#[test]
fn totals_sum_over_nodes() {
    let mut stats = Stats::default();
    stats.record(NodeId(0), SimTime::ZERO, &MacEvent::RxError);
    stats.record(NodeId(2), SimTime::ZERO, &MacEvent::RxError);
    stats.record(
        NodeId(2),
        SimTime::ZERO,
        &MacEvent::Duplicate {
            transmitter: NodeId(0),
            ac: AccessCategory::BestEffort,
            seq: 1,
        },
    );
    let t = stats.total();
    assert_eq!(t.rx_errors, 2);
    assert_eq!(t.duplicates, 1);
    assert_eq!(stats.node(NodeId(7)).rx_errors, 0);
    assert_eq!(stats.loss_ratio(), 0.0);
    assert_eq!(t.mean_latency_us(), None);
}
