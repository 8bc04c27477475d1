use crate::error::ConfigError;
use crate::mac::MacFrame;
use crate::net::{ChannelFrame, NodeId, Position};
use crate::phy::{
    AbstractPhy, Bandwidth, FrameFormat, PhyConfig, PhyIndication, PhyRate, PhyRequest,
    PhyRequestKind,
};
use crate::sim::SimTime;

fn channel_frame(src: usize, x: f64, duration: u64) -> ChannelFrame {
    ChannelFrame {
        source: NodeId(src),
        source_position: Position::new(x, 0.0, 0.0),
        frequency_id: 1,
        tx_power_dbm: 20.0,
        frame_format: FrameFormat::NonHt,
        bandwidth: Bandwidth::Mhz20,
        mcs: 0,
        duration: SimTime(duration),
        frame: MacFrame::ack(NodeId(src), NodeId(0), SimTime::ZERO),
    }
}

fn drain(phy: &mut AbstractPhy) -> Vec<PhyIndication> {
    std::iter::from_fn(|| phy.pop_indication()).collect()
}

fn start_request(psdu: u32) -> PhyRequest {
    PhyRequest {
        kind: PhyRequestKind::Start,
        bandwidth: Bandwidth::Mhz20,
        frame_format: FrameFormat::NonHt,
        num_spatial_streams: 1,
        mcs_per_user: vec![0],
        psdu_length_per_user: vec![psdu],
        tx_power_limited: false,
    }
}

#[test]
fn non_ht_durations() {
    let r6 = PhyRate::non_ht(0).unwrap();
    // 14 字节 Ack @ 6 Mb/s
    assert_eq!(r6.duration(14), SimTime(44));
    let r54 = PhyRate::non_ht(7).unwrap();
    assert_eq!(r54.ndbps(), 216);
    assert_eq!(r54.duration(1536), SimTime(248));
}

#[test]
fn ht_and_he_durations() {
    let ht = PhyRate::new(FrameFormat::HtMixed, Bandwidth::Mhz20, 7, 1).unwrap();
    assert_eq!(ht.ndbps(), 260);
    assert_eq!(ht.duration(1536), SimTime(228));

    let he = PhyRate::new(FrameFormat::HeSu, Bandwidth::Mhz20, 0, 1).unwrap();
    assert_eq!(he.ndbps(), 117);
    assert_eq!(he.duration(100), SimTime(152));
}

#[test]
fn unsupported_rates_are_rejected() {
    let cases = [
        (FrameFormat::Vht, Bandwidth::Mhz20, 9, 1),
        (FrameFormat::HtMixed, Bandwidth::Mhz80, 0, 1),
        (FrameFormat::NonHt, Bandwidth::Mhz20, 0, 2),
        (FrameFormat::NonHt, Bandwidth::Mhz20, 8, 1),
        (FrameFormat::HeExtSu, Bandwidth::Mhz40, 0, 1),
        (FrameFormat::HeSu, Bandwidth::Mhz20, 0, 0),
    ];
    for (format, bw, mcs, nss) in cases {
        let err = PhyRate::new(format, bw, mcs, nss).unwrap_err();
        assert!(
            matches!(err, ConfigError::UnsupportedRate { .. }),
            "{format:?} {bw:?} mcs={mcs} nss={nss}"
        );
    }
}

#[test]
fn clean_reception_yields_rx_end_then_idle() {
    let mut phy = AbstractPhy::new(NodeId(0), PhyConfig::default());
    phy.receive(Position::default(), &channel_frame(1, 10.0, 50));
    let ind = drain(&mut phy);
    assert_eq!(ind.len(), 2);
    assert_eq!(ind[0], PhyIndication::CcaBusy);
    assert!(matches!(ind[1], PhyIndication::RxStart(_)));
    assert!(phy.is_cca_busy());
    assert_eq!(phy.next_invoke(), Some(SimTime(50)));

    phy.advance(SimTime(30));
    assert!(drain(&mut phy).is_empty());
    phy.advance(SimTime(20));
    let ind = drain(&mut phy);
    assert!(matches!(ind[0], PhyIndication::RxEnd(_)));
    assert_eq!(ind[1], PhyIndication::CcaIdle);
    assert!(!phy.is_cca_busy());
}

#[test]
fn overlap_corrupts_the_decoded_frame() {
    let mut phy = AbstractPhy::new(NodeId(0), PhyConfig::default());
    phy.receive(Position::default(), &channel_frame(1, 10.0, 50));
    drain(&mut phy);
    phy.advance(SimTime(10));
    phy.receive(Position::default(), &channel_frame(2, 5.0, 60));
    // 第二个信号不会被解码
    assert!(drain(&mut phy).is_empty());

    phy.advance(SimTime(40));
    assert_eq!(drain(&mut phy), vec![PhyIndication::RxError]);
    assert!(phy.is_cca_busy());
    phy.advance(SimTime(30));
    assert_eq!(drain(&mut phy), vec![PhyIndication::CcaIdle]);
}

#[test]
fn weak_or_foreign_signals_are_ignored() {
    let mut phy = AbstractPhy::new(NodeId(0), PhyConfig::default());
    phy.receive(Position::default(), &channel_frame(1, 1000.0, 50));
    let mut other_channel = channel_frame(2, 10.0, 50);
    other_channel.frequency_id = 6;
    phy.receive(Position::default(), &other_channel);
    assert!(drain(&mut phy).is_empty());
    assert_eq!(phy.next_invoke(), None);
}

#[test]
fn transmit_requires_start_request() {
    let mut phy = AbstractPhy::new(NodeId(3), PhyConfig::default());
    let frame = MacFrame::ack(NodeId(3), NodeId(0), SimTime::ZERO);
    assert!(phy.transmit(Position::default(), frame.clone()).is_none());

    phy.request(start_request(14));
    assert_eq!(drain(&mut phy), vec![PhyIndication::TxStartConfirm]);
    assert!(phy.is_transmitting());
    let cf = phy.transmit(Position::default(), frame).unwrap();
    assert_eq!(cf.source, NodeId(3));
    assert_eq!(cf.duration, SimTime(44));

    phy.request(PhyRequest {
        kind: PhyRequestKind::End,
        ..start_request(14)
    });
    assert_eq!(drain(&mut phy), vec![PhyIndication::TxEndConfirm]);
    assert!(!phy.is_transmitting());
}

#[test]
fn path_loss_is_clamped_below_one_metre() {
    let cfg = PhyConfig::default();
    assert_eq!(cfg.rx_power_dbm(20.0, 0.1), cfg.rx_power_dbm(20.0, 1.0));
    let at_10 = cfg.rx_power_dbm(20.0, 10.0);
    assert!((at_10 - (20.0 - 46.7 - 30.0)).abs() < 1e-9);
}
