use crate::error::ConfigError;
use crate::mac::{AccessCategory, EdcaMac, EdcaParams, MacConfig};
use crate::net::NodeId;
use crate::phy::FrameFormat;
use crate::sim::SimTime;

#[test]
fn default_config_is_valid() {
    let cfg = MacConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.aifs(AccessCategory::BestEffort), SimTime(43));
    assert_eq!(cfg.aifs(AccessCategory::Background), SimTime(79));
    assert_eq!(cfg.aifs(AccessCategory::Voice), SimTime(34));
}

#[test]
fn contention_window_must_be_power_of_two_minus_one() {
    let mut cfg = MacConfig::default();
    cfg.edca.be = EdcaParams {
        cw_min: 16,
        cw_max: 1023,
        aifsn: 3,
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::InvalidContentionWindow { cw_min: 16, .. })
    ));

    cfg.edca.be = EdcaParams {
        cw_min: 31,
        cw_max: 15,
        aifsn: 3,
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::InvalidContentionWindow { .. })
    ));

    // u32::MAX + 1 不可表示，按非法处理而不是溢出
    cfg.edca.be = MacConfig::default().edca.be;
    cfg.edca.bk = EdcaParams {
        cw_min: u32::MAX,
        cw_max: u32::MAX,
        aifsn: 7,
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::InvalidContentionWindow { cw_min, .. }) if cw_min == u32::MAX
    ));

    let cfg: MacConfig = serde_json::from_str(r#"{"edca": {"vi": {"cw_min": 7, "cw_max": 4294967295, "aifsn": 2}}}"#)
        .expect("partial config");
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::InvalidContentionWindow { .. })
    ));
}

#[test]
fn aifsn_and_retry_limits_are_checked() {
    let mut cfg = MacConfig::default();
    cfg.edca.vo.aifsn = 1;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::InvalidAifsn { aifsn: 1, .. })
    ));

    let cfg = MacConfig {
        max_long_retries: 0,
        ..MacConfig::default()
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::InvalidRetryLimit { long: 0, .. })
    ));
}

#[test]
fn block_ack_window_depends_on_format() {
    let he = MacConfig {
        ba_window: 256,
        ..MacConfig::default()
    };
    he.validate().unwrap();

    let vht = MacConfig {
        frame_format: FrameFormat::Vht,
        ba_window: 256,
        ..MacConfig::default()
    };
    assert!(matches!(
        vht.validate(),
        Err(ConfigError::InvalidBlockAckWindow(256))
    ));

    let odd = MacConfig {
        ba_window: 128,
        ..MacConfig::default()
    };
    assert!(matches!(
        odd.validate(),
        Err(ConfigError::InvalidBlockAckWindow(128))
    ));
}

#[test]
fn aggregation_requires_capable_format() {
    let cfg = MacConfig {
        frame_format: FrameFormat::NonHt,
        ..MacConfig::default()
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::AggregationUnsupported {
            format: FrameFormat::NonHt,
            max_subframes: 64
        })
    ));

    let cfg = MacConfig {
        frame_format: FrameFormat::NonHt,
        max_subframes: 1,
        ..MacConfig::default()
    };
    cfg.validate().unwrap();
}

#[test]
fn zero_values_and_bss_color() {
    let cfg = MacConfig {
        max_queue_len: 0,
        ..MacConfig::default()
    };
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::ZeroValue {
            field: "max_queue_len"
        })
    ));

    let cfg = MacConfig {
        bss_color: 64,
        ..MacConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBssColor(64))));
}

#[test]
fn unsupported_data_rate_fails_mac_construction() {
    let cfg = MacConfig {
        mcs: 12,
        ..MacConfig::default()
    };
    assert!(matches!(
        EdcaMac::new(NodeId(0), cfg, 1),
        Err(ConfigError::UnsupportedRate { mcs: 12, .. })
    ));
}

#[test]
fn partial_json_keeps_defaults() {
    let cfg: MacConfig =
        serde_json::from_str(r#"{"mcs": 3, "edca": {"vo": {"cw_min": 1, "cw_max": 3, "aifsn": 2}}}"#)
            .unwrap();
    assert_eq!(cfg.mcs, 3);
    assert_eq!(cfg.edca.vo.cw_min, 1);
    assert_eq!(cfg.edca.be, MacConfig::default().edca.be);
    assert_eq!(cfg.sifs, SimTime(16));
    cfg.validate().unwrap();
}
