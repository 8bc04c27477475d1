//! 配置错误
//!
//! 仿真循环开始前的所有校验失败都归入 `ConfigError`；循环内部不返回错误。

use crate::phy::{Bandwidth, FrameFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported rate: {format:?} {bandwidth:?} MCS {mcs} with {nss} spatial stream(s)")]
    UnsupportedRate {
        format: FrameFormat,
        bandwidth: Bandwidth,
        mcs: u8,
        nss: u8,
    },
    #[error("invalid contention window for {ac}: cw_min={cw_min}, cw_max={cw_max}")]
    InvalidContentionWindow { ac: String, cw_min: u32, cw_max: u32 },
    #[error("invalid AIFSN {aifsn} for {ac}")]
    InvalidAifsn { ac: String, aifsn: u8 },
    #[error("retry limit must be at least 1 (short={short}, long={long})")]
    InvalidRetryLimit { short: u8, long: u8 },
    #[error("block-ack window must be 64 or 256 (256 requires an HE format), got {0}")]
    InvalidBlockAckWindow(u16),
    #[error("aggregation of {max_subframes} subframes is not supported by {format:?}")]
    AggregationUnsupported {
        format: FrameFormat,
        max_subframes: usize,
    },
    #[error("{field} must be non-zero")]
    ZeroValue { field: &'static str },
    #[error("packet of {bytes} bytes exceeds the maximum MSDU size of {max} bytes")]
    PacketTooLarge { bytes: u32, max: u32 },
    #[error("traffic from node {0} is addressed to itself")]
    SelfAddressed(usize),
    #[error("BSS color must be in 0..=63, got {0}")]
    InvalidBssColor(u8),
    #[error("duplicate node id {0}")]
    DuplicateNode(usize),
    #[error("unknown node id {0}")]
    UnknownNode(usize),
    #[error("unsupported scenario schema version {0}")]
    UnsupportedSchema(u32),
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
}
