//! PHY 请求/指示消息类型

use serde::{Deserialize, Serialize};

use crate::mac::MacFrame;

/// 帧格式（有限集合，穷尽匹配）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    NonHt,
    HtMixed,
    Vht,
    HeSu,
    HeExtSu,
    HeMu,
}

impl FrameFormat {
    /// 是否支持 A-MPDU 聚合
    pub fn supports_aggregation(self) -> bool {
        !matches!(self, FrameFormat::NonHt)
    }

    pub fn is_he(self) -> bool {
        matches!(
            self,
            FrameFormat::HeSu | FrameFormat::HeExtSu | FrameFormat::HeMu
        )
    }

    /// 该格式的最大 MCS 索引
    pub fn max_mcs(self) -> u8 {
        match self {
            FrameFormat::NonHt | FrameFormat::HtMixed => 7,
            FrameFormat::Vht => 9,
            FrameFormat::HeSu | FrameFormat::HeMu => 11,
            FrameFormat::HeExtSu => 2,
        }
    }
}

/// 信道带宽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bandwidth {
    #[serde(rename = "cbw20")]
    Mhz20,
    #[serde(rename = "cbw40")]
    Mhz40,
    #[serde(rename = "cbw80")]
    Mhz80,
    #[serde(rename = "cbw160")]
    Mhz160,
}

impl Bandwidth {
    pub fn mhz(self) -> u32 {
        match self {
            Bandwidth::Mhz20 => 20,
            Bandwidth::Mhz40 => 40,
            Bandwidth::Mhz80 => 80,
            Bandwidth::Mhz160 => 160,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyRequestKind {
    Start,
    End,
}

/// MAC -> PHY 请求
#[derive(Debug, Clone, PartialEq)]
pub struct PhyRequest {
    pub kind: PhyRequestKind,
    pub bandwidth: Bandwidth,
    pub frame_format: FrameFormat,
    pub num_spatial_streams: u8,
    pub mcs_per_user: Vec<u8>,
    pub psdu_length_per_user: Vec<u32>,
    /// 空间复用下的发射功率受限标记（功率计算在 PHY 外部）
    pub tx_power_limited: bool,
}

impl PhyRequest {
    pub fn is_start(&self) -> bool {
        self.kind == PhyRequestKind::Start
    }
}

/// RxStart 指示携带的 PHY 头信息
#[derive(Debug, Clone, PartialEq)]
pub struct RxVector {
    pub psdu_length: u32,
    pub mcs: u8,
    pub frame_format: FrameFormat,
    pub aggregated: bool,
    pub bandwidth: Bandwidth,
    pub rssi_dbm: f64,
}

/// PHY -> MAC 指示
#[derive(Debug, Clone, PartialEq)]
pub enum PhyIndication {
    CcaIdle,
    CcaBusy,
    RxStart(RxVector),
    RxEnd(Box<MacFrame>),
    RxError,
    TxStartConfirm,
    TxEndConfirm,
    Unknown,
}
