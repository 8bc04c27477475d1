//! MAC 配置与校验
//!
//! 所有字段都有默认值，JSON 只需写出要覆盖的字段。

use serde::{Deserialize, Serialize};

use super::ac::AccessCategory;
use crate::error::ConfigError;
use crate::phy::{Bandwidth, FrameFormat, PhyRate};
use crate::sim::SimTime;

/// 单个 AC 的 EDCA 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdcaParams {
    pub cw_min: u32,
    pub cw_max: u32,
    pub aifsn: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdcaTable {
    pub bk: EdcaParams,
    pub be: EdcaParams,
    pub vi: EdcaParams,
    pub vo: EdcaParams,
}

impl Default for EdcaTable {
    fn default() -> Self {
        Self {
            bk: EdcaParams {
                cw_min: 15,
                cw_max: 1023,
                aifsn: 7,
            },
            be: EdcaParams {
                cw_min: 15,
                cw_max: 1023,
                aifsn: 3,
            },
            vi: EdcaParams {
                cw_min: 7,
                cw_max: 15,
                aifsn: 2,
            },
            vo: EdcaParams {
                cw_min: 3,
                cw_max: 7,
                aifsn: 2,
            },
        }
    }
}

impl EdcaTable {
    pub fn get(&self, ac: AccessCategory) -> &EdcaParams {
        match ac {
            AccessCategory::Background => &self.bk,
            AccessCategory::BestEffort => &self.be,
            AccessCategory::Video => &self.vi,
            AccessCategory::Voice => &self.vo,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateControlKind {
    #[default]
    Fixed,
    Arf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacConfig {
    pub frame_format: FrameFormat,
    pub bandwidth: Bandwidth,
    pub num_spatial_streams: u8,
    /// 数据帧 MCS（ARF 下为起始 MCS 与上限）
    pub mcs: u8,
    /// 控制帧/广播使用的 non-HT MCS
    pub basic_rate_mcs: u8,
    pub rate_control: RateControlKind,
    /// PSDU 不小于该值的单播帧先发 RTS
    pub rts_threshold: u32,
    pub disable_ack: bool,
    pub max_subframes: usize,
    pub ba_window: u16,
    pub max_short_retries: u8,
    pub max_long_retries: u8,
    pub edca: EdcaTable,
    pub slot_time: SimTime,
    pub sifs: SimTime,
    /// 每个 (目的站, AC) 队列的包数上限
    pub max_queue_len: usize,
    /// 同时有待确认帧的目的站上限（每个 AC）
    pub max_dl_stations: usize,
    pub spatial_reuse: bool,
    pub bss_color: u8,
    pub tx_power_limited: bool,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            frame_format: FrameFormat::HeSu,
            bandwidth: Bandwidth::Mhz20,
            num_spatial_streams: 1,
            mcs: 7,
            basic_rate_mcs: 0,
            rate_control: RateControlKind::Fixed,
            rts_threshold: 65_535,
            disable_ack: false,
            max_subframes: 64,
            ba_window: 64,
            max_short_retries: 7,
            max_long_retries: 7,
            edca: EdcaTable::default(),
            slot_time: SimTime(9),
            sifs: SimTime(16),
            max_queue_len: 256,
            max_dl_stations: 8,
            spatial_reuse: false,
            bss_color: 0,
            tx_power_limited: false,
        }
    }
}

impl MacConfig {
    /// AIFS[AC] = SIFS + AIFSN × slot
    pub fn aifs(&self, ac: AccessCategory) -> SimTime {
        let aifsn = self.edca.get(ac).aifsn as u64;
        self.sifs.saturating_add(self.slot_time.saturating_mul(aifsn))
    }

    pub fn data_rate(&self) -> Result<PhyRate, ConfigError> {
        PhyRate::new(
            self.frame_format,
            self.bandwidth,
            self.mcs,
            self.num_spatial_streams,
        )
    }

    pub fn basic_rate(&self) -> Result<PhyRate, ConfigError> {
        PhyRate::non_ht(self.basic_rate_mcs)
    }

    /// 仿真开始前的完整校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        for ac in AccessCategory::ALL {
            let p = self.edca.get(ac);
            let valid_cw = |cw: u32| cw >= 1 && cw.checked_add(1).is_some_and(u32::is_power_of_two);
            if !valid_cw(p.cw_min) || !valid_cw(p.cw_max) || p.cw_min > p.cw_max {
                return Err(ConfigError::InvalidContentionWindow {
                    ac: ac.to_string(),
                    cw_min: p.cw_min,
                    cw_max: p.cw_max,
                });
            }
            if p.aifsn < 2 || p.aifsn > 15 {
                return Err(ConfigError::InvalidAifsn {
                    ac: ac.to_string(),
                    aifsn: p.aifsn,
                });
            }
        }
        if self.max_short_retries == 0 || self.max_long_retries == 0 {
            return Err(ConfigError::InvalidRetryLimit {
                short: self.max_short_retries,
                long: self.max_long_retries,
            });
        }
        match self.ba_window {
            64 => {}
            256 if self.frame_format.is_he() => {}
            other => return Err(ConfigError::InvalidBlockAckWindow(other)),
        }
        if self.max_subframes > 1 && !self.frame_format.supports_aggregation() {
            return Err(ConfigError::AggregationUnsupported {
                format: self.frame_format,
                max_subframes: self.max_subframes,
            });
        }
        for (field, zero) in [
            ("max_subframes", self.max_subframes == 0),
            ("max_queue_len", self.max_queue_len == 0),
            ("max_dl_stations", self.max_dl_stations == 0),
            ("slot_time", self.slot_time.is_zero()),
            ("sifs", self.sifs.is_zero()),
        ] {
            if zero {
                return Err(ConfigError::ZeroValue { field });
            }
        }
        if self.max_subframes > self.ba_window as usize {
            return Err(ConfigError::AggregationUnsupported {
                format: self.frame_format,
                max_subframes: self.max_subframes,
            });
        }
        if self.bss_color > 63 {
            return Err(ConfigError::InvalidBssColor(self.bss_color));
        }
        self.data_rate()?;
        self.basic_rate()?;
        Ok(())
    }
}
