//! PPDU 时长模型
//!
//! 时长 = 前导码(格式, 带宽, 空间流) + N_sym × T_sym，
//! 其中 N_sym = ceil((16 + 8·PSDU + 6) / N_DBPS)。

use super::types::{Bandwidth, FrameFormat};
use crate::error::ConfigError;
use crate::sim::SimTime;

/// 接收端检测到 PHY 头所需的时间（用于响应超时与 NAV 复位）
pub const RX_PHY_START_DELAY: SimTime = SimTime(20);

const SERVICE_BITS: u64 = 16;
const TAIL_BITS: u64 = 6;

/// non-HT 6..54 Mb/s 每符号数据比特数
const NON_HT_NDBPS: [u64; 8] = [24, 36, 48, 72, 96, 144, 192, 216];

/// (每子载波比特数, 码率分子, 码率分母)，索引即 MCS
const MODULATION: [(u64, u64, u64); 12] = [
    (1, 1, 2),
    (2, 1, 2),
    (2, 3, 4),
    (4, 1, 2),
    (4, 3, 4),
    (6, 2, 3),
    (6, 3, 4),
    (6, 5, 6),
    (8, 3, 4),
    (8, 5, 6),
    (10, 3, 4),
    (10, 5, 6),
];

/// 经过校验的 (格式, 带宽, MCS, 空间流) 组合。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyRate {
    pub format: FrameFormat,
    pub bandwidth: Bandwidth,
    pub mcs: u8,
    pub nss: u8,
    ndbps: u64,
    symbol_ns: u64,
    preamble_ns: u64,
}

impl PhyRate {
    /// 校验并构造速率；不支持的组合返回 `ConfigError::UnsupportedRate`。
    pub fn new(
        format: FrameFormat,
        bandwidth: Bandwidth,
        mcs: u8,
        nss: u8,
    ) -> Result<PhyRate, ConfigError> {
        let unsupported = || ConfigError::UnsupportedRate {
            format,
            bandwidth,
            mcs,
            nss,
        };
        if mcs > format.max_mcs() || nss == 0 || nss > 4 {
            return Err(unsupported());
        }
        let n_ltf = ltf_count(nss);

        let (ndbps, symbol_ns, preamble_ns) = match format {
            FrameFormat::NonHt => {
                if nss != 1 {
                    return Err(unsupported());
                }
                // 宽带宽下按 non-HT duplicate 处理，速率与 20 MHz 相同
                (NON_HT_NDBPS[mcs as usize], 4_000, 20_000)
            }
            FrameFormat::HtMixed => {
                let n_sd = match bandwidth {
                    Bandwidth::Mhz20 => 52,
                    Bandwidth::Mhz40 => 108,
                    _ => return Err(unsupported()),
                };
                let ndbps = exact_ndbps(n_sd, mcs, nss).ok_or_else(unsupported)?;
                (ndbps, 4_000, 32_000 + 4_000 * n_ltf)
            }
            FrameFormat::Vht => {
                let n_sd = vht_data_subcarriers(bandwidth);
                let ndbps = exact_ndbps(n_sd, mcs, nss).ok_or_else(unsupported)?;
                (ndbps, 4_000, 36_000 + 4_000 * n_ltf)
            }
            FrameFormat::HeSu | FrameFormat::HeMu => {
                let n_sd = he_data_subcarriers(bandwidth);
                let ndbps = exact_ndbps(n_sd, mcs, nss).ok_or_else(unsupported)?;
                let sig_b = if format == FrameFormat::HeMu { 4_000 } else { 0 };
                (ndbps, 13_600, 36_000 + sig_b + 7_200 * n_ltf)
            }
            FrameFormat::HeExtSu => {
                if bandwidth != Bandwidth::Mhz20 || nss != 1 {
                    return Err(unsupported());
                }
                let ndbps = exact_ndbps(he_data_subcarriers(bandwidth), mcs, nss)
                    .ok_or_else(unsupported)?;
                // HE-SIG-A 重复一次
                (ndbps, 13_600, 44_000 + 7_200 * n_ltf)
            }
        };

        Ok(PhyRate {
            format,
            bandwidth,
            mcs,
            nss,
            ndbps,
            symbol_ns,
            preamble_ns,
        })
    }

    /// 控制帧/广播使用的 non-HT 基本速率
    pub fn non_ht(mcs: u8) -> Result<PhyRate, ConfigError> {
        PhyRate::new(FrameFormat::NonHt, Bandwidth::Mhz20, mcs, 1)
    }

    /// 每符号数据比特数
    pub fn ndbps(&self) -> u64 {
        self.ndbps
    }

    /// 发送 `psdu_length` 字节的 PPDU 所需时间（向上取整到微秒）
    pub fn duration(&self, psdu_length: u32) -> SimTime {
        let bits = SERVICE_BITS + 8 * psdu_length as u64 + TAIL_BITS;
        let n_sym = bits.div_ceil(self.ndbps);
        let ns = self.preamble_ns + n_sym * self.symbol_ns;
        SimTime(ns.div_ceil(1_000))
    }
}

fn ltf_count(nss: u8) -> u64 {
    match nss {
        1 => 1,
        2 => 2,
        _ => 4,
    }
}

fn vht_data_subcarriers(bw: Bandwidth) -> u64 {
    match bw {
        Bandwidth::Mhz20 => 52,
        Bandwidth::Mhz40 => 108,
        Bandwidth::Mhz80 => 234,
        Bandwidth::Mhz160 => 468,
    }
}

fn he_data_subcarriers(bw: Bandwidth) -> u64 {
    match bw {
        Bandwidth::Mhz20 => 234,
        Bandwidth::Mhz40 => 468,
        Bandwidth::Mhz80 => 980,
        Bandwidth::Mhz160 => 1960,
    }
}

/// N_DBPS 必须为整数，否则该组合在标准中无效（例如 VHT 20 MHz MCS 9 单流）。
fn exact_ndbps(n_sd: u64, mcs: u8, nss: u8) -> Option<u64> {
    let (bits, num, den) = *MODULATION.get(mcs as usize)?;
    let raw = n_sd * bits * nss as u64 * num;
    (raw % den == 0).then_some(raw / den)
}
