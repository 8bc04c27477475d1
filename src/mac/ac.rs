//! EDCA 接入类别

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 四个接入类别，按优先级从低到高排列（`Ord` 即优先级）。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AccessCategory {
    #[serde(rename = "bk", alias = "background")]
    Background = 0,
    #[default]
    #[serde(rename = "be", alias = "best_effort")]
    BestEffort = 1,
    #[serde(rename = "vi", alias = "video")]
    Video = 2,
    #[serde(rename = "vo", alias = "voice")]
    Voice = 3,
}

impl AccessCategory {
    pub const ALL: [AccessCategory; 4] = [
        AccessCategory::Background,
        AccessCategory::BestEffort,
        AccessCategory::Video,
        AccessCategory::Voice,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// 802.1D 用户优先级 -> AC
    pub fn from_tid(tid: u8) -> AccessCategory {
        match tid & 0x7 {
            1 | 2 => AccessCategory::Background,
            0 | 3 => AccessCategory::BestEffort,
            4 | 5 => AccessCategory::Video,
            _ => AccessCategory::Voice,
        }
    }

    /// 该 AC 默认使用的 TID
    pub fn tid(self) -> u8 {
        match self {
            AccessCategory::Background => 1,
            AccessCategory::BestEffort => 0,
            AccessCategory::Video => 5,
            AccessCategory::Voice => 6,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            AccessCategory::Background => "bk",
            AccessCategory::BestEffort => "be",
            AccessCategory::Video => "vi",
            AccessCategory::Voice => "vo",
        }
    }
}

impl fmt::Display for AccessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for AccessCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bk" | "background" => Ok(AccessCategory::Background),
            "be" | "best_effort" => Ok(AccessCategory::BestEffort),
            "vi" | "video" => Ok(AccessCategory::Video),
            "vo" | "voice" => Ok(AccessCategory::Voice),
            other => Err(format!("unknown access category: {other} (use bk/be/vi/vo)")),
        }
    }
}
