//! 序列号（模 4096）

use std::collections::BTreeMap;

use super::ac::AccessCategory;
use crate::net::MacAddress;

pub const SEQ_MODULO: u16 = 4096;
/// 模空间的一半：距离 ≥ 该值视为“在后面”
pub const SEQ_HALF: u16 = SEQ_MODULO / 2;

pub fn seq_add(seq: u16, n: u16) -> u16 {
    ((seq as u32 + n as u32) % SEQ_MODULO as u32) as u16
}

/// 从 `from` 向前走到 `to` 的距离（模 4096）
pub fn seq_sub(to: u16, from: u16) -> u16 {
    ((to as u32 + SEQ_MODULO as u32 - (from % SEQ_MODULO) as u32) % SEQ_MODULO as u32) as u16
}

/// 每个 (目的地址, AC) 独立递增的序列号分配器
#[derive(Debug, Default)]
pub struct SequenceNumbers {
    next: BTreeMap<(MacAddress, AccessCategory), u16>,
}

impl SequenceNumbers {
    /// 分配下一个序列号
    pub fn next(&mut self, dst: MacAddress, ac: AccessCategory) -> u16 {
        let slot = self.next.entry((dst, ac)).or_insert(0);
        let seq = *slot;
        *slot = seq_add(seq, 1);
        seq
    }

    /// 下一个将被分配的序列号（不消耗）
    pub fn peek(&self, dst: MacAddress, ac: AccessCategory) -> u16 {
        self.next.get(&(dst, ac)).copied().unwrap_or(0)
    }

    pub fn set_next(&mut self, dst: MacAddress, ac: AccessCategory, seq: u16) {
        self.next.insert((dst, ac), seq % SEQ_MODULO);
    }
}
