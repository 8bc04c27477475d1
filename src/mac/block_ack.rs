//! Block-Ack 接收窗口
//!
//! 每个 (源, AC) 维护一个 (SSN, 位图)。位 i 对应序列号 `SSN + i (mod 4096)`。
//! 窗口只会向前滑动：已置位的序列号不会因为之后的旧窗口更新而被清除。

use super::seqnum::{SEQ_HALF, seq_add, seq_sub};

/// 定长位图（64 或 256 位）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaBitmap {
    words: Vec<u64>,
    len: u16,
}

impl BaBitmap {
    pub fn new(len: u16) -> Self {
        let words = (len as usize).div_ceil(64);
        Self {
            words: vec![0; words],
            len,
        }
    }

    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 编码后的字节数
    pub fn byte_len(&self) -> u32 {
        (self.len as u32).div_ceil(8)
    }

    pub fn get(&self, bit: u16) -> bool {
        if bit >= self.len {
            return false;
        }
        (self.words[bit as usize / 64] >> (bit % 64)) & 1 == 1
    }

    pub fn set(&mut self, bit: u16) {
        if bit < self.len {
            self.words[bit as usize / 64] |= 1 << (bit % 64);
        }
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// 窗口前移 `n` 位：位 i 移到 i-n，最低 n 位被丢弃
    pub fn shift_down(&mut self, n: u16) {
        if n == 0 {
            return;
        }
        if n >= self.len {
            self.clear();
            return;
        }
        let len = self.len;
        for i in 0..len {
            let src = i + n;
            let v = src < len && self.get(src);
            let w = &mut self.words[i as usize / 64];
            if v {
                *w |= 1 << (i % 64);
            } else {
                *w &= !(1 << (i % 64));
            }
        }
    }

    /// 所有置位的位下标
    pub fn ones(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.len).filter(|&i| self.get(i))
    }
}

/// 一个 (源, AC) 的接收记分板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaRecord {
    pub ssn: u16,
    pub bitmap: BaBitmap,
}

impl BaRecord {
    pub fn new(ssn: u16, window: u16) -> Self {
        Self {
            ssn,
            bitmap: BaBitmap::new(window),
        }
    }

    pub fn window(&self) -> u16 {
        self.bitmap.len()
    }

    /// 该序列号是否已被确认。落在窗口之后（半个模空间以内）的视为早已确认。
    pub fn is_acked(&self, seq: u16) -> bool {
        let d = seq_sub(seq, self.ssn);
        if d < self.window() {
            self.bitmap.get(d)
        } else {
            d >= SEQ_HALF
        }
    }

    /// 窗口内置位的序列号
    pub fn acked_seqs(&self) -> Vec<u16> {
        self.bitmap.ones().map(|i| seq_add(self.ssn, i)).collect()
    }
}

/// 一次位图更新的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaUpdate {
    /// 落在窗口之后的序列号个数（重复）
    pub stale: usize,
    /// 窗口前移的位数
    pub shifted: u16,
}

/// 用新收到的序列号更新记分板。
///
/// - 窗口之后（半模空间内）的序列号：计为重复，不改变状态；
/// - 超出窗口的序列号：窗口前移到 `max(seq) - window + 1`，
///   前移量不小于窗口长度时位图清零，否则保留仍在窗口内的位；
/// - 最后把所有仍落在窗口内的序列号置位。
pub fn update_ba_bitmap(record: &mut BaRecord, received: &[u16]) -> BaUpdate {
    let window = record.window();
    let mut update = BaUpdate::default();
    let mut max_ahead: Option<u16> = None;

    for &seq in received {
        let d = seq_sub(seq, record.ssn);
        if d >= SEQ_HALF {
            update.stale += 1;
        } else if d >= window {
            max_ahead = Some(max_ahead.map_or(d, |m| m.max(d)));
        }
    }

    if let Some(ahead) = max_ahead {
        let shift = ahead - window + 1;
        record.bitmap.shift_down(shift);
        record.ssn = seq_add(record.ssn, shift);
        update.shifted = shift;
    }

    for &seq in received {
        let d = seq_sub(seq, record.ssn);
        if d < window {
            record.bitmap.set(d);
        }
    }
    update
}
