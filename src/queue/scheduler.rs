//! 目的站轮询调度

use crate::mac::AccessCategory;
use crate::net::MacAddress;

/// 每个 AC 记住上一次服务的目的站，下一次从它之后的候选开始。
#[derive(Debug, Default)]
pub struct StationScheduler {
    last: [Option<MacAddress>; 4],
}

impl StationScheduler {
    /// `candidates` 必须升序；返回被选中的目的站
    pub fn select(&mut self, ac: AccessCategory, candidates: &[MacAddress]) -> Option<MacAddress> {
        let pick = match self.last[ac.index()] {
            Some(last) => candidates
                .iter()
                .find(|&&c| c > last)
                .or_else(|| candidates.first()),
            None => candidates.first(),
        }
        .copied()?;
        self.last[ac.index()] = Some(pick);
        Some(pick)
    }
}
