//! 按 AC 分组的目的站队列

use std::collections::BTreeMap;

use super::{DropTailQueue, PacketQueue};
use crate::mac::AccessCategory;
use crate::net::{AppPacket, MacAddress};

#[derive(Debug)]
pub struct EdcaQueues {
    capacity: usize,
    per_ac: [BTreeMap<MacAddress, DropTailQueue>; 4],
}

impl EdcaQueues {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            per_ac: Default::default(),
        }
    }

    /// 按包的 AC 与目的地址入队；队列满时把包原样退回
    pub fn enqueue(&mut self, pkt: AppPacket) -> Result<(), AppPacket> {
        let capacity = self.capacity;
        self.per_ac[pkt.ac.index()]
            .entry(pkt.dst)
            .or_insert_with(|| DropTailQueue::new(capacity))
            .enqueue(pkt)
    }

    pub fn dequeue(&mut self, ac: AccessCategory, dst: MacAddress) -> Option<AppPacket> {
        self.per_ac[ac.index()].get_mut(&dst)?.dequeue()
    }

    pub fn len_for(&self, ac: AccessCategory, dst: MacAddress) -> usize {
        self.per_ac[ac.index()].get(&dst).map_or(0, |q| q.len())
    }

    /// 该 AC 下有排队包的目的站（地址升序）
    pub fn destinations(&self, ac: AccessCategory) -> impl Iterator<Item = MacAddress> + '_ {
        self.per_ac[ac.index()]
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(dst, _)| *dst)
    }

    pub fn is_empty(&self, ac: AccessCategory) -> bool {
        self.per_ac[ac.index()].values().all(|q| q.is_empty())
    }

    pub fn total_len(&self) -> usize {
        self.per_ac
            .iter()
            .flat_map(|m| m.values())
            .map(|q| q.len())
            .sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.per_ac
            .iter()
            .flat_map(|m| m.values())
            .map(|q| q.bytes())
            .sum()
    }
}
