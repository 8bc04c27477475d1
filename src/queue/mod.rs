//! 队列策略（Queue disciplines）
//!
//! 每个 AC、每个目的站一条有界 FIFO（DropTail：满了丢新到达的包），
//! 再加一个在目的站之间轮询的调度器。

use crate::net::AppPacket;

mod drop_tail;
mod edca_queues;
mod scheduler;

pub use drop_tail::DropTailQueue;
pub use edca_queues::EdcaQueues;
pub use scheduler::StationScheduler;

/// AppPacket 队列抽象
pub trait PacketQueue: std::fmt::Debug {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: AppPacket) -> Result<(), AppPacket>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<AppPacket>;
    fn peek(&self) -> Option<&AppPacket>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn capacity_pkts(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
