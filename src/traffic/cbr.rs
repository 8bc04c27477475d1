//! 恒定比特率流量源

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::mac::{AccessCategory, MAX_MSDU_LEN};
use crate::net::{MacAddress, NetWorld, NodeId};
use crate::sim::{Event, EventId, Periodicity, SimTime, Simulator, World};

/// 每个周期向 `src` 注入一个定长包；`remaining` 为 None 时不限包数。
///
/// 队列满时包被 MAC 计为溢出，流量源照常继续。
#[derive(Debug, Clone)]
pub struct CbrSource {
    pub src: NodeId,
    pub dst: MacAddress,
    pub ac: AccessCategory,
    pub packet_bytes: u32,
    pub remaining: Option<u64>,
}

impl CbrSource {
    /// 包长必须落在 1..=MAX_MSDU_LEN
    pub fn check_packet_bytes(bytes: u32) -> Result<(), ConfigError> {
        if bytes == 0 {
            return Err(ConfigError::ZeroValue {
                field: "packet_bytes",
            });
        }
        if bytes > MAX_MSDU_LEN {
            return Err(ConfigError::PacketTooLarge {
                bytes,
                max: MAX_MSDU_LEN,
            });
        }
        Ok(())
    }

    /// 以 `interval` 为周期从 `start` 开始调度；`interval` 必须非零。
    pub fn schedule(self, sim: &mut Simulator, start: SimTime, interval: SimTime) -> EventId {
        debug!(src = ?self.src, dst = %self.dst, ac = %self.ac, %interval, "注册 CBR 流量");
        sim.schedule_event(start, Periodicity::Every(interval), self)
    }
}

impl Event for CbrSource {
    fn execute(&mut self, sim: &mut Simulator, world: &mut dyn World) {
        if self.remaining == Some(0) {
            if let Some(id) = sim.current_event() {
                sim.cancel(id);
            }
            return;
        }
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        let pkt = w.make_packet(self.src, self.dst, self.ac, self.packet_bytes, sim.now());
        let pkt_id = pkt.id;
        if w.enqueue(pkt).is_err() {
            trace!(src = ?self.src, pkt_id, "注入失败（队列满或节点不存在）");
        }

        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
            if *n == 0 {
                if let Some(id) = sim.current_event() {
                    sim.cancel(id);
                }
            }
        }
    }
}
