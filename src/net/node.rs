//! 节点类型
//!
//! 节点持有一个或多个无线接口（MAC + PHY + 收发缓冲）。调度器每次调用节点时，
//! 节点依次驱动各接口：PHY 推进时间并接收信道帧，MAC 处理指示，
//! 请求与指示在接口内来回传递直到双方都需要等待。

use tracing::{trace, warn};

use super::channel::ChannelFrame;
use super::id::NodeId;
use super::packet::AppPacket;
use super::position::Position;
use crate::mac::{EdcaMac, MacEvent};
use crate::phy::AbstractPhy;
use crate::sim::SimTime;

/// 单次调用内 MAC/PHY 往返次数上限
const MAX_EXCHANGES: usize = 64;

/// 节点接口
pub trait Node: Send {
    fn id(&self) -> NodeId;

    fn name(&self) -> &str;

    fn position(&self) -> Position;

    fn interfaces(&self) -> &[Interface];

    fn interfaces_mut(&mut self) -> &mut [Interface];

    /// 驱动所有接口，返回最早的下一次调用延迟
    fn run_node(&mut self, elapsed: SimTime, now: SimTime) -> Option<SimTime>;

    /// 信道帧到达：交给同频的接口
    fn push_channel_data(&mut self, frame: &ChannelFrame) {
        for iface in self.interfaces_mut() {
            if iface.phy.frequency_id() == frame.frequency_id {
                iface.rx_buffer.push(frame.clone());
            }
        }
    }

    /// 取走各接口本次发出的帧
    fn take_transmitted(&mut self) -> Vec<ChannelFrame> {
        self.interfaces_mut()
            .iter_mut()
            .flat_map(|i| std::mem::take(&mut i.tx_buffer))
            .collect()
    }

    /// 取走各接口积累的 MAC 事件
    fn drain_events(&mut self) -> Vec<MacEvent> {
        self.interfaces_mut()
            .iter_mut()
            .flat_map(|i| i.mac.drain_events())
            .collect()
    }

    /// 应用层注入：默认交给第一个接口
    fn enqueue(&mut self, pkt: AppPacket) -> Result<(), AppPacket> {
        match self.interfaces_mut().first_mut() {
            Some(iface) => iface.mac.enqueue(pkt),
            None => Err(pkt),
        }
    }
}

/// 无线接口
#[derive(Debug)]
pub struct Interface {
    pub mac: EdcaMac,
    pub phy: AbstractPhy,
    /// 本次调用中发出、等待调度器分发的帧
    pub tx_buffer: Vec<ChannelFrame>,
    /// 已到达、等待 PHY 处理的帧
    pub rx_buffer: Vec<ChannelFrame>,
}

impl Interface {
    pub fn new(mac: EdcaMac, phy: AbstractPhy) -> Self {
        Self {
            mac,
            phy,
            tx_buffer: Vec::new(),
            rx_buffer: Vec::new(),
        }
    }

    pub fn run(&mut self, elapsed: SimTime, position: Position) -> Option<SimTime> {
        self.phy.advance(elapsed);
        for frame in self.rx_buffer.drain(..) {
            self.phy.receive(position, &frame);
        }

        let first = self.phy.pop_indication();
        let mut out = self.mac.run(elapsed, first);
        let mut exchanges = 0;
        loop {
            exchanges += 1;
            if exchanges > MAX_EXCHANGES {
                warn!(node = ?self.mac.id(), "MAC/PHY 交互在一次调用中未收敛");
                break;
            }
            if let Some(req) = out.request.take() {
                trace!(node = ?self.mac.id(), kind = ?req.kind, "PHY 请求");
                self.phy.request(req);
            }
            if let Some(frame) = out.frame.take() {
                if let Some(cf) = self.phy.transmit(position, frame) {
                    self.tx_buffer.push(cf);
                }
            }
            match self.phy.pop_indication() {
                Some(ind) => out = self.mac.run(SimTime::ZERO, Some(ind)),
                None => break,
            }
        }

        match (out.next_invoke, self.phy.next_invoke()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// 一个无线节点（AP 或 STA 都用它，角色只体现在流量上）
#[derive(Debug)]
pub struct WlanNode {
    id: NodeId,
    name: String,
    position: Position,
    interfaces: Vec<Interface>,
}

impl WlanNode {
    pub fn new(id: NodeId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            interfaces: Vec::new(),
        }
    }

    pub fn with_interface(mut self, iface: Interface) -> Self {
        self.interfaces.push(iface);
        self
    }
}

impl Node for WlanNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Position {
        self.position
    }

    fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    fn interfaces_mut(&mut self) -> &mut [Interface] {
        &mut self.interfaces
    }

    #[tracing::instrument(level = "trace", skip(self), fields(node = ?self.id, now = ?now))]
    fn run_node(&mut self, elapsed: SimTime, now: SimTime) -> Option<SimTime> {
        let position = self.position;
        self.interfaces
            .iter_mut()
            .filter_map(|iface| iface.run(elapsed, position))
            .min()
    }
}
