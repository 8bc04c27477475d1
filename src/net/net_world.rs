//! 网络世界实现
//!
//! 持有节点注册表与信道模型；调度器通过 `World` 调用节点并在每个 tick
//! 统一分发信道帧。节点的 MAC 事件在这里汇入统计和可视化。

use std::any::Any;
use std::collections::HashMap;

use tracing::{debug, trace};

use super::channel::{Broadcast, ChannelModel};
use super::id::{MacAddress, NodeId};
use super::node::Node;
use super::packet::AppPacket;
use super::stats::Stats;
use crate::error::ConfigError;
use crate::mac::{AccessCategory, EdcaMac};
use crate::sim::{SimTime, World};
use crate::viz::{VizEvent, VizEventKind, VizLogger, VizNodeInfo};

pub struct NetWorld {
    nodes: Vec<Box<dyn Node>>,
    index: HashMap<NodeId, usize>,
    channel: Box<dyn ChannelModel + Send>,
    wakeups: Vec<usize>,
    next_pkt_id: u64,
    pub stats: Stats,
    pub viz: Option<VizLogger>,
}

impl Default for NetWorld {
    fn default() -> Self {
        Self::new(Box::new(Broadcast))
    }
}

impl NetWorld {
    pub fn new(channel: Box<dyn ChannelModel + Send>) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            channel,
            wakeups: Vec::new(),
            next_pkt_id: 0,
            stats: Stats::default(),
            viz: None,
        }
    }

    /// 注册节点；id 重复时报错
    pub fn add_node(&mut self, node: Box<dyn Node>) -> Result<NodeId, ConfigError> {
        let id = node.id();
        if self.index.contains_key(&id) {
            return Err(ConfigError::DuplicateNode(id.0));
        }
        debug!(node = ?id, name = node.name(), "添加节点");
        self.index.insert(id, self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        let idx = *self.index.get(&id)?;
        self.nodes.get(idx).map(|n| n.as_ref())
    }

    /// 节点第一个接口的 MAC
    pub fn mac(&self, id: NodeId) -> Option<&EdcaMac> {
        self.node(id)?.interfaces().first().map(|i| &i.mac)
    }

    pub fn mac_mut(&mut self, id: NodeId) -> Option<&mut EdcaMac> {
        let idx = *self.index.get(&id)?;
        self.nodes
            .get_mut(idx)?
            .interfaces_mut()
            .first_mut()
            .map(|i| &mut i.mac)
    }

    /// 创建应用层数据包
    pub fn make_packet(
        &mut self,
        src: NodeId,
        dst: MacAddress,
        ac: AccessCategory,
        length: u32,
        now: SimTime,
    ) -> AppPacket {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        AppPacket {
            id,
            src,
            dst,
            ac,
            length,
            payload_ref: id,
            timestamp: now,
        }
    }

    /// 把数据包注入源节点并在本 tick 唤醒它；队列溢出的包被 MAC 计数后返回。
    pub fn enqueue(&mut self, pkt: AppPacket) -> Result<(), AppPacket> {
        let Some(&idx) = self.index.get(&pkt.src) else {
            return Err(pkt);
        };
        self.wakeups.push(idx);
        let now = pkt.timestamp;
        let res = self.nodes[idx].enqueue(pkt);
        // 溢出事件也要进统计
        self.collect_events(idx, now);
        res
    }

    fn collect_events(&mut self, idx: usize, now: SimTime) {
        let node = &mut self.nodes[idx];
        let id = node.id();
        let events = node.drain_events();
        for ev in &events {
            self.stats.record(id, now, ev);
            if let Some(v) = &mut self.viz {
                v.push(VizEvent::from_mac(now, id, ev));
            }
        }
    }

    pub fn emit_viz_meta(&mut self) {
        let Some(v) = &mut self.viz else {
            return;
        };
        let nodes = self
            .nodes
            .iter()
            .map(|n| VizNodeInfo {
                id: n.id(),
                name: n.name().to_string(),
                position: n.position(),
            })
            .collect();
        v.push(VizEvent {
            t_us: 0,
            node: None,
            kind: VizEventKind::Meta { nodes },
        });
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn run_node(&mut self, idx: usize, elapsed: SimTime, now: SimTime) -> Option<SimTime> {
        let next = self.nodes.get_mut(idx)?.run_node(elapsed, now);
        self.collect_events(idx, now);
        next
    }

    fn distribute_frames(&mut self, now: SimTime) -> usize {
        let mut sent = Vec::new();
        for node in self.nodes.iter_mut() {
            sent.extend(node.take_transmitted());
        }
        for frame in &sent {
            for node in self.nodes.iter_mut() {
                let to = node.id();
                if to == frame.source || !self.channel.should_deliver(frame.source, to, frame) {
                    continue;
                }
                trace!(now = ?now, from = ?frame.source, to = ?to, frame_type = ?frame.frame.frame_type, "分发信道帧");
                node.push_channel_data(frame);
            }
        }
        sent.len()
    }

    fn take_wakeups(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.wakeups)
    }
}
