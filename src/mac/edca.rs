//! EDCA 状态机主体
//!
//! 这里只放状态、驱动循环和公共的簿记操作；各状态的处理函数分散在
//! `contention`、`sending`、`wait_for_rx`、`receiving` 中。

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use super::ac::AccessCategory;
use super::block_ack::BaRecord;
use super::config::{MacConfig, RateControlKind};
use super::frame::{ACK_LEN, AckPolicy, CTS_LEN, MacFrame, block_ack_length};
use super::observer::MacEvent;
use super::rate_control::{Arf, FixedRate, RateControl};
use super::retry::{ContentionWindow, RetryCounters};
use super::seqnum::SequenceNumbers;
use super::state::{MacState, ReceivingSubstate};
use super::timers::{TimerKind, TimerTable};
use crate::error::ConfigError;
use crate::net::{AppPacket, MacAddress, NodeId};
use crate::phy::{PhyIndication, PhyRate, PhyRequest, PhyRequestKind, RX_PHY_START_DELAY};
use crate::queue::{EdcaQueues, StationScheduler};
use crate::sim::SimTime;

/// 单次 `run` 内状态处理函数的最大连续执行次数
const MAX_STEPS: usize = 64;

/// 一次 `run` 的输出
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MacOutput {
    pub request: Option<PhyRequest>,
    pub frame: Option<MacFrame>,
    pub next_invoke: Option<SimTime>,
}

/// 状态处理函数的返回值
pub(super) enum Step {
    /// 等待时间流逝或新的指示
    Done,
    /// 状态已改变，立即以（可能转交的）指示再跑一次
    Continue(Option<PhyIndication>),
}

/// 一个等待确认的 MPDU
#[derive(Debug, Clone)]
pub(super) struct TxMpdu {
    pub(super) packet: AppPacket,
    pub(super) seq: u16,
    /// 已在空口上发送的次数
    pub(super) attempts: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum OnAir {
    Rts,
    Data,
}

/// 当前帧交换
#[derive(Debug, Clone)]
pub(super) struct TxContext {
    pub(super) dst: MacAddress,
    pub(super) ac: AccessCategory,
    pub(super) data: MacFrame,
    pub(super) data_rate: PhyRate,
    pub(super) rts: Option<MacFrame>,
    /// 使用长重传计数（聚合或不小于 RTS 门限）
    pub(super) is_long: bool,
    pub(super) sent: OnAir,
    pub(super) seqs: Vec<u16>,
}

#[derive(Debug)]
pub struct EdcaMac {
    pub(super) id: NodeId,
    pub(super) cfg: MacConfig,
    pub(super) state: MacState,
    pub(super) timers: TimerTable,
    pub(super) cca_busy: bool,
    /// 解码失败后等信道空闲再进入 EIFS
    pub(super) pending_eifs: bool,
    /// 已发出 PHY 请求，等待确认
    pub(super) awaiting_confirm: bool,
    pub(super) queues: EdcaQueues,
    pub(super) scheduler: StationScheduler,
    /// 每个 AC 剩余的退避时隙（`None`：尚未抽取）
    pub(super) backoff: [Option<u32>; 4],
    /// 本轮竞争中介质连续空闲的时间
    pub(super) contention_idle: SimTime,
    /// 赢得竞争的 AC
    pub(super) access_ac: Option<AccessCategory>,
    pub(super) cw: [ContentionWindow; 4],
    pub(super) retries: BTreeMap<(MacAddress, AccessCategory), RetryCounters>,
    pub(super) tx_pending: BTreeMap<(MacAddress, AccessCategory), Vec<TxMpdu>>,
    pub(super) seqnums: SequenceNumbers,
    pub(super) ba_rx: BTreeMap<(NodeId, AccessCategory), BaRecord>,
    pub(super) last_rx_seq: BTreeMap<(NodeId, AccessCategory), u16>,
    pub(super) tx: Option<TxContext>,
    /// 待发送的响应帧（CTS/Ack/Block-Ack）
    pub(super) response: Option<MacFrame>,
    pub(super) rate_control: Box<dyn RateControl>,
    pub(super) basic: PhyRate,
    pub(super) rates: BTreeMap<u8, PhyRate>,
    pub(super) rng: ChaCha8Rng,
    pub(super) events: Vec<MacEvent>,
    pub(super) out: MacOutput,
}

impl EdcaMac {
    /// 校验配置并创建 MAC；`seed` 与节点 id 一起决定退避随机数序列。
    pub fn new(id: NodeId, cfg: MacConfig, seed: u64) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let basic = cfg.basic_rate()?;
        let rates: BTreeMap<u8, PhyRate> = (0..=cfg.mcs)
            .filter_map(|mcs| {
                PhyRate::new(cfg.frame_format, cfg.bandwidth, mcs, cfg.num_spatial_streams)
                    .ok()
                    .map(|r| (mcs, r))
            })
            .collect();
        let rate_control: Box<dyn RateControl> = match cfg.rate_control {
            RateControlKind::Fixed => Box::new(FixedRate::new(cfg.mcs)),
            RateControlKind::Arf => Box::new(Arf::new(rates.keys().copied().collect())),
        };
        let cw = AccessCategory::ALL.map(|ac| ContentionWindow::new(cfg.edca.get(ac)));
        let rng = ChaCha8Rng::seed_from_u64(seed ^ (id.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));

        Ok(Self {
            id,
            queues: EdcaQueues::new(cfg.max_queue_len),
            cfg,
            state: MacState::Idle,
            timers: TimerTable::default(),
            cca_busy: false,
            pending_eifs: false,
            awaiting_confirm: false,
            scheduler: StationScheduler::default(),
            backoff: [None; 4],
            contention_idle: SimTime::ZERO,
            access_ac: None,
            cw,
            retries: BTreeMap::new(),
            tx_pending: BTreeMap::new(),
            seqnums: SequenceNumbers::default(),
            ba_rx: BTreeMap::new(),
            last_rx_seq: BTreeMap::new(),
            tx: None,
            response: None,
            rate_control,
            basic,
            rates,
            rng,
            events: Vec::new(),
            out: MacOutput::default(),
        })
    }

    /// 驱动状态机：先推进 `elapsed`，再处理 `indication`，
    /// 直到需要等待（时间或 PHY）为止。
    #[tracing::instrument(level = "trace", skip(self, indication), fields(node = ?self.id, state = ?self.state))]
    pub fn run(&mut self, elapsed: SimTime, indication: Option<PhyIndication>) -> MacOutput {
        let was_idle = self.medium_idle();
        self.timers.advance(elapsed);
        if self.state == MacState::Contention && was_idle {
            self.contention_idle = self.contention_idle.saturating_add(elapsed);
        }
        match &indication {
            Some(PhyIndication::CcaBusy) => self.cca_busy = true,
            Some(PhyIndication::CcaIdle) => self.cca_busy = false,
            Some(PhyIndication::Unknown) => warn!(node = ?self.id, "未知的 PHY 指示"),
            _ => {}
        }
        self.maintain_nav();

        let mut ind = indication;
        let mut steps = 0;
        loop {
            steps += 1;
            if steps > MAX_STEPS {
                warn!(node = ?self.id, state = ?self.state, "状态机在一次调用中未收敛");
                break;
            }
            match self.dispatch(ind.take()) {
                Step::Done => break,
                Step::Continue(next) => ind = next,
            }
            if self.out.request.is_some() || self.out.frame.is_some() {
                break;
            }
        }

        self.maintain_nav();
        let mut out = std::mem::take(&mut self.out);
        out.next_invoke = self.next_invoke();
        out
    }

    fn dispatch(&mut self, ind: Option<PhyIndication>) -> Step {
        match self.state {
            MacState::Idle => self.on_idle(ind),
            MacState::Contention => self.on_contention(ind),
            MacState::SendingData(sub) => self.on_sending(sub, ind),
            MacState::WaitForRx => self.on_wait_for_rx(ind),
            MacState::Receiving(sub) => self.on_receiving(sub, ind),
            MacState::Eifs => self.on_eifs(ind),
        }
    }

    /// 切换状态：清掉上一状态拥有的定时器，启动新状态的入口定时器。
    pub(super) fn transition(&mut self, next: MacState) {
        debug!(node = ?self.id, from = ?self.state, to = ?next, "状态切换");
        if self.state == MacState::Contention {
            self.freeze_backoff();
        }
        self.timers.clear(TimerKind::Phase);
        self.timers.clear(TimerKind::ResponseTimeout);
        self.timers.clear(TimerKind::Eifs);
        match next {
            MacState::WaitForRx => {
                let timeout = self.cfg.sifs + self.cfg.slot_time + RX_PHY_START_DELAY;
                self.timers.arm(TimerKind::ResponseTimeout, timeout);
            }
            MacState::Eifs => {
                let eifs = self.cfg.sifs + self.ack_time();
                self.timers.arm(TimerKind::Eifs, eifs);
            }
            MacState::Receiving(ReceivingSubstate::Responding) => {
                self.timers.arm(TimerKind::Phase, self.cfg.sifs);
            }
            MacState::Contention => self.contention_idle = SimTime::ZERO,
            _ => {}
        }
        self.state = next;
    }

    /// NAV 复位与清除：RTS 设置的 NAV 超时未见接收则作废；
    /// 到期的 NAV 只在信道空闲时清除。
    fn maintain_nav(&mut self) {
        if self.timers.expired(TimerKind::NavReset) {
            debug!(node = ?self.id, "RTS 之后未见接收，NAV 复位");
            self.timers.clear(TimerKind::NavReset);
            for kind in TimerKind::NAVS {
                self.timers.clear(kind);
            }
        }
        if !self.cca_busy {
            for kind in TimerKind::NAVS {
                if self.timers.expired(kind) {
                    self.timers.clear(kind);
                }
            }
        }
    }

    fn next_invoke(&self) -> Option<SimTime> {
        let mut next = self.timers.next_expiry();
        if self.state == MacState::Contention && self.medium_idle() {
            for ac in AccessCategory::ALL {
                if !self.has_traffic(ac) {
                    continue;
                }
                let Some(slots) = self.backoff[ac.index()] else {
                    continue;
                };
                let due = self.backoff_deadline(ac, slots);
                let left = due.saturating_sub(self.contention_idle);
                if !left.is_zero() {
                    next = Some(next.map_or(left, |n| n.min(left)));
                }
            }
        }
        next
    }

    pub(super) fn nav_active(&self) -> bool {
        TimerKind::NAVS.iter().any(|&k| self.timers.running(k))
    }

    /// 物理与虚拟载波侦听都空闲
    pub(super) fn medium_idle(&self) -> bool {
        !self.cca_busy && !self.nav_active()
    }

    pub(super) fn has_traffic(&self, ac: AccessCategory) -> bool {
        !self.queues.is_empty(ac)
            || self
                .tx_pending
                .iter()
                .any(|((_, a), v)| *a == ac && !v.is_empty())
    }

    pub(super) fn has_any_traffic(&self) -> bool {
        AccessCategory::ALL.iter().any(|&ac| self.has_traffic(ac))
    }

    pub(super) fn ack_time(&self) -> SimTime {
        self.basic.duration(ACK_LEN)
    }

    pub(super) fn cts_time(&self) -> SimTime {
        self.basic.duration(CTS_LEN)
    }

    pub(super) fn block_ack_time(&self) -> SimTime {
        self.basic.duration(block_ack_length(self.cfg.ba_window))
    }

    /// 数据帧之后响应帧的空口时间
    pub(super) fn response_time(&self, policy: AckPolicy) -> SimTime {
        match policy {
            AckPolicy::NoAck => SimTime::ZERO,
            AckPolicy::Normal => self.ack_time(),
            AckPolicy::BlockAck => self.block_ack_time(),
        }
    }

    pub(super) fn phy_request(&self, kind: PhyRequestKind, rate: &PhyRate, psdu: u32) -> PhyRequest {
        PhyRequest {
            kind,
            bandwidth: rate.bandwidth,
            frame_format: rate.format,
            num_spatial_streams: rate.nss,
            mcs_per_user: vec![rate.mcs],
            psdu_length_per_user: vec![psdu],
            tx_power_limited: self.cfg.spatial_reuse && self.cfg.tx_power_limited,
        }
    }

    pub(super) fn notify_tx(&mut self, frame: &MacFrame, rate: &PhyRate, airtime: SimTime) {
        trace!(node = ?self.id, frame_type = ?frame.frame_type, receiver = %frame.receiver, %airtime, "📡 发送帧");
        self.events.push(MacEvent::FrameTx {
            frame_type: frame.frame_type,
            receiver: frame.receiver,
            ac: frame.ac,
            mcs: rate.mcs,
            psdu_length: frame.psdu_length,
            airtime,
            subframes: frame.subframes.len(),
            retransmission: frame.is_retransmission(),
        });
    }

    /// 把 (dst, ac) 中给定序列号的待确认帧移出并通知观察者
    pub(super) fn discard(&mut self, dst: MacAddress, ac: AccessCategory, seqs: &[u16], success: bool) {
        let key = (dst, ac);
        let Some(pending) = self.tx_pending.remove(&key) else {
            return;
        };
        let (gone, keep): (Vec<TxMpdu>, Vec<TxMpdu>) =
            pending.into_iter().partition(|m| seqs.contains(&m.seq));
        if !keep.is_empty() {
            self.tx_pending.insert(key, keep);
        }
        if gone.is_empty() {
            return;
        }
        let retry_count = gone
            .iter()
            .map(|m| m.attempts.saturating_sub(1))
            .max()
            .unwrap_or(0);
        if !success {
            debug!(node = ?self.id, %dst, %ac, count = gone.len(), "❌ 重传耗尽，丢弃");
        }
        self.events.push(MacEvent::PacketsDiscarded {
            receiver: dst,
            ac,
            success,
            count: gone.len(),
            bytes: gone.iter().map(|m| m.packet.length as u64).sum(),
            retry_count,
        });
    }

    /// 所有待确认帧的序列号
    pub(super) fn pending_seqs(&self, dst: MacAddress, ac: AccessCategory) -> Vec<u16> {
        self.tx_pending
            .get(&(dst, ac))
            .map(|v| v.iter().map(|m| m.seq).collect())
            .unwrap_or_default()
    }

    /// 应用层注入：队列满时丢弃并计数，不阻塞调用方。
    pub fn enqueue(&mut self, pkt: AppPacket) -> Result<(), AppPacket> {
        self.queues.enqueue(pkt).map_err(|pkt| {
            debug!(node = ?self.id, pkt_id = pkt.id, dst = %pkt.dst, "队列已满，丢弃新包");
            self.events.push(MacEvent::QueueOverflow {
                receiver: pkt.dst,
                ac: pkt.ac,
                packet_id: pkt.id,
                length: pkt.length,
            });
            pkt
        })
    }

    /// 取走积累的观察者事件
    pub fn drain_events(&mut self) -> Vec<MacEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn config(&self) -> &MacConfig {
        &self.cfg
    }

    pub fn state(&self) -> MacState {
        self.state
    }

    pub fn is_cca_busy(&self) -> bool {
        self.cca_busy
    }

    pub fn retry_counters(&self, dst: MacAddress, ac: AccessCategory) -> RetryCounters {
        self.retries.get(&(dst, ac)).copied().unwrap_or_default()
    }

    pub fn cw(&self, ac: AccessCategory) -> u32 {
        self.cw[ac.index()].value()
    }

    pub fn backoff_slots(&self, ac: AccessCategory) -> Option<u32> {
        self.backoff[ac.index()]
    }

    /// 等待确认的帧数（TxWaitingForAck）
    pub fn waiting_for_ack(&self, dst: MacAddress, ac: AccessCategory) -> usize {
        self.tx_pending.get(&(dst, ac)).map_or(0, |v| v.len())
    }

    pub fn pending_sequences(&self, dst: MacAddress, ac: AccessCategory) -> Vec<u16> {
        self.pending_seqs(dst, ac)
    }

    pub fn queue_len(&self) -> usize {
        self.queues.total_len()
    }

    pub fn queue_len_for(&self, ac: AccessCategory, dst: MacAddress) -> usize {
        self.queues.len_for(ac, dst)
    }

    pub fn timer(&self, kind: TimerKind) -> Option<SimTime> {
        self.timers.remaining(kind)
    }

    pub fn ba_record(&self, src: NodeId, ac: AccessCategory) -> Option<&BaRecord> {
        self.ba_rx.get(&(src, ac))
    }

    /// 指定 (dst, ac) 下一个分配的序列号
    pub fn set_next_sequence(&mut self, dst: MacAddress, ac: AccessCategory, seq: u16) {
        self.seqnums.set_next(dst, ac, seq);
    }
}
