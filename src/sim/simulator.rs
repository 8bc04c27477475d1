//! 仿真器
//!
//! 全局离散事件调度器：维护仿真时钟、事件队列，并以 tick 为单位驱动所有节点。
//!
//! 每个 tick：
//! 1. 首次（或上一推进量为 0 时）调用全部节点，否则只调用倒计时到期的节点；
//! 2. 节点调用结束后统一分发信道帧，使 T 时刻发出的帧在 T 时刻即可被接收；
//! 3. 触发“时间推进”事件（仅非零推进）与到期的普通事件；
//! 4. 下一推进量 = 0（刚分发过帧）或 min(节点请求, 事件剩余时间)。

use super::event::{Event, EventId, Periodicity};
use super::scheduled_event::{AdvanceEvent, ScheduledEvent};
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间、事件队列与节点调用簿记。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    next_id: u64,
    q: BinaryHeap<ScheduledEvent>,
    advance_events: Vec<AdvanceEvent>,
    /// 触发过程中被取消的事件（避免被重新挂起）
    cancelled: HashSet<EventId>,
    /// 正在执行的事件
    current: Option<EventId>,
    /// 本轮正在触发的时间推进事件（已从 `advance_events` 取出）
    firing: HashSet<EventId>,
    /// 每个节点距下一次调用的剩余时间（None：等待唤醒）
    node_next: Vec<Option<SimTime>>,
    /// 每个节点距上一次调用累计经过的时间
    since_last_call: Vec<SimTime>,
    /// 上一次时钟推进量
    last_advance: SimTime,
    started: bool,
    ticks: u64,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 已执行的 tick 数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 等待中的普通事件 + 时间推进事件数量
    pub fn pending_events(&self) -> usize {
        self.q.len() + self.advance_events.len()
    }

    /// 正在执行的事件 id（周期事件可借此取消自己）
    pub fn current_event(&self) -> Option<EventId> {
        self.current
    }

    /// 调度一次性事件在指定时间执行
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        self.schedule_event(at, Periodicity::Once, ev)
    }

    /// 调度一次性事件在 `delay` 之后执行
    pub fn schedule_after<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        self.schedule_event_after(delay, Periodicity::Once, ev)
    }

    /// 调度事件（可指定周期）
    #[tracing::instrument(level = "trace", skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule_event<E: Event>(
        &mut self,
        at: SimTime,
        periodicity: Periodicity,
        ev: E,
    ) -> EventId {
        let id = EventId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let period = match periodicity {
            Periodicity::Once => None,
            Periodicity::Every(p) if p.is_zero() => {
                self.advance_events.push(AdvanceEvent { id, ev: Box::new(ev) });
                return id;
            }
            Periodicity::Every(p) => Some(p),
            Periodicity::OnTimeAdvance => {
                self.advance_events.push(AdvanceEvent { id, ev: Box::new(ev) });
                trace!(?id, "时间推进事件已注册");
                return id;
            }
        };

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        // 过去的时间点在当前时刻触发
        let at = at.max(self.now);
        self.q.push(ScheduledEvent {
            at,
            seq,
            id,
            period,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), ?id, "事件已加入队列");
        id
    }

    /// 调度事件在 `delay` 之后执行（可指定周期）
    pub fn schedule_event_after<E: Event>(
        &mut self,
        delay: SimTime,
        periodicity: Periodicity,
        ev: E,
    ) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule_event(at, periodicity, ev)
    }

    /// 取消事件；不存在的 id 直接忽略。
    pub fn cancel(&mut self, id: EventId) {
        let before = self.pending_events();
        self.q.retain(|e| e.id != id);
        self.advance_events.retain(|e| e.id != id);
        // 已被取出、正在触发的事件只能记下，等触发结束后不再挂回
        let in_flight = self.current == Some(id) || self.firing.contains(&id);
        if self.pending_events() == before && in_flight {
            self.cancelled.insert(id);
        }
        trace!(?id, "取消事件");
    }

    /// 运行直到仿真时钟到达 `total`。
    #[tracing::instrument(skip(self, world), fields(total = %total))]
    pub fn run(&mut self, total: SimTime, world: &mut dyn World) {
        info!("▶️  开始运行仿真");

        let n = world.node_count();
        self.node_next.resize(n, None);
        self.since_last_call.resize(n, SimTime::ZERO);

        while self.now < total {
            self.ticks = self.ticks.saturating_add(1);
            let advance = self.last_advance;

            self.invoke_nodes(advance, world);

            let distributed = world.distribute_frames(self.now);
            if distributed > 0 {
                trace!(now = ?self.now, distributed, "信道帧已分发");
            }

            if !advance.is_zero() {
                self.fire_advance_events(world);
            }
            self.fire_due_events(world);
            self.cancelled.clear();

            world.on_tick(self);

            for idx in world.take_wakeups() {
                if let Some(slot) = self.node_next.get_mut(idx) {
                    *slot = Some(SimTime::ZERO);
                }
            }

            let next = if distributed > 0 {
                SimTime::ZERO
            } else {
                self.next_advance(total)
            };
            // 被唤醒的节点剩余 0：强制零延迟重入
            let next = if self.node_next.iter().any(|t| *t == Some(SimTime::ZERO)) {
                SimTime::ZERO
            } else {
                next
            };

            trace!(now = ?self.now, advance = ?next, "计算下一次推进");
            self.last_advance = next;
            self.now = self.now.saturating_add(next);
        }

        info!(ticks = self.ticks, final_time = ?self.now, "✅ 仿真完成");
    }

    fn invoke_nodes(&mut self, advance: SimTime, world: &mut dyn World) {
        let first = !self.started;
        for idx in 0..self.node_next.len() {
            if !first {
                self.since_last_call[idx] = self.since_last_call[idx].saturating_add(advance);
                if let Some(t) = self.node_next[idx] {
                    self.node_next[idx] = Some(t.saturating_sub(advance));
                }
            }
            let due = first || advance.is_zero() || self.node_next[idx] == Some(SimTime::ZERO);
            if !due {
                continue;
            }
            let elapsed = self.since_last_call[idx];
            self.since_last_call[idx] = SimTime::ZERO;
            let next = world.run_node(idx, elapsed, self.now);
            // 节点不得请求零延迟；零值按“最小粒度”处理以保证时钟推进
            self.node_next[idx] = next.map(|t| t.max(SimTime(1)));
        }
        self.started = true;
    }

    fn fire_advance_events(&mut self, world: &mut dyn World) {
        let mut events = std::mem::take(&mut self.advance_events);
        self.firing = events.iter().map(|e| e.id).collect();
        for e in events.iter_mut() {
            if self.cancelled.contains(&e.id) {
                continue;
            }
            self.current = Some(e.id);
            e.ev.execute(self, world);
        }
        self.current = None;
        self.firing.clear();
        events.retain(|e| !self.cancelled.contains(&e.id));
        // 触发期间新注册的时间推进事件排在后面
        events.append(&mut self.advance_events);
        self.advance_events = events;
    }

    fn fire_due_events(&mut self, world: &mut dyn World) {
        while let Some(top) = self.q.peek() {
            if top.at > self.now {
                break;
            }
            let Some(mut item) = self.q.pop() else {
                break;
            };
            debug_assert!(item.at <= self.now);
            trace!(id = ?item.id, at = ?item.at, "执行事件");
            self.current = Some(item.id);
            item.ev.execute(self, world);
            self.current = None;

            if let Some(period) = item.period {
                if self.cancelled.contains(&item.id) {
                    continue;
                }
                let seq = self.next_seq;
                self.next_seq = self.next_seq.wrapping_add(1);
                item.at = item.at.saturating_add(period);
                item.seq = seq;
                self.q.push(item);
            }
        }
    }

    fn next_advance(&self, total: SimTime) -> SimTime {
        let mut next = total.saturating_sub(self.now);
        for t in self.node_next.iter().flatten() {
            next = next.min(*t);
        }
        if let Some(top) = self.q.peek() {
            next = next.min(top.at.saturating_sub(self.now));
        }
        next
    }
}
