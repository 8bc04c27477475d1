use crate::sim::{Event, EventId, Periodicity, SimTime, Simulator, World};
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DummyWorld {
    ticks: usize,
}

impl World for DummyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn node_count(&self) -> usize {
        0
    }

    fn run_node(&mut self, _idx: usize, _elapsed: SimTime, _now: SimTime) -> Option<SimTime> {
        None
    }

    fn distribute_frames(&mut self, _now: SimTime) -> usize {
        0
    }

    fn on_tick(&mut self, _sim: &Simulator) {
        self.ticks = self.ticks.saturating_add(1);
    }
}

struct Push {
    id: u32,
    log: Arc<Mutex<Vec<u32>>>,
}

impl Event for Push {
    fn execute(&mut self, _sim: &mut Simulator, _world: &mut dyn World) {
        self.log.lock().expect("log lock").push(self.id);
    }
}

struct PushThenScheduleNow {
    id: u32,
    next_id: u32,
    log: Arc<Mutex<Vec<u32>>>,
}

impl Event for PushThenScheduleNow {
    fn execute(&mut self, sim: &mut Simulator, _world: &mut dyn World) {
        self.log.lock().expect("log lock").push(self.id);
        sim.schedule(
            sim.now(),
            Push {
                id: self.next_id,
                log: Arc::clone(&self.log),
            },
        );
    }
}

#[test]
fn scheduled_events_order_by_time_then_seq() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    for (at, id) in [(10, 1), (5, 2), (10, 3)] {
        sim.schedule(
            SimTime(at),
            Push {
                id,
                log: Arc::clone(&log),
            },
        );
    }

    let mut world = DummyWorld::default();
    sim.run(SimTime(20), &mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[2, 1, 3]);
    // t=0, t=5, t=10
    assert_eq!(world.ticks, 3);
    assert_eq!(sim.now(), SimTime(20));
}

#[test]
fn event_scheduled_at_same_time_inside_event_runs_in_the_same_tick() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        PushThenScheduleNow {
            id: 1,
            next_id: 2,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run(SimTime(1), &mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1, 2]);
    assert_eq!(world.ticks, 1);
}

#[test]
fn run_stops_at_total_and_leaves_later_events_pending() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut sim = Simulator::default();
    sim.schedule(
        SimTime::ZERO,
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    sim.schedule(
        SimTime(10),
        Push {
            id: 2,
            log: Arc::clone(&log),
        },
    );

    let mut world = DummyWorld::default();
    sim.run(SimTime(5), &mut world);

    assert_eq!(&*log.lock().expect("log lock"), &[1]);
    assert_eq!(sim.now(), SimTime(5));
    assert_eq!(sim.pending_events(), 1);
}

#[test]
fn run_advances_time_even_if_there_are_no_events() {
    let mut sim = Simulator::default();
    let mut world = DummyWorld::default();

    sim.run(SimTime(7), &mut world);
    assert_eq!(sim.now(), SimTime(7));
    assert_eq!(world.ticks, 1);
}

#[test]
fn cancelled_event_never_fires() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sim = Simulator::default();
    let id = sim.schedule(
        SimTime(3),
        Push {
            id: 1,
            log: Arc::clone(&log),
        },
    );
    sim.cancel(id);
    // 不存在的 id 直接忽略
    sim.cancel(id);

    let mut world = DummyWorld::default();
    sim.run(SimTime(10), &mut world);
    assert!(log.lock().expect("log lock").is_empty());
}

#[test]
fn periodic_event_reschedules_until_it_cancels_itself() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fired);

    let mut sim = Simulator::default();
    sim.schedule_event(
        SimTime(2),
        Periodicity::Every(SimTime(3)),
        move |sim: &mut Simulator, _w: &mut dyn World| {
            let mut log = log.lock().expect("log lock");
            log.push(sim.now());
            if log.len() == 3 {
                if let Some(id) = sim.current_event() {
                    sim.cancel(id);
                }
            }
        },
    );

    let mut world = DummyWorld::default();
    sim.run(SimTime(50), &mut world);

    assert_eq!(
        &*fired.lock().expect("log lock"),
        &[SimTime(2), SimTime(5), SimTime(8)]
    );
    assert_eq!(sim.pending_events(), 0);
}

#[test]
fn time_advance_event_fires_once_per_non_zero_advance() {
    let count = Arc::new(Mutex::new(0_u32));
    let c = Arc::clone(&count);

    let mut sim = Simulator::default();
    sim.schedule_event(
        SimTime::ZERO,
        Periodicity::OnTimeAdvance,
        move |_sim: &mut Simulator, _w: &mut dyn World| {
            *c.lock().expect("count lock") += 1;
        },
    );
    for at in [4, 9] {
        sim.schedule(SimTime(at), |_sim: &mut Simulator, _w: &mut dyn World| {});
    }

    let mut world = DummyWorld::default();
    sim.run(SimTime(12), &mut world);

    // 推进：0 -> 4 -> 9
    assert_eq!(*count.lock().expect("count lock"), 2);
    assert_eq!(Periodicity::from_period(Some(SimTime::ZERO)), Periodicity::OnTimeAdvance);
    assert_eq!(Periodicity::from_period(None), Periodicity::Once);
}

#[test]
fn cancelling_an_unknown_id_does_not_affect_a_later_event_with_that_id() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fired);

    let mut sim = Simulator::default();
    sim.schedule(SimTime(2), move |sim: &mut Simulator, _w: &mut dyn World| {
        // id 1 尚未分配
        sim.cancel(EventId(1));
        let log = Arc::clone(&log);
        let id = sim.schedule_event(
            sim.now(),
            Periodicity::Every(SimTime(3)),
            move |sim: &mut Simulator, _w: &mut dyn World| {
                log.lock().expect("log lock").push(sim.now());
            },
        );
        assert_eq!(id, EventId(1));
    });

    let mut world = DummyWorld::default();
    sim.run(SimTime(10), &mut world);

    assert_eq!(
        &*fired.lock().expect("log lock"),
        &[SimTime(2), SimTime(5), SimTime(8)]
    );
}

#[test]
fn time_advance_event_can_cancel_a_sibling_in_the_same_round() {
    let count = Arc::new(Mutex::new(0_u32));
    let c = Arc::clone(&count);

    let mut sim = Simulator::default();
    let first = sim.schedule_event(
        SimTime::ZERO,
        Periodicity::OnTimeAdvance,
        |sim: &mut Simulator, _w: &mut dyn World| sim.cancel(EventId(1)),
    );
    let second = sim.schedule_event(
        SimTime::ZERO,
        Periodicity::OnTimeAdvance,
        move |_sim: &mut Simulator, _w: &mut dyn World| {
            *c.lock().expect("count lock") += 1;
        },
    );
    assert_eq!((first, second), (EventId(0), EventId(1)));
    sim.schedule(SimTime(4), |_sim: &mut Simulator, _w: &mut dyn World| {});

    let mut world = DummyWorld::default();
    sim.run(SimTime(12), &mut world);

    assert_eq!(*count.lock().expect("count lock"), 0);
    assert_eq!(sim.pending_events(), 1);
}

/// 两个玩具节点：n0 第二次被调用时“发送”一帧，n1 记录看到帧的时刻。
#[derive(Default)]
struct ToyWorld {
    calls: [Vec<(SimTime, SimTime)>; 2],
    outbox: usize,
    inbox: usize,
    seen: Vec<SimTime>,
    wakeups: Vec<usize>,
}

impl World for ToyWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn node_count(&self) -> usize {
        2
    }

    fn run_node(&mut self, idx: usize, elapsed: SimTime, now: SimTime) -> Option<SimTime> {
        self.calls[idx].push((now, elapsed));
        match idx {
            0 if self.calls[0].len() == 1 => Some(SimTime(5)),
            0 if self.calls[0].len() == 2 => {
                self.outbox += 1;
                None
            }
            1 if self.inbox > 0 => {
                self.inbox = 0;
                self.seen.push(now);
                None
            }
            _ => None,
        }
    }

    fn distribute_frames(&mut self, _now: SimTime) -> usize {
        let n = std::mem::take(&mut self.outbox);
        self.inbox += n;
        n
    }

    fn take_wakeups(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.wakeups)
    }
}

#[test]
fn receiver_sees_frame_in_the_same_tick_it_was_sent() {
    let mut sim = Simulator::default();
    let mut world = ToyWorld::default();
    sim.run(SimTime(100), &mut world);

    assert_eq!(world.seen, vec![SimTime(5)]);
    // n0：t=0 首次调用，t=5 倒计时到期（经过 5us）
    assert_eq!(world.calls[0][1], (SimTime(5), SimTime(5)));
    // n1 在零延迟重入时被调用，并拿到自上次调用以来的全部经过时间
    assert!(world.calls[1].contains(&(SimTime(5), SimTime(5))));
}

#[test]
fn woken_node_is_invoked_without_advancing_time() {
    let mut sim = Simulator::default();
    sim.schedule(SimTime(7), |_sim: &mut Simulator, w: &mut dyn World| {
        let w = w
            .as_any_mut()
            .downcast_mut::<ToyWorld>()
            .expect("world must be ToyWorld");
        w.wakeups.push(1);
    });
    let mut world = ToyWorld::default();
    sim.run(SimTime(20), &mut world);

    assert!(world.calls[1].iter().any(|&(now, _)| now == SimTime(7)));
}
