//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件，如仿真时间、事件、世界、仿真器和场景文件格式。

// 子模块声明
mod event;
mod scenario;
mod scheduled_event;
mod simulator;
mod time;
mod world;

// 重新导出公共接口
pub use event::{Event, EventId, Periodicity};
pub use scenario::{
    BroadcastKeyword, DestinationSpec, NodeSpec, SCENARIO_SCHEMA_VERSION, ScenarioSpec,
    TrafficSpec,
};
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
