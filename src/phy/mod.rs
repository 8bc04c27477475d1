//! 物理层边界
//!
//! MAC 只通过 `PhyRequest` / `PhyIndication` 与 PHY 交互；`AbstractPhy`
//! 是一个把 MAC 帧变为定时信道占用（以及反向）的黑盒实现。

mod abstract_phy;
mod timing;
mod types;

pub use abstract_phy::{AbstractPhy, PhyConfig};
pub use timing::{PhyRate, RX_PHY_START_DELAY};
pub use types::{Bandwidth, FrameFormat, PhyIndication, PhyRequest, PhyRequestKind, RxVector};
