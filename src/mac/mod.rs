//! EDCA MAC 层
//!
//! 每个接口一个 `EdcaMac` 实例。MAC 只通过 `run(elapsed, indication)` 被驱动：
//! 输入距上次调用经过的时间和（可选的）一个 PHY 指示，输出（可选的）PHY 请求、
//! 要交给 PHY 的帧，以及下一次希望被调用的时间。

mod ac;
mod block_ack;
mod config;
mod contention;
mod edca;
mod frame;
mod observer;
mod rate_control;
mod receiving;
mod retry;
mod sending;
mod seqnum;
mod state;
mod timers;
mod wait_for_rx;

pub use ac::AccessCategory;
pub use block_ack::{BaBitmap, BaRecord, BaUpdate, update_ba_bitmap};
pub use config::{EdcaParams, EdcaTable, MacConfig, RateControlKind};
pub use edca::{EdcaMac, MacOutput};
pub use frame::{
    ACK_LEN, AckPolicy, BlockAckInfo, CTS_LEN, FrameType, MAX_MSDU_LEN, MacFrame, RTS_LEN, Subframe,
    ampdu_length, block_ack_length, mpdu_length,
};
pub use observer::MacEvent;
pub use rate_control::{Arf, FixedRate, RateControl};
pub use retry::{ContentionWindow, RetryCounters, RetryOutcome};
pub use seqnum::{SEQ_MODULO, SequenceNumbers, seq_add, seq_sub};
pub use state::{MacState, ReceivingSubstate, SendingSubstate};
pub use timers::{TimerKind, TimerTable};
