//! MAC 状态机的两级状态

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendingSubstate {
    /// 选择目的站、出队、计算长度
    Init,
    TransmitRts,
    TransmitData,
    /// 帧在空口上，倒计时到发送结束
    WaitForPhy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivingSubstate {
    Processing,
    /// SIFS 后请求发送响应帧
    Responding,
    /// 响应帧在空口上
    TxEndRequest,
    NavWait,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MacState {
    #[default]
    Idle,
    Contention,
    SendingData(SendingSubstate),
    WaitForRx,
    Receiving(ReceivingSubstate),
    Eifs,
}
