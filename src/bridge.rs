use crate::BridgeResult;
use crate::message::BridgeMsg;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// 桥接层分发接口
///
/// 由宿主提供，负责把消息广播给除来源之外的所有平台。
#[async_trait]
pub trait Bridge: Send + Sync {
    async fn send(&self, msg: BridgeMsg) -> BridgeResult<()>;
}

/// 基于 mpsc 通道的桥接实现，消息交由通道另一端的分发循环处理
#[derive(Clone)]
pub struct ChannelBridge {
    tx: mpsc::Sender<BridgeMsg>,
}

impl ChannelBridge {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<BridgeMsg>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Bridge for ChannelBridge {
    async fn send(&self, msg: BridgeMsg) -> BridgeResult<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| "bridge channel closed".into())
    }
}
