//! MessageQueue port - Message の配送キュー
//!
//! 配送保証（at-least-once / at-most-once）は実装側が決める。
//! DispatchLoop はどちらでも壊れないように、handler を冪等に保つ。
//!
//! # 実装
//! - **InMemoryQueue**: 開発・テスト用（impls/inmem_queue.rs）

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::Message;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue connection failed: {0}")]
    Connection(String),

    #[error("no subscriber is listening on the queue")]
    NoSubscriber,

    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}

/// 購読ハンドル（受信チャネル + close 関数）
///
/// `close()` を呼ぶか drop すると購読が解除される。
pub struct Subscription {
    receiver: mpsc::Receiver<Message>,
    closer: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    pub fn new(
        receiver: mpsc::Receiver<Message>,
        closer: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            closer: Some(Box::new(closer)),
        }
    }

    /// 次の Message を待つ。キュー側が閉じたら None。
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// 受信側を閉じ、バッファに残っている Message を取り出す。
    ///
    /// 閉じた後の publish は届かないので、ここで返したもので全部になる。
    pub fn drain(&mut self) -> Vec<Message> {
        self.receiver.close();
        let mut remaining = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            remaining.push(message);
        }
        remaining
    }

    pub fn close(mut self) {
        self.run_closer();
    }

    fn run_closer(&mut self) {
        self.receiver.close();
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_closer();
    }
}

/// MessageQueue は Message を配送するためのキュー
///
/// # 設計原則
/// - subscribe は購読ごとに独立したチャネルを返す
/// - publish は producer 側（他サブシステム）が使う
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn subscribe(&self) -> Result<Subscription, QueueError>;

    async fn publish(&self, message: Message) -> Result<(), QueueError>;
}
