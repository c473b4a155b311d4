//! Dispatcher - DispatchLoop の start/stop
//!
//! # 学習ポイント
//! - watch チャネルによる shutdown 通知（worker と同じ作法）
//! - JoinHandle を await して「バックグラウンド処理が残っていない」ことを保証
//!
//! # 冪等性
//! - start() 中に start() → `DispatcherError::AlreadyStarted`（同じキューへの二重購読を防ぐ）
//! - 一度も start していない / start に失敗した後の stop() → 何もしない
//!
//! Dispatcher を stop せずに drop すると shutdown の sender も drop され、
//! ループは次の待ちで抜ける。

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::dispatch_loop::DispatchLoop;
use crate::actions::{ActionRegistry, HandleOutcome};
use crate::domain::{ActionError, Message};
use crate::observability::{DispatchCounts, DispatchStats};
use crate::ports::{MessageQueue, QueueError};

#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    #[error("dispatcher is already started")]
    AlreadyStarted,

    #[error("could not subscribe to the queue: {0}")]
    Subscribe(#[from] QueueError),
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

pub struct Dispatcher {
    queue: Arc<dyn MessageQueue>,
    dispatch_loop: Arc<DispatchLoop>,
    stats: Arc<DispatchStats>,
    running: Mutex<Option<Running>>,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: Arc<dyn MessageQueue>,
        dispatch_loop: Arc<DispatchLoop>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            queue,
            dispatch_loop,
            stats,
            running: Mutex::new(None),
        }
    }

    /// 購読を張ってバックグラウンドタスクで処理を始める。
    ///
    /// 購読に失敗した場合は何も起動せずにエラーを返す。
    pub async fn start(&self) -> Result<(), DispatcherError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(DispatcherError::AlreadyStarted);
        }

        let subscription = self.queue.subscribe().await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatch_loop = Arc::clone(&self.dispatch_loop);
        let join = tokio::spawn(async move {
            dispatch_loop.run(subscription, shutdown_rx).await;
        });

        *running = Some(Running { shutdown_tx, join });
        info!(
            actions = self.dispatch_loop.registry().len(),
            "dispatcher started"
        );
        Ok(())
    }

    /// 購読を閉じ、ループの終了を待つ。
    ///
    /// 次の Message 待ちはすぐ中断される。実行中の handler は完了まで待つ。
    /// 購読に残っていた Message は処理せず、1 件ずつ Dropped として記録される。
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(Running { shutdown_tx, join }) = running.take() else {
            return;
        };

        // ignore send error: the loop may already have exited on its own
        let _ = shutdown_tx.send(true);
        if let Err(e) = join.await {
            warn!(error = %e, "dispatch loop task ended abnormally");
        }
        info!("dispatcher stopped");
    }

    /// ループタスクが動いているか
    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.join.is_finished())
    }

    /// キューを通さずに 1 件処理する（結果は通常どおり記録される）
    pub async fn handle(&self, message: Message) -> Result<HandleOutcome, ActionError> {
        self.dispatch_loop.handle(message).await
    }

    pub fn registry(&self) -> &ActionRegistry {
        self.dispatch_loop.registry()
    }

    pub fn stats(&self) -> DispatchCounts {
        self.stats.snapshot()
    }
}
