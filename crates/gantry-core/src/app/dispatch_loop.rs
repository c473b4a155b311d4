//! DispatchLoop - Message 処理ループ
//!
//! # フロー（1 件ごと）
//! 1. Subscription::recv() で Message を受け取る（shutdown と select で競合させる）
//! 2. ActionRegistry で action を引く（無ければ InvalidAction）
//! 3. Validator で引数個数を検査
//! 4. handler を実行（専用タスク。panic してもループは止まらない）
//! 5. 結果を EventSink に記録（unit 失敗は 1 件ずつ）
//!
//! 1 件の処理が完全に終わるまで次の Message は取りに行かない。
//! どの失敗もループを止めない。
//! 抜けるときにバッファに残っていた Message は 1 件ずつ Dropped として記録する。

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{Instrument, Span, debug, error, warn};

use crate::actions::{ActionRegistry, HandleOutcome, validator};
use crate::domain::{ActionError, DeliveryId, Message};
use crate::observability::{DispatchStats, dispatch_span};
use crate::ports::{EventSink, Subscription};

pub struct DispatchLoop {
    registry: Arc<ActionRegistry>,
    sink: Arc<dyn EventSink>,
    stats: Arc<DispatchStats>,
}

impl DispatchLoop {
    pub fn new(
        registry: Arc<ActionRegistry>,
        sink: Arc<dyn EventSink>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            registry,
            sink,
            stats,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Message を 1 件処理して結果を記録する。
    ///
    /// 戻り値は記録済みなので、呼び出し側で再度ログに出す必要はない。
    pub async fn handle(&self, message: Message) -> Result<HandleOutcome, ActionError> {
        self.stats.record_received();
        let span = dispatch_span(DeliveryId::generate(), &message.action);
        let action = message.action.clone();

        let result = self.route(message).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(outcome) => {
                self.stats.record_handled();
                self.stats.record_unit_failures(outcome.unit_failures.len());
                for failure in &outcome.unit_failures {
                    self.sink.failure(failure);
                }
                self.sink
                    .handled(&action, outcome.app.as_deref(), outcome.units_succeeded());
            }
            Err(err) => {
                self.stats.record_failed();
                self.sink.failure(err);
            }
        });
        result
    }

    fn record_dropped(&self, message: Message) {
        let span = dispatch_span(DeliveryId::generate(), &message.action);
        span.in_scope(|| {
            self.stats.record_dropped();
            self.sink.failure(&ActionError::Dropped {
                action: message.action,
            });
        });
    }

    async fn route(&self, message: Message) -> Result<HandleOutcome, ActionError> {
        let Some(entry) = self.registry.get(&message.action) else {
            return Err(ActionError::InvalidAction {
                action: message.action,
            });
        };
        validator::validate(&message, entry.min_args())?;

        let handler = entry.handler();
        let action = message.action.clone();
        let task = tokio::spawn(
            async move { handler.handle(&message).await }.instrument(Span::current()),
        );
        match task.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(error = %join_err, "handler task did not complete");
                Err(ActionError::HandlerPanicked { action })
            }
        }
    }

    /// shutdown が立つか、キューが購読を閉じるまで処理を続ける。
    ///
    /// shutdown は「次の Message 待ち」を即座に中断するが、実行中の handler は最後まで走らせる。
    pub(crate) async fn run(
        &self,
        mut subscription: Subscription,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let message = tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    // sender が drop された = Dispatcher ごと消えた
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                message = subscription.recv() => message,
            };

            let Some(message) = message else {
                warn!("queue closed the subscription; dispatch loop exiting");
                break;
            };

            // 結果は handle() の中で記録済み
            let _ = self.handle(message).await;
        }

        let remaining = subscription.drain();
        if !remaining.is_empty() {
            warn!(count = remaining.len(), "dropping messages left in the subscription");
        }
        for message in remaining {
            self.record_dropped(message);
        }
        subscription.close();
        debug!("dispatch loop exited");
    }
}
