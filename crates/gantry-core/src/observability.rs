//! Observability - ログ初期化と処理カウンタ

use serde::{Deserialize, Serialize};
use std::sync::Once;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::{ActionName, DeliveryId};

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 本番用
    Json,
    #[default]
    Pretty,
}

/// ログを初期化する。2 回目以降の呼び出しは何もしない。
///
/// `RUST_LOG` でレベルを制御する（既定は `info`）。
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// テスト用。テスト出力に流す。
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 1 回の配送を囲む span
pub fn dispatch_span(delivery_id: DeliveryId, action: &ActionName) -> Span {
    tracing::info_span!("dispatch", delivery_id = %delivery_id, action = %action)
}

/// DispatchStats の時点スナップショット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub received: u64,
    /// handler が Ok を返した Message（unit 失敗を含みうる）
    pub handled: u64,
    /// Message 全体が失敗した件数
    pub failed: u64,
    pub unit_failures: u64,
    /// stop() 時にバッファに残っていた Message
    pub dropped: u64,
}

/// 累積カウンタ。stop/start をまたいで保持される。
#[derive(Debug, Default)]
pub struct DispatchStats {
    received: AtomicU64,
    handled: AtomicU64,
    failed: AtomicU64,
    unit_failures: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unit_failures(&self, n: usize) {
        self.unit_failures.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            received: self.received.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unit_failures: self.unit_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
