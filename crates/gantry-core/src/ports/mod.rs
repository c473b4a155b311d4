//! Ports - 外部コラボレーターとの境界
//!
//! 各 trait はキュー・ストア・リモート実行・ログ出力への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//! どの実装も並行利用に耐えることを前提とし、core 側ではロックを持たない。

pub mod queue;
pub mod app_store;
pub mod executor;
pub mod event_sink;

pub use self::queue::{MessageQueue, QueueError, Subscription};
pub use self::app_store::{AppStore, StoreError};
pub use self::executor::{ExecError, RemoteExecutor, TimeoutExecutor};
pub use self::event_sink::EventSink;
