//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueue**: 開発用の Message キュー
//! - **InMemoryAppStore**: テスト・デモ用の App ストア
//! - **ShellExecutor**: `juju ssh` などの外部コマンドを使う executor
//! - **RecordingExecutor**: 呼び出しを記録する executor
//! - **TracingSink / MemorySink**: 処理結果の出力先
//!
//! 本番のキュー・ストアは別クレートで ports を実装する想定。

pub mod inmem_queue;
pub mod memory_store;
pub mod shell_executor;
pub mod recording_executor;
pub mod sinks;

pub use self::inmem_queue::InMemoryQueue;
pub use self::memory_store::InMemoryAppStore;
pub use self::shell_executor::ShellExecutor;
pub use self::recording_executor::{ExecCall, RecordingExecutor};
pub use self::sinks::{MemorySink, TracingSink};
