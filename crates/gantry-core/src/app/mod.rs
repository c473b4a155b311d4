//! App - アプリケーション層
//!
//! このモジュールは ports と actions を組み合わせて dispatcher を実装します。
//!
//! # 主要コンポーネント
//! - **DispatcherBuilder**: 構築とワイヤリング（registry はここで閉じる）
//! - **DispatchLoop**: Message 処理ループ（recv→lookup→validate→handle→record）
//! - **Dispatcher**: start/stop（冪等）

pub mod builder;
pub mod dispatch_loop;
pub mod dispatcher;

pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::dispatch_loop::DispatchLoop;
pub use self::dispatcher::{Dispatcher, DispatcherError};
