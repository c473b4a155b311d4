//! gantry-core
//!
//! PaaS コントロールプレーンの action dispatch core。
//! キューから届いた Message（action tag + 引数）を検証し、
//! App の状態を確認したうえで各 Unit へのリモートコマンドに変換して実行する。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（App, Unit, EnvVar, Message, ActionError）
//! - **ports**: 外部コラボレーター（MessageQueue, AppStore, RemoteExecutor, EventSink）
//! - **actions**: ActionRegistry, Validator, handler（regenerate-apprc）
//! - **app**: DispatcherBuilder, DispatchLoop, Dispatcher
//! - **impls**: ports の実装（InMemoryQueue, ShellExecutor など）
//! - **config**: DispatchConfig
//! - **observability**: ログ初期化とカウンタ

pub mod domain;
pub mod ports;
pub mod actions;
pub mod app;
pub mod impls;
pub mod config;
pub mod observability;

pub use self::app::{Dispatcher, DispatcherBuilder, DispatcherError};
pub use self::config::DispatchConfig;
pub use self::domain::{ActionError, Message};
