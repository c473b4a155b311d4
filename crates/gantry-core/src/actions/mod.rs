//! Actions - action registry と handler
//!
//! # 構成
//! - **ActionHandler**: Message を 1 件処理する object-safe trait
//! - **ActionRegistry**: action tag → (最小引数個数, handler)
//! - **validator**: 引数個数の共通チェック
//! - **RegenerateApprc**: 標準 handler（`regenerate-apprc`）

pub mod handler;
pub mod registry;
pub mod validator;
pub mod regenerate_apprc;

pub use self::handler::{ActionHandler, HandleOutcome};
pub use self::registry::{ActionEntry, ActionRegistry, RegistryError};
pub use self::regenerate_apprc::{ApprcTemplate, REGENERATE_APPRC, RegenerateApprc};
