//! Errors - Message 処理の失敗分類
//!
//! `ActionError` の Display はそのまま失敗ログの 1 行になる。
//! 下流のツールがこの書式をパースするので、文言は変えないこと。
//!
//! # 分類
//! - InvalidAction: registry に無い action
//! - InsufficientArguments: 引数不足（Validator が検出）
//! - AppNotFound / Store: App の読み込み失敗
//! - WrongState: 前提条件（state == started）違反
//! - UnitExecution: Unit 単位の実行失敗（部分成功と共存しうる唯一の種類）
//! - HandlerPanicked: handler タスクの panic
//! - Dropped: 受信済みだが stop() までに処理されなかった Message
//!
//! どれもその Message に対して終端的で、リトライはしない。

use crate::domain::{ActionName, AppState, MachineId};
use crate::ports::{ExecError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Error handling \"{action}\": invalid action.")]
    InvalidAction { action: ActionName },

    #[error(
        "Error handling \"{action}\": this action requires at least {min_args} {}.",
        plural_argument(.min_args)
    )]
    InsufficientArguments { action: ActionName, min_args: usize },

    #[error("Error handling \"{action}\": app \"{app}\" does not exist.")]
    AppNotFound { action: ActionName, app: String },

    #[error("Error handling \"{action}\": could not load app \"{app}\": {source}.")]
    Store {
        action: ActionName,
        app: String,
        #[source]
        source: StoreError,
    },

    #[error(
        "Error handling \"{action}\" for the app \"{app}\": The status of the app should be \"{expected}\", but it is \"{actual}\"."
    )]
    WrongState {
        action: ActionName,
        app: String,
        expected: AppState,
        actual: AppState,
    },

    #[error(
        "Error handling \"{action}\" for the app \"{app}\": unit \"{unit}\" on machine {machine} failed: {source}."
    )]
    UnitExecution {
        action: ActionName,
        app: String,
        unit: String,
        machine: MachineId,
        #[source]
        source: ExecError,
    },

    #[error("Error handling \"{action}\": the handler panicked.")]
    HandlerPanicked { action: ActionName },

    #[error("Error handling \"{action}\": the dispatcher stopped before the message was handled.")]
    Dropped { action: ActionName },
}

impl ActionError {
    pub fn action(&self) -> &ActionName {
        match self {
            ActionError::InvalidAction { action }
            | ActionError::InsufficientArguments { action, .. }
            | ActionError::AppNotFound { action, .. }
            | ActionError::Store { action, .. }
            | ActionError::WrongState { action, .. }
            | ActionError::UnitExecution { action, .. }
            | ActionError::HandlerPanicked { action }
            | ActionError::Dropped { action } => action,
        }
    }

    /// 解決できた場合のみ app 名を返す
    pub fn app(&self) -> Option<&str> {
        match self {
            ActionError::AppNotFound { app, .. }
            | ActionError::Store { app, .. }
            | ActionError::WrongState { app, .. }
            | ActionError::UnitExecution { app, .. } => Some(app),
            ActionError::InvalidAction { .. }
            | ActionError::InsufficientArguments { .. }
            | ActionError::HandlerPanicked { .. }
            | ActionError::Dropped { .. } => None,
        }
    }

    pub fn is_unit_failure(&self) -> bool {
        matches!(self, ActionError::UnitExecution { .. })
    }
}

fn plural_argument(n: &usize) -> &'static str {
    if *n == 1 { "argument" } else { "arguments" }
}
