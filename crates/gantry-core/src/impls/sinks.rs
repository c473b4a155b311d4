//! EventSink の実装
//!
//! - **TracingSink**: tracing に流す（本番用）
//! - **MemorySink**: 失敗行を順番どおりに保持する（テスト用）

use crate::domain::{ActionError, ActionName};
use crate::ports::EventSink;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info};

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn failure(&self, err: &ActionError) {
        error!(action = %err.action(), app = err.app(), "{err}");
    }

    fn handled(&self, action: &ActionName, app: Option<&str>, units: usize) {
        info!(%action, app, units, "message handled");
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    failures: Mutex<Vec<String>>,
    handled: Mutex<Vec<ActionName>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録された失敗行
    pub fn lines(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn handled_actions(&self) -> Vec<ActionName> {
        self.handled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for MemorySink {
    fn failure(&self, err: &ActionError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err.to_string());
    }

    fn handled(&self, action: &ActionName, _app: Option<&str>, _units: usize) {
        self.handled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action.clone());
    }
}
