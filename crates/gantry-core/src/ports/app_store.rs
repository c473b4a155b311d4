//! AppStore port - App レコードの正本（読み取り専用）

use async_trait::async_trait;

use crate::domain::App;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("app {0} not found")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// AppStore は App を名前で引く
///
/// 並行に使われるので `Send + Sync` を要求する。
#[async_trait]
pub trait AppStore: Send + Sync {
    async fn get_app(&self, name: &str) -> Result<App, StoreError>;
}
