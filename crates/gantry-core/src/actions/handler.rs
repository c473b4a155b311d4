//! ActionHandler trait - action を実行する handler の定義
//!
//! # 学習ポイント
//! - Object-safe trait（`Arc<dyn ActionHandler>` で registry に格納）
//! - 部分成功の表現（`HandleOutcome::unit_failures`）

use async_trait::async_trait;

use crate::domain::{ActionError, Message};

/// ActionHandler は Message を 1 件処理する
///
/// 呼ばれる時点で引数の個数は Validator で検査済み。
/// `Err` はその Message 全体の失敗、unit 単位の失敗は `HandleOutcome` に積む。
///
/// # 使用例
/// ```ignore
/// struct Noop;
///
/// #[async_trait]
/// impl ActionHandler for Noop {
///     async fn handle(&self, _message: &Message) -> Result<HandleOutcome, ActionError> {
///         Ok(HandleOutcome::default())
///     }
/// }
/// ```
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<HandleOutcome, ActionError>;
}

/// 1 件の Message 処理の結果
#[derive(Debug, Default)]
pub struct HandleOutcome {
    pub app: Option<String>,
    pub units_total: usize,
    pub unit_failures: Vec<ActionError>,
}

impl HandleOutcome {
    pub fn for_app(app: impl Into<String>, units_total: usize) -> Self {
        Self {
            app: Some(app.into()),
            units_total,
            unit_failures: Vec::new(),
        }
    }

    pub fn units_succeeded(&self) -> usize {
        self.units_total.saturating_sub(self.unit_failures.len())
    }

    pub fn is_clean(&self) -> bool {
        self.unit_failures.is_empty()
    }
}
