//! EventSink port - 処理結果の記録
//!
//! 失敗は `ActionError` の Display（固定書式の 1 行）として記録される。
//!
//! # 実装
//! - TracingSink: tracing へ出力（本番用）
//! - MemorySink: 行を保持（テスト用）

use crate::domain::{ActionError, ActionName};

pub trait EventSink: Send + Sync {
    /// 失敗 1 件につき 1 回呼ばれる（unit 失敗も個別に）
    fn failure(&self, error: &ActionError);

    /// Message の処理が失敗なく完了した
    fn handled(&self, action: &ActionName, app: Option<&str>, units: usize);
}
