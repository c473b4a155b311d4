//! ActionRegistry - action tag と handler の対応表
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Arc による共有所有権
//!
//! 初期化時に `&mut` で組み立て、DispatchLoop に渡した後は読むだけ。
//! 実行中の再登録は型の上で起こり得ない（ロック不要）。

use super::handler::ActionHandler;
use crate::domain::ActionName;
use std::collections::HashMap;
use std::sync::Arc;

/// 登録エントリ（最小引数個数 + handler）
#[derive(Clone)]
pub struct ActionEntry {
    min_args: usize,
    handler: Arc<dyn ActionHandler>,
}

impl ActionEntry {
    pub fn min_args(&self) -> usize {
        self.min_args
    }

    pub fn handler(&self) -> Arc<dyn ActionHandler> {
        Arc::clone(&self.handler)
    }
}

/// ActionRegistry は action ごとの handler を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = ActionRegistry::new();
/// registry.register("regenerate-apprc", 1, handler)?;
///
/// let entry = registry.get(&ActionName::new("regenerate-apprc"));
/// ```
#[derive(Default)]
pub struct ActionRegistry {
    entries: HashMap<ActionName, ActionEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for action '{0}' is already registered")]
    AlreadyRegistered(ActionName),
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register<H: ActionHandler + 'static>(
        &mut self,
        action: impl Into<ActionName>,
        min_args: usize,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register_arc(action, min_args, Arc::new(handler))
    }

    pub fn register_arc(
        &mut self,
        action: impl Into<ActionName>,
        min_args: usize,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), RegistryError> {
        let action = action.into();
        if self.entries.contains_key(&action) {
            return Err(RegistryError::AlreadyRegistered(action));
        }
        self.entries.insert(action, ActionEntry { min_args, handler });
        Ok(())
    }

    pub fn get(&self, action: &ActionName) -> Option<&ActionEntry> {
        self.entries.get(action)
    }

    /// 名前順
    pub fn registered_actions(&self) -> Vec<ActionName> {
        let mut actions: Vec<ActionName> = self.entries.keys().cloned().collect();
        actions.sort();
        actions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::HandleOutcome;
    use crate::domain::{ActionError, Message};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl ActionHandler for Noop {
        async fn handle(&self, _message: &Message) -> Result<HandleOutcome, ActionError> {
            Ok(HandleOutcome::default())
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ActionRegistry::new();
        registry.register("regenerate-apprc", 1, Noop).unwrap();

        let entry = registry.get(&ActionName::new("regenerate-apprc"));
        assert!(entry.is_some());
        assert_eq!(entry.map(ActionEntry::min_args), Some(1));
        assert!(registry.get(&ActionName::new("deploy")).is_none());
    }

    #[test]
    fn test_double_registration() {
        let mut registry = ActionRegistry::new();
        registry.register("regenerate-apprc", 1, Noop).unwrap();
        let result = registry.register("regenerate-apprc", 2, Noop);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
        // 最初の登録が残る
        assert_eq!(
            registry.get(&ActionName::new("regenerate-apprc")).map(ActionEntry::min_args),
            Some(1)
        );
    }

    #[test]
    fn test_registered_actions_are_sorted() {
        let mut registry = ActionRegistry::new();
        registry.register("scale", 2, Noop).unwrap();
        registry.register("deploy", 1, Noop).unwrap();
        registry.register("regenerate-apprc", 1, Noop).unwrap();

        assert_eq!(
            registry.registered_actions(),
            vec![
                ActionName::new("deploy"),
                ActionName::new("regenerate-apprc"),
                ActionName::new("scale"),
            ]
        );
        assert_eq!(registry.len(), 3);
    }
}
