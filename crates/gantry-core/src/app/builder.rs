//! DispatcherBuilder - Dispatcher の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//!
//! registry を組み立てられるのはここだけ。`build()` の後は閉じている。

use std::sync::Arc;

use super::dispatch_loop::DispatchLoop;
use super::dispatcher::Dispatcher;
use crate::actions::{
    ActionHandler, ActionRegistry, ApprcTemplate, REGENERATE_APPRC, RegenerateApprc,
    RegistryError,
};
use crate::config::DispatchConfig;
use crate::impls::TracingSink;
use crate::observability::DispatchStats;
use crate::ports::{AppStore, EventSink, MessageQueue, RemoteExecutor, TimeoutExecutor};

/// DispatcherBuilder は Dispatcher を構築
///
/// # 使用例
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .queue(queue)
///     .register_regenerate_apprc(store, executor, template)?
///     .expect_actions(&["regenerate-apprc"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_actions() で期待される action を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
pub struct DispatcherBuilder {
    registry: ActionRegistry,
    expected_actions: Option<Vec<String>>,
    queue: Option<Arc<dyn MessageQueue>>,
    sink: Arc<dyn EventSink>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing actions: {0:?}. These actions were expected but not registered.")]
    MissingActions(Vec<String>),

    #[error("no message queue was configured")]
    MissingQueue,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registry: ActionRegistry::new(),
            expected_actions: None,
            queue: None,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn queue(mut self, queue: Arc<dyn MessageQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// 既定は TracingSink
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn register<H: ActionHandler + 'static>(
        mut self,
        action: &str,
        min_args: usize,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register(action, min_args, handler)?;
        Ok(self)
    }

    pub fn register_regenerate_apprc(
        self,
        store: Arc<dyn AppStore>,
        executor: Arc<dyn RemoteExecutor>,
        template: ApprcTemplate,
    ) -> Result<Self, RegistryError> {
        self.register(
            REGENERATE_APPRC,
            RegenerateApprc::MIN_ARGS,
            RegenerateApprc::new(store, executor, template),
        )
    }

    /// 設定から標準の action 一式を登録する。
    ///
    /// `exec_timeout_ms` があれば executor を `TimeoutExecutor` で包む。
    pub fn standard_actions(
        self,
        config: &DispatchConfig,
        store: Arc<dyn AppStore>,
        executor: Arc<dyn RemoteExecutor>,
    ) -> Result<Self, RegistryError> {
        let executor: Arc<dyn RemoteExecutor> = match config.exec_timeout() {
            Some(timeout) => Arc::new(TimeoutExecutor::new(executor, timeout)),
            None => executor,
        };
        self.register_regenerate_apprc(store, executor, ApprcTemplate::from(config))
    }

    pub fn expect_actions(mut self, actions: &[&str]) -> Self {
        self.expected_actions = Some(actions.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(expected) = &self.expected_actions {
            let registered = self.registry.registered_actions();
            let missing: Vec<String> = expected
                .iter()
                .filter(|a| !registered.iter().any(|r| r.as_str() == a.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingActions(missing));
            }
        }
        let queue = self.queue.ok_or(BuildError::MissingQueue)?;

        let stats = Arc::new(DispatchStats::default());
        let dispatch_loop = Arc::new(DispatchLoop::new(
            Arc::new(self.registry),
            self.sink,
            Arc::clone(&stats),
        ));
        Ok(Dispatcher::new(queue, dispatch_loop, stats))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionName, App, AppState, MachineId, Message, Unit};
    use crate::impls::{InMemoryAppStore, InMemoryQueue, RecordingExecutor};
    use crate::ports::ExecError;
    use async_trait::async_trait;
    use std::time::Duration;

    fn template() -> ApprcTemplate {
        ApprcTemplate::new("gantry", "/home/application/apprc")
    }

    #[test]
    fn test_build_success() {
        let dispatcher = DispatcherBuilder::new()
            .queue(Arc::new(InMemoryQueue::default()))
            .register_regenerate_apprc(
                Arc::new(InMemoryAppStore::new()),
                Arc::new(RecordingExecutor::new()),
                template(),
            )
            .unwrap()
            .expect_actions(&[REGENERATE_APPRC])
            .build()
            .unwrap();
        assert_eq!(
            dispatcher.registry().registered_actions(),
            vec![ActionName::new(REGENERATE_APPRC)]
        );
    }

    #[test]
    fn test_build_missing_actions() {
        let result = DispatcherBuilder::new()
            .queue(Arc::new(InMemoryQueue::default()))
            .register_regenerate_apprc(
                Arc::new(InMemoryAppStore::new()),
                Arc::new(RecordingExecutor::new()),
                template(),
            )
            .unwrap()
            .expect_actions(&[REGENERATE_APPRC, "deploy"])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingActions(missing)) if missing == vec!["deploy".to_string()]
        ));
    }

    #[test]
    fn test_build_without_queue() {
        assert!(matches!(
            DispatcherBuilder::new().build(),
            Err(BuildError::MissingQueue)
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let result = DispatcherBuilder::new()
            .register_regenerate_apprc(
                Arc::new(InMemoryAppStore::new()),
                Arc::new(RecordingExecutor::new()),
                template(),
            )
            .unwrap()
            .register_regenerate_apprc(
                Arc::new(InMemoryAppStore::new()),
                Arc::new(RecordingExecutor::new()),
                template(),
            );
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    struct Hanging;

    #[async_trait]
    impl RemoteExecutor for Hanging {
        async fn run(&self, _machine: MachineId, _command: &str) -> Result<(), ExecError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_standard_actions_thread_the_configured_timeout() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert(
            App::new("nemesis", AppState::Started)
                .with_unit(Unit::new("nemesis/0", MachineId::new(19))),
        );
        let config = DispatchConfig {
            exec_timeout_ms: Some(20),
            ..DispatchConfig::default()
        };
        let dispatcher = DispatcherBuilder::new()
            .queue(Arc::new(InMemoryQueue::default()))
            .standard_actions(&config, store, Arc::new(Hanging))
            .unwrap()
            .build()
            .unwrap();

        let outcome = dispatcher
            .handle(Message::new(REGENERATE_APPRC, ["nemesis"]))
            .await
            .unwrap();

        assert_eq!(outcome.unit_failures.len(), 1);
        assert!(
            outcome.unit_failures[0]
                .to_string()
                .ends_with("failed: command timed out after 20ms.")
        );
    }
}
