//! RemoteExecutor port - Unit のホストでコマンドを実行
//!
//! 転送手段（ssh, juju, agent API ...）は実装側の責務。
//! タイムアウトもこの core では課さない。必要なら `TimeoutExecutor` で包む。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::MachineId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("could not spawn executor: {0}")]
    Spawn(String),

    #[error("command failed: {0}")]
    Failed(String),

    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
}

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn run(&self, machine: MachineId, command: &str) -> Result<(), ExecError>;
}

#[async_trait]
impl<E: RemoteExecutor + ?Sized> RemoteExecutor for Arc<E> {
    async fn run(&self, machine: MachineId, command: &str) -> Result<(), ExecError> {
        (**self).run(machine, command).await
    }
}

/// 呼び出し側が決めたタイムアウトを executor に通すラッパー
pub struct TimeoutExecutor<E> {
    inner: E,
    timeout: Duration,
}

impl<E: RemoteExecutor> TimeoutExecutor<E> {
    pub fn new(inner: E, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<E: RemoteExecutor> RemoteExecutor for TimeoutExecutor<E> {
    async fn run(&self, machine: MachineId, command: &str) -> Result<(), ExecError> {
        match tokio::time::timeout(self.timeout, self.inner.run(machine, command)).await {
            Ok(result) => result,
            Err(_) => Err(ExecError::TimedOut(self.timeout)),
        }
    }
}
