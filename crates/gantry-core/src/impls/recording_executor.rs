//! RecordingExecutor - 呼び出しを記録するだけの executor（テスト・デモ用）

use crate::domain::MachineId;
use crate::ports::{ExecError, RemoteExecutor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub machine: MachineId,
    pub command: String,
}

#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<ExecCall>>,
    failures: Mutex<HashMap<MachineId, ExecError>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以後 `machine` 宛ての呼び出しは `error` で失敗する（呼び出し自体は記録される）
    pub fn fail_on(&self, machine: MachineId, error: ExecError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(machine, error);
    }

    pub fn calls(&self) -> Vec<ExecCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RemoteExecutor for RecordingExecutor {
    async fn run(&self, machine: MachineId, command: &str) -> Result<(), ExecError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ExecCall {
                machine,
                command: command.to_string(),
            });
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&machine)
        {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
