//! ShellExecutor - 外部コマンド経由でマシンにコマンドを送る
//!
//! `<program> <args..> <machine> <command>` を起動する。既定は `juju ssh`。

use crate::domain::MachineId;
use crate::ports::{ExecError, RemoteExecutor};
use async_trait::async_trait;
use tokio::process::Command;

pub struct ShellExecutor {
    program: String,
    args: Vec<String>,
}

impl ShellExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, machine: MachineId, command: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(machine.to_string())
            .arg(command)
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("juju", vec!["ssh".to_string()])
    }
}

#[async_trait]
impl RemoteExecutor for ShellExecutor {
    async fn run(&self, machine: MachineId, command: &str) -> Result<(), ExecError> {
        let output = self
            .command(machine, command)
            .output()
            .await
            .map_err(|e| ExecError::Spawn(format!("{}: {e}", self.program)))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        };
        Err(ExecError::Failed(detail))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_machine_and_command_as_arguments() {
        // sh -c 'test "$0" = 19 && test "$1" = "echo hi"' 19 'echo hi'
        let exec = ShellExecutor::new(
            "sh",
            vec![
                "-c".into(),
                r#"test "$0" = 19 && test "$1" = "echo hi""#.into(),
            ],
        );
        exec.run(MachineId::new(19), "echo hi").await.unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let exec = ShellExecutor::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()]);
        let err = exec.run(MachineId::new(1), "ignored").await.unwrap_err();
        assert_eq!(err, ExecError::Failed("boom".into()));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let exec = ShellExecutor::new("gantry-no-such-program", vec![]);
        let err = exec.run(MachineId::new(1), "true").await.unwrap_err();
        assert!(matches!(err, ExecError::Spawn(_)));
    }
}
