//! regenerate-apprc - App の環境変数を各 Unit の apprc に書き出す
//!
//! # フロー
//! 1. args[0] の app 名で AppStore から App を取得
//! 2. state == started を確認
//! 3. 環境変数（名前順）から heredoc コマンドを生成
//! 4. 全 Unit のマシンで RemoteExecutor を実行（1 台の失敗で止めない）

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::handler::{ActionHandler, HandleOutcome};
use crate::config::DispatchConfig;
use crate::domain::{ActionError, App, AppState, Message};
use crate::ports::{AppStore, RemoteExecutor, StoreError};

pub const REGENERATE_APPRC: &str = "regenerate-apprc";

/// apprc の出力先とヘッダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprcTemplate {
    pub platform_name: String,
    pub path: String,
}

impl ApprcTemplate {
    pub fn new(platform_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            platform_name: platform_name.into(),
            path: path.into(),
        }
    }

    /// Unit に送るコマンドを生成する。同じ App なら常に同じ文字列になる。
    pub fn render(&self, app: &App) -> String {
        let mut command = format!("cat > {} <<END\n", self.path);
        command.push_str(&format!("# generated by {}\n", self.platform_name));
        for var in app.env_vars() {
            command.push_str(&format!(
                "export {}=\"{}\"\n",
                var.name,
                escape_value(&var.value)
            ));
        }
        command.push_str("END\n");
        command
    }
}

impl From<&DispatchConfig> for ApprcTemplate {
    fn from(config: &DispatchConfig) -> Self {
        Self::new(config.platform_name.clone(), config.apprc_path.clone())
    }
}

/// heredoc を通した後、ファイルを source したときに値がそのまま復元されるようにする
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\\\\\"),
            '$' | '`' => {
                out.push_str("\\\\\\");
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

pub struct RegenerateApprc {
    store: Arc<dyn AppStore>,
    executor: Arc<dyn RemoteExecutor>,
    template: ApprcTemplate,
}

impl RegenerateApprc {
    pub const MIN_ARGS: usize = 1;

    pub fn new(
        store: Arc<dyn AppStore>,
        executor: Arc<dyn RemoteExecutor>,
        template: ApprcTemplate,
    ) -> Self {
        Self {
            store,
            executor,
            template,
        }
    }
}

#[async_trait]
impl ActionHandler for RegenerateApprc {
    async fn handle(&self, message: &Message) -> Result<HandleOutcome, ActionError> {
        let action = message.action.clone();
        let name = message.arg(0).unwrap_or_default().to_string();

        let app = match self.store.get_app(&name).await {
            Ok(app) => app,
            Err(StoreError::NotFound(_)) => {
                return Err(ActionError::AppNotFound { action, app: name });
            }
            Err(source) => {
                return Err(ActionError::Store {
                    action,
                    app: name,
                    source,
                });
            }
        };

        if app.state != AppState::Started {
            return Err(ActionError::WrongState {
                action,
                app: name,
                expected: AppState::Started,
                actual: app.state,
            });
        }

        let command = self.template.render(&app);
        let mut outcome = HandleOutcome::for_app(&app.name, app.units.len());
        for unit in &app.units {
            match self.executor.run(unit.machine, &command).await {
                Ok(()) => {
                    debug!(app = %app.name, unit = %unit.name, machine = %unit.machine, "apprc written");
                }
                Err(source) => {
                    debug!(app = %app.name, unit = %unit.name, machine = %unit.machine, error = %source, "apprc write failed");
                    outcome.unit_failures.push(ActionError::UnitExecution {
                        action: action.clone(),
                        app: app.name.clone(),
                        unit: unit.name.clone(),
                        machine: unit.machine,
                        source,
                    });
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnvVar, MachineId, Unit};
    use crate::impls::{InMemoryAppStore, RecordingExecutor};
    use crate::ports::ExecError;

    fn template() -> ApprcTemplate {
        ApprcTemplate::new("gantry", "/home/application/apprc")
    }

    fn nemesis(state: AppState) -> App {
        App::new("nemesis", state)
            .with_unit(Unit::new("nemesis/0", MachineId::new(19)))
            .with_env(EnvVar::new("http_proxy", "http://myproxy.com:3128/", true))
    }

    fn handler(store: &Arc<InMemoryAppStore>, exec: &Arc<RecordingExecutor>) -> RegenerateApprc {
        RegenerateApprc::new(store.clone(), exec.clone(), template())
    }

    #[test]
    fn render_is_a_heredoc_in_name_order() {
        let app = nemesis(AppState::Started).with_env(EnvVar::new("DATABASE_HOST", "db", false));
        assert_eq!(
            template().render(&app),
            "cat > /home/application/apprc <<END\n\
             # generated by gantry\n\
             export DATABASE_HOST=\"db\"\n\
             export http_proxy=\"http://myproxy.com:3128/\"\n\
             END\n"
        );
    }

    #[test]
    fn render_escapes_shell_specials() {
        assert_eq!(escape_value(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_value("$HOME"), r"\\\$HOME");
        assert_eq!(escape_value("`id`"), r"\\\`id\\\`");
        assert_eq!(escape_value(r"c:\tmp"), r"c:\\\\tmp");
        assert_eq!(escape_value("plain-value_1"), "plain-value_1");
    }

    #[tokio::test]
    async fn writes_apprc_on_every_unit() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert(
            nemesis(AppState::Started).with_unit(Unit::new("nemesis/1", MachineId::new(20))),
        );
        let exec = Arc::new(RecordingExecutor::new());

        let outcome = handler(&store, &exec)
            .handle(&Message::new(REGENERATE_APPRC, ["nemesis"]))
            .await
            .unwrap();

        assert!(outcome.is_clean());
        assert_eq!(outcome.units_succeeded(), 2);
        let machines: Vec<MachineId> = exec.calls().into_iter().map(|c| c.machine).collect();
        assert_eq!(machines, vec![MachineId::new(19), MachineId::new(20)]);
    }

    #[tokio::test]
    async fn unit_failure_does_not_stop_remaining_units() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert(
            nemesis(AppState::Started)
                .with_unit(Unit::new("nemesis/1", MachineId::new(20)))
                .with_unit(Unit::new("nemesis/2", MachineId::new(21))),
        );
        let exec = Arc::new(RecordingExecutor::new());
        exec.fail_on(MachineId::new(19), ExecError::Failed("ssh: connection refused".into()));

        let outcome = handler(&store, &exec)
            .handle(&Message::new(REGENERATE_APPRC, ["nemesis"]))
            .await
            .unwrap();

        assert_eq!(exec.calls().len(), 3);
        assert_eq!(outcome.unit_failures.len(), 1);
        assert_eq!(outcome.units_succeeded(), 2);
        assert!(matches!(
            &outcome.unit_failures[0],
            ActionError::UnitExecution { unit, .. } if unit == "nemesis/0"
        ));
    }

    #[tokio::test]
    async fn app_must_be_started() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert(nemesis(AppState::Pending));
        let exec = Arc::new(RecordingExecutor::new());

        let err = handler(&store, &exec)
            .handle(&Message::new(REGENERATE_APPRC, ["nemesis"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ActionError::WrongState { actual: AppState::Pending, .. }
        ));
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_app_is_not_found() {
        let store = Arc::new(InMemoryAppStore::new());
        let exec = Arc::new(RecordingExecutor::new());

        let err = handler(&store, &exec)
            .handle(&Message::new(REGENERATE_APPRC, ["unknown-app"]))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            r#"Error handling "regenerate-apprc": app "unknown-app" does not exist."#
        );
    }

    struct UnreachableStore;

    #[async_trait]
    impl AppStore for UnreachableStore {
        async fn get_app(&self, _name: &str) -> Result<App, StoreError> {
            Err(StoreError::Backend("timeout".into()))
        }
    }

    #[tokio::test]
    async fn store_backend_failure_is_not_reported_as_missing_app() {
        let exec = Arc::new(RecordingExecutor::new());
        let handler = RegenerateApprc::new(Arc::new(UnreachableStore), exec.clone(), template());

        let err = handler
            .handle(&Message::new(REGENERATE_APPRC, ["nemesis"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Store { .. }));
        assert_eq!(
            err.to_string(),
            r#"Error handling "regenerate-apprc": could not load app "nemesis": store backend error: timeout."#
        );
        assert_eq!(err.app(), Some("nemesis"));
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn app_without_units_is_a_clean_noop() {
        let store = Arc::new(InMemoryAppStore::new());
        store.insert(App::new("lonely", AppState::Started));
        let exec = Arc::new(RecordingExecutor::new());

        let outcome = handler(&store, &exec)
            .handle(&Message::new(REGENERATE_APPRC, ["lonely"]))
            .await
            .unwrap();

        assert!(outcome.is_clean());
        assert_eq!(outcome.units_total, 0);
        assert!(exec.calls().is_empty());
    }
}
