//! DispatchConfig - dispatcher の設定
//!
//! JSON ファイル（serde_json）で読み、`GANTRY_*` 環境変数で上書きできる。
//! 欠けているキーは既定値になる。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// apprc ヘッダー `# generated by <platform_name>`
    pub platform_name: String,
    pub apprc_path: String,
    /// 購読チャネルの容量
    pub queue_capacity: usize,
    /// 未設定ならタイムアウトなし
    pub exec_timeout_ms: Option<u64>,
    pub executor_program: String,
    pub executor_args: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            platform_name: "gantry".to_string(),
            apprc_path: "/home/application/apprc".to_string(),
            queue_capacity: 64,
            exec_timeout_ms: None,
            executor_program: "juju".to_string(),
            executor_args: vec!["ssh".to_string()],
        }
    }
}

impl DispatchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// プロセス環境変数で上書き
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = get("GANTRY_PLATFORM_NAME") {
            self.platform_name = v;
        }
        if let Some(v) = get("GANTRY_APPRC_PATH") {
            self.apprc_path = v;
        }
        if let Some(v) = get("GANTRY_QUEUE_CAPACITY") {
            self.queue_capacity = parse_number("GANTRY_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = get("GANTRY_EXEC_TIMEOUT_MS") {
            self.exec_timeout_ms = Some(parse_number("GANTRY_EXEC_TIMEOUT_MS", &v)?);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "queue_capacity",
                message: "must be greater than zero".into(),
            });
        }
        if !self.apprc_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "apprc_path",
                message: format!("{} is not an absolute path", self.apprc_path),
            });
        }
        if self.executor_program.is_empty() {
            return Err(ConfigError::Invalid {
                key: "executor_program",
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn exec_timeout(&self) -> Option<Duration> {
        self.exec_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("{raw:?}: {e}"),
    })
}
