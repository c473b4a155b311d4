//! App / Unit / EnvVar - テナントアプリケーションのレコード
//!
//! この core はレコードを読むだけで、書き換えない。
//! 状態遷移は外部（API 層・provisioner）が行う。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// AppState はアプリのライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Pending,
    Started,
    Stopped,
    Error,
    Down,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Pending => "pending",
            AppState::Started => "started",
            AppState::Stopped => "stopped",
            AppState::Error => "error",
            AppState::Down => "down",
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit をホストするマシンの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(u64);

impl MachineId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unit は App の実行インスタンス（1 マシン上）
///
/// agent 系の 3 フィールドは互いに独立しており、ここでは解釈しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub machine: MachineId,
    #[serde(default)]
    pub machine_agent_state: String,
    #[serde(default)]
    pub agent_state: String,
    #[serde(default)]
    pub instance_state: String,
}

impl Unit {
    pub fn new(name: impl Into<String>, machine: MachineId) -> Self {
        Self {
            name: name.into(),
            machine,
            machine_agent_state: String::new(),
            agent_state: String::new(),
            instance_state: String::new(),
        }
    }
}

/// EnvVar はアプリの環境変数
///
/// `public == false` の値はログに出さない。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub public: bool,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>, public: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            public,
        }
    }
}

impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.public { self.value.as_str() } else { "<redacted>" };
        f.debug_struct("EnvVar")
            .field("name", &self.name)
            .field("value", &value)
            .field("public", &self.public)
            .finish()
    }
}

/// App はテナントのデプロイ済みアプリケーション
///
/// # 不変条件
/// - `name` はストア内で一意
/// - `env` は BTreeMap なので常に名前順で走査される（apprc 生成の決定性）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    pub state: AppState,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub env: BTreeMap<String, EnvVar>,
}

impl App {
    pub fn new(name: impl Into<String>, state: AppState) -> Self {
        Self {
            name: name.into(),
            state,
            units: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// 同名の変数は上書き
    pub fn with_env(mut self, var: EnvVar) -> Self {
        self.env.insert(var.name.clone(), var);
        self
    }

    /// 名前順の環境変数
    pub fn env_vars(&self) -> impl Iterator<Item = &EnvVar> {
        self.env.values()
    }
}
