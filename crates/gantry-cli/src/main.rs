//! gantry-cli: dispatcher をインメモリのキュー/ストアと組み合わせて動かすデモ
//!
//! ```text
//! gantry-cli [config.json] [apps.json]
//! ```
//!
//! - config.json: DispatchConfig（省略時は既定値 + GANTRY_* 環境変数）
//! - apps.json: App の配列（省略時はデモ用の App を 1 つ入れる）
//! - GANTRY_DRY_RUN=1 なら executor を RecordingExecutor にして、送るはずだったコマンドを表示する

use std::error::Error;
use std::sync::Arc;
use tokio::time::{Duration, Instant, sleep};
use tracing::info;

use gantry_core::actions::REGENERATE_APPRC;
use gantry_core::domain::{App, AppState, EnvVar, MachineId, Message, Unit};
use gantry_core::impls::{InMemoryAppStore, InMemoryQueue, RecordingExecutor, ShellExecutor};
use gantry_core::observability::{LogFormat, init_logging};
use gantry_core::ports::{MessageQueue, RemoteExecutor};
use gantry_core::{DispatchConfig, DispatcherBuilder};

fn demo_apps() -> Vec<App> {
    vec![
        App::new("nemesis", AppState::Started)
            .with_unit(Unit::new("nemesis/0", MachineId::new(19)))
            .with_env(EnvVar::new("http_proxy", "http://myproxy.com:3128/", true)),
        App::new("hydra", AppState::Pending),
    ]
}

fn load_apps(path: Option<String>) -> Result<Vec<App>, Box<dyn Error>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(demo_apps()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging(LogFormat::Pretty);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => DispatchConfig::from_path(path)?,
        None => DispatchConfig::default(),
    }
    .apply_env()?;
    let apps = load_apps(args.next())?;

    // (A) コラボレーターを用意
    let queue = Arc::new(InMemoryQueue::new(config.queue_capacity));
    let store: Arc<InMemoryAppStore> = Arc::new(apps.iter().cloned().collect());
    let dry_run = std::env::var("GANTRY_DRY_RUN").is_ok_and(|v| v == "1");
    let recorder = Arc::new(RecordingExecutor::new());
    let executor: Arc<dyn RemoteExecutor> = if dry_run {
        recorder.clone()
    } else {
        Arc::new(ShellExecutor::new(
            config.executor_program.clone(),
            config.executor_args.clone(),
        ))
    };

    // (B) dispatcher を組み立てて起動
    let dispatcher = DispatcherBuilder::new()
        .queue(queue.clone())
        .standard_actions(&config, store, executor)?
        .expect_actions(&[REGENERATE_APPRC])
        .build()?;
    dispatcher.start().await?;

    // (C) Message 投入（全 App の apprc 再生成 + 存在しない action を 1 つ）
    let mut messages: Vec<Message> = apps
        .iter()
        .map(|app| Message::new(REGENERATE_APPRC, [app.name.as_str()]))
        .collect();
    messages.push(Message::new("unknown-action", ["does not matter"]));
    let total = messages.len() as u64;
    for message in messages {
        queue.publish(message).await?;
    }
    info!(total, "messages published");

    // (D) 全件処理されるまで待つ
    let deadline = Instant::now() + Duration::from_secs(30);
    while dispatcher.stats().received < total && Instant::now() < deadline {
        sleep(Duration::from_millis(50)).await;
    }
    // (E) graceful shutdown（実行中の最後の 1 件は完了まで待たれる）
    dispatcher.stop().await;

    if dry_run {
        for call in recorder.calls() {
            println!("--- machine {}\n{}", call.machine, call.command);
        }
    }
    println!("{}", serde_json::to_string_pretty(&dispatcher.stats())?);
    Ok(())
}
