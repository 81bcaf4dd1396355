use std::sync::Arc;

use chrono::{Duration, Utc};
use rotina_core::app::{LiveTicker, Session, SessionBuilder};
use rotina_core::config::RotinaConfig;
use rotina_core::domain::TaskId;
use rotina_core::impls::InMemoryRoutineStore;
use rotina_core::ports::{Clock, FixedClock};
use rotina_core::{ActionOutcome, RotinaError};
use tracing::{info, warn};

/// 画面の代わり：ルーティンとタスクのライブ秒数を保持する
struct Tickers {
    routine: LiveTicker,
    task: LiveTicker,
}

impl Tickers {
    fn new(clock: Arc<dyn Clock>, period: std::time::Duration) -> Self {
        Self {
            routine: LiveTicker::new(clock.clone(), period),
            task: LiveTicker::new(clock, period),
        }
    }

    /// スナップショットが変わるたびに張り直す
    fn rearm(&mut self, session: &Session) {
        self.routine.rearm(session.routine_live_input());
        self.task.rearm(session.task_live_input());
    }
}

fn task_named(session: &Session, name: &str) -> anyhow::Result<TaskId> {
    session
        .tasks()
        .iter()
        .find(|t| t.name == name)
        .map(|t| t.task_id)
        .ok_or_else(|| anyhow::anyhow!("task {name} not found"))
}

/// アクションの結果をログに出す（ガード違反は警告として扱い、続行する）
fn report(action: &str, result: Result<ActionOutcome, RotinaError>) -> anyhow::Result<()> {
    match result {
        Ok(ActionOutcome::Applied) => info!(action, "applied"),
        Ok(ActionOutcome::Skipped(reason)) => info!(action, %reason, "skipped"),
        Err(RotinaError::Guard(guard)) => warn!(action, %guard, "rejected"),
        Err(err @ RotinaError::Store(_)) => return Err(err.into()),
    }
    Ok(())
}

/// 時計を進めて、ティッカーが次の値を配信するのを待つ
async fn wait(clock: &FixedClock, tickers: &Tickers, seconds: i64, period: std::time::Duration) {
    clock.advance(Duration::seconds(seconds));
    // 次の tick が確実に届くよう 1.5 周期待つ
    tokio::time::sleep(period * 3 / 2).await;
    info!(
        advanced = seconds,
        routine_seconds = tickers.routine.value(),
        task_seconds = tickers.task.value(),
        "tick"
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = RotinaConfig::load()?;
    init_tracing(&config.log_level)?;

    // (A) ストア・時計・Session を用意（時計はデモ用に手で進める）
    let store = Arc::new(InMemoryRoutineStore::new());
    let clock = FixedClock::new(Utc::now());
    let period = config.tick_interval();
    let mut session = SessionBuilder::from_config(&config)
        .store(store.clone())
        .clock(Arc::new(clock.clone()))
        .build()
        .await?;
    let mut tickers = Tickers::new(Arc::new(clock.clone()), period);

    // (B) ルーティン作成 → タスク追加 → 開始
    report("create_routine", session.create_routine().await)?;
    report("create_routine", session.create_routine().await)?;
    report("add_task", session.add_task("Estudar").await)?;
    report("add_task", session.add_task("Ler").await)?;
    report("start_routine", session.start_routine().await)?;

    let estudar = task_named(&session, "Estudar")?;
    let ler = task_named(&session, "Ler")?;

    // (C) 1 つ目のタスクを計測（125 秒 → 一時停止 → 35 秒 → 完了）
    report("start_task", session.start_task(estudar).await)?;
    report("start_task", session.start_task(ler).await)?;
    tickers.rearm(&session);
    wait(&clock, &tickers, 125, period).await;

    report("pause_task", session.pause_task(estudar).await)?;
    tickers.rearm(&session);
    wait(&clock, &tickers, 20, period).await;

    report("resume_task", session.resume_task(estudar).await)?;
    tickers.rearm(&session);
    wait(&clock, &tickers, 35, period).await;

    report("complete_routine", session.complete_routine().await)?;
    report("complete_task", session.complete_task(estudar).await)?;

    // (D) 2 つ目のタスクを少しだけ進めて完了
    report("start_task", session.start_task(ler).await)?;
    tickers.rearm(&session);
    wait(&clock, &tickers, 60, period).await;
    report("complete_task", session.complete_task(ler).await)?;
    tickers.rearm(&session);
    wait(&clock, &tickers, 40, period).await;

    let dashboard = session.dashboard();
    if let Some(stats) = &dashboard.stats {
        info!(
            routine_seconds = stats.routine_seconds,
            utilization = stats.utilization_percent,
            time_lost = stats.time_lost_seconds,
            "before completion"
        );
    }

    // (E) ルーティンを閉じて、モニタリング表示（直近の完了分）を出力
    report("complete_routine", session.complete_routine().await)?;
    tickers.rearm(&session);
    println!("{}", serde_json::to_string_pretty(&session.monitoring())?);

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("ROTINA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
