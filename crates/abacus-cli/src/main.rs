use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use abacus_core::agent::Agent;
use abacus_core::config::AppConfig;
use abacus_core::orchestra::Orchestrator;
use abacus_core::store::{InMemoryTaskStore, TaskStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) 設定と共有ストアを用意（デモなので遅延は短めに上書き）
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&path).expect("config file loads"),
        None => AppConfig {
            poll_interval_ms: 500,
            delay_add_ms: 200,
            delay_sub_ms: 200,
            delay_mul_ms: 400,
            delay_div_ms: 400,
            ..AppConfig::default()
        },
    };
    let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());

    // (B) エージェントを起動（全員が同じストアを見る）
    let mut agents = Vec::new();
    for id in 1..=config.agents {
        agents.push(Agent::spawn(id, Arc::clone(&store), config.agent_config()));
    }

    // (C) 式を投入
    let orchestrator = Orchestrator::new(Arc::clone(&store));
    let expressions = [
        "1 + 2",
        "5 - 3",
        "2 * 3",
        "10 / 2",
        "3 + 4 * 2",
        "2.5 * 4 - 1",
        "6 / 0",
    ];
    for expression in expressions {
        let id = orchestrator.submit(expression).await.expect("submit");
        println!("submitted {id}: {expression}");
    }

    // (D) 全タスクが確定するまでポーリングで待つ
    loop {
        let counts = orchestrator.counts().await.expect("counts");
        if counts.settled() {
            break;
        }
        sleep(Duration::from_millis(200)).await;
    }

    for task in orchestrator.tasks().await.expect("tasks") {
        println!("{}", serde_json::to_string(&task).expect("task serializes"));
    }
    let counts = orchestrator.counts().await.expect("counts");
    info!(
        completed = counts.completed,
        error = counts.error,
        "all tasks settled",
    );

    // (E) watch チャンネル経由の graceful shutdown
    for agent in agents {
        agent.shutdown_and_join().await;
    }
}
