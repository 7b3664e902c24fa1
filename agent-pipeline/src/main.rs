use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use agent_pipeline::agent::roles::AgentRole;
use agent_pipeline::agent::AgentRuntime;
use agent_pipeline::claude::AnthropicClient;
use agent_pipeline::config::Config;
use agent_pipeline::database::Database;
use agent_pipeline::http::{router, AppState};
use agent_pipeline::orchestrator::Orchestrator;
use agent_pipeline::queue::dispatch_queue;
use agent_pipeline::worker::Worker;

#[derive(Parser)]
#[command(name = "agent-pipeline", about = "Multi-agent feature-delivery pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline service
    Serve {
        /// Address to bind the HTTP server to
        #[arg(long, default_value = "127.0.0.1:8787")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_pipeline=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind } => serve(bind).await,
    }
}

async fn serve(bind: SocketAddr) -> Result<()> {
    let config = Config::from_env()?;

    let db = Database::new(config.db_path.clone())?;
    db.initialize_schema()?;
    info!(db_path = %config.db_path.display(), "store ready");

    let completion: Arc<dyn agent_pipeline::claude::CompletionClient> =
        Arc::new(AnthropicClient::new(config.api_key, config.model)?);

    let (queue, rx) = dispatch_queue();
    let orchestrator = Arc::new(Orchestrator::new(
        db.clone(),
        completion.clone(),
        queue.clone(),
    ));

    let mut runtimes_by_role = HashMap::new();
    let mut runtimes_by_name = HashMap::new();
    for role in AgentRole::all() {
        let runtime = Arc::new(AgentRuntime::new(
            role,
            db.clone(),
            completion.clone(),
            queue.clone(),
        ));
        runtimes_by_role.insert(role, runtime.clone());
        runtimes_by_name.insert(role.name().to_string(), runtime);
    }

    let worker = Worker::new(db, runtimes_by_role);
    tokio::spawn(worker.run(rx));

    let app = router(AppState {
        orchestrator,
        runtimes: runtimes_by_name,
    });

    info!(%bind, "pipeline service listening");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
