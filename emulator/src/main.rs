//! ECS RunTask emulator - main entry point

use anyhow::{Context, Result};
use clap::Parser;
use config_loader::{DockerHostAlias, ExpectedTopology, TaskEnvironment};
use ecs_emulator::{create_app, AppState, RunTaskHandler};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ecs-emulator", version, about = "Local stand-in for the ECS RunTask API")]
struct Args {
    /// Port to listen on
    port: u16,
    /// JSON or YAML file holding the base task environment
    #[arg(value_name = "TASK_ENV_FILE")]
    task_env_file: PathBuf,
    /// Interface to bind
    #[arg(long, env = "ECS_EMULATOR_HOST", default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,ecs_emulator=debug,container_runtime=debug")
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = Args::parse();

    let topology = ExpectedTopology::from_env();
    let alias = DockerHostAlias::from_env();
    let environment = TaskEnvironment::load(&args.task_env_file, &alias).with_context(|| {
        format!(
            "Failed to load task environment from {}",
            args.task_env_file.display()
        )
    })?;
    let runtime = container_runtime::runtime_from_env();

    let handler = RunTaskHandler::new(topology, environment, runtime);
    info!(cluster = %handler.topology().cluster_name, "Expecting RunTask calls for cluster");
    let app = create_app(AppState::new(handler));

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!("Server Starts - {}", bind_addr);
    info!("Stop it using: ecs-emulatorctl stop");
    info!("If that fails, find the process with: netstat -tulpn | grep :{}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server Stops - {}", bind_addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
