use anyhow::Result;
use clap::{Parser, Subcommand};
use ecs_emulatorctl::{
    FilePidStore, RetryPolicy, Supervisor, SupervisorConfig, TcpProbe, DEFAULT_PORT,
    SERVER_BIN_NAME,
};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ecs-emulatorctl", version, about = "Start, stop and query the ECS emulator")]
struct Cli {
    /// Port the emulator listens on
    #[arg(long, env = "ECS_EMULATOR_PORT", default_value_t = DEFAULT_PORT, global = true)]
    port: u16,
    /// Directory holding PID files and service logs
    #[arg(long, env = "ECS_EMULATOR_STATE_DIR", default_value = ".cache", global = true)]
    state_dir: PathBuf,
    /// Emulator executable (defaults to ecs-emulator next to this binary)
    #[arg(long, env = "ECS_EMULATOR_BIN", global = true)]
    server_bin: Option<PathBuf>,
    /// Port probes made by start and stop
    #[arg(long, default_value_t = 5, global = true)]
    attempts: u32,
    /// Pause between port probes, e.g. "5s" or "500ms"
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5s", global = true)]
    retry_delay: Duration,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the emulator in the background and wait until it listens
    Start {
        /// JSON or YAML file holding the base task environment
        #[arg(value_name = "ENV_FILE")]
        env_file: PathBuf,
    },
    /// Signal the running emulator and wait until the port closes
    Stop,
    /// Report whether the emulator port accepts connections
    Status,
    /// Run the emulator in the foreground until Ctrl-C
    Console {
        /// JSON or YAML file holding the base task environment
        #[arg(value_name = "ENV_FILE")]
        env_file: PathBuf,
    },
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

fn default_server_bin() -> PathBuf {
    let file_name = format!("{}{}", SERVER_BIN_NAME, env::consts::EXE_SUFFIX);
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(file_name))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = SupervisorConfig {
        port: cli.port,
        state_dir: cli.state_dir.clone(),
        server_bin: cli.server_bin.unwrap_or_else(default_server_bin),
        policy: RetryPolicy::new(cli.attempts, cli.retry_delay),
    };
    let supervisor = Supervisor::new(
        config,
        FilePidStore::new(cli.state_dir),
        TcpProbe::default(),
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.cmd {
        Commands::Start { env_file } => {
            supervisor.start(&env_file, &mut out)?;
        }
        Commands::Stop => {
            supervisor.stop(&mut out)?;
        }
        Commands::Status => {
            supervisor.status(&mut out)?;
        }
        Commands::Console { env_file } => {
            let status = supervisor.console(&env_file, &mut out)?;
            tracing::debug!(?status, "Emulator exited");
        }
    }
    Ok(())
}
