//! start / stop / status / console for the emulator process.
//!
//! The supervisor and the service share nothing but the PID file and the TCP
//! port, so liveness is always judged by probing the port.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tracing::{info, warn};

use crate::pid_store::PidStore;
use crate::probe::{wait_for, Expect, PortProbe, RetryPolicy};
use crate::process::{self, ServiceCommand};

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub port: u16,
    pub state_dir: PathBuf,
    pub server_bin: PathBuf,
    pub policy: RetryPolicy,
}

impl SupervisorConfig {
    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join(format!("ecs-emulator-{}.log", self.port))
    }
}

pub struct Supervisor<S, P> {
    config: SupervisorConfig,
    store: S,
    probe: P,
}

impl<S: PidStore, P: PortProbe> Supervisor<S, P> {
    pub fn new(config: SupervisorConfig, store: S, probe: P) -> Self {
        Self {
            config,
            store,
            probe,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Launches the service in the background and waits for the port to open.
    ///
    /// Returns whether the service was seen listening within the retry budget.
    pub fn start(&self, env_file: &Path, out: &mut dyn Write) -> Result<bool> {
        let service = self.service_command(env_file)?;
        self.ensure_state_dir()?;

        writeln!(out, "Will run and detach from CLI and return to prompt...")?;
        let log_path = self.config.log_path();
        let child = process::spawn_detached(&service, &log_path).with_context(|| {
            format!("Failed to start {}", service.program.display())
        })?;
        let pid = child.id();

        self.store
            .write(self.config.port, pid)
            .context("Failed to record service PID")?;
        writeln!(out, "Process running as pid: {}", pid)?;
        info!(pid, log = %log_path.display(), "Service started in background");

        let ready = wait_for(
            &self.probe,
            self.config.port,
            Expect::Listening,
            self.config.policy,
            out,
        )?;
        Ok(ready)
    }

    /// Runs the service attached to the terminal until it exits.
    pub fn console(&self, env_file: &Path, out: &mut dyn Write) -> Result<ExitStatus> {
        let service = self.service_command(env_file)?;
        self.ensure_state_dir()?;

        writeln!(out, "Entered console mode (blocking, Ctrl-C to breakout)...")?;
        let mut child = process::spawn_foreground(&service).with_context(|| {
            format!("Failed to start {}", service.program.display())
        })?;
        let pid = child.id();

        self.store
            .write(self.config.port, pid)
            .context("Failed to record service PID")?;
        writeln!(out, "Process running as pid: {}", pid)?;

        let status = child.wait().context("Failed to wait for service")?;
        self.discard_pid_file();
        info!(?status, "Console session ended");
        Ok(status)
    }

    /// Signals the recorded process and waits for the port to close.
    ///
    /// Returns whether the port was seen closed. A missing PID file means the
    /// service is already stopped; an unreadable or stale one is deleted.
    pub fn stop(&self, out: &mut dyn Write) -> Result<bool> {
        let port = self.config.port;

        match self.store.read(port) {
            Ok(None) => {
                writeln!(out, "Already stopped.")?;
                return Ok(true);
            }
            Ok(Some(pid)) => {
                writeln!(out, "Kill process with pid: {}", pid)?;
                if let Err(err) = process::terminate(pid) {
                    warn!(pid, "Could not signal recorded process: {}", err);
                }
            }
            Err(err) => warn!("Ignoring unreadable PID file: {}", err),
        }
        self.discard_pid_file();

        let stopped = wait_for(&self.probe, port, Expect::Closed, self.config.policy, out)?;
        Ok(stopped)
    }

    /// Probes the port once.
    pub fn status(&self, out: &mut dyn Write) -> Result<bool> {
        let listening = wait_for(
            &self.probe,
            self.config.port,
            Expect::Listening,
            RetryPolicy::single(),
            out,
        )?;
        Ok(listening)
    }

    fn service_command(&self, env_file: &Path) -> Result<ServiceCommand> {
        let env_file = absolute(env_file)?;
        if !env_file.is_file() {
            anyhow::bail!("Task environment file {} not found", env_file.display());
        }

        Ok(ServiceCommand {
            program: self.config.server_bin.clone(),
            port: self.config.port,
            env_file,
        })
    }

    fn ensure_state_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.config.state_dir).with_context(|| {
            format!(
                "Failed to create state directory {}",
                self.config.state_dir.display()
            )
        })
    }

    fn discard_pid_file(&self) {
        if let Err(err) = self.store.remove(self.config.port) {
            warn!("Failed to remove PID file: {}", err);
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("Failed to resolve current directory")?;
    Ok(cwd.join(path))
}
