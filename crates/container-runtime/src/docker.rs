use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::{ContainerRuntime, LaunchInvocation, LaunchedContainer, RuntimeError};

/// Drives a docker-compatible CLI (`docker`, `podman`, ...).
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn inspect_command(&self, image: &str) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("image")
            .arg("inspect")
            .arg("--format")
            .arg("{{.Id}}")
            .arg(image);
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        command
    }

    fn run_command(&self, invocation: &LaunchInvocation) -> Command {
        let mut command = Command::new(&self.binary);
        command.arg("run").arg("--detach");
        for var in &invocation.environment {
            command.arg("--env").arg(format!("{}={}", var.name, var.value));
        }
        command.arg(&invocation.image);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> RuntimeError {
        RuntimeError::Spawn {
            runtime: self.binary.clone(),
            source,
        }
    }
}

impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        &self.binary
    }

    fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let mut command = self.inspect_command(image);
        info!("Executing command: {}", command_line_string(&command));

        let status = command.status().map_err(|err| self.spawn_error(err))?;
        debug!(image, code = ?status.code(), "Image inspect finished");
        Ok(status.success())
    }

    fn launch(&self, invocation: &LaunchInvocation) -> Result<LaunchedContainer, RuntimeError> {
        let mut command = self.run_command(invocation);
        let cmdline = command_line_string(&command);
        info!("Executing command: {}", cmdline);

        let output = command.output().map_err(|err| self.spawn_error(err))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(code = ?output.status.code(), %stderr, "Container run failed");
            return Err(RuntimeError::NonZeroExit {
                command: cmdline,
                code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let container_id = stdout.lines().last().map(str::to_string);
        info!(image = %invocation.image, container_id = ?container_id, "Container started");
        Ok(LaunchedContainer { container_id })
    }
}

fn shell_escape(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let escaped = arg.replace('\'', "'\\''");
    format!("'{}'", escaped)
}

fn command_line_string(cmd: &Command) -> String {
    let mut s = String::new();
    s.push_str(&cmd.get_program().to_string_lossy());
    for a in cmd.get_args() {
        s.push(' ');
        let a = a.to_string_lossy();
        if a.is_empty() || a.contains(' ') || a.contains('"') || a.contains('\'') {
            s.push_str(&shell_escape(&a));
        } else {
            s.push_str(&a);
        }
    }
    s
}
