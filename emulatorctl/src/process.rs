use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// How to launch the emulator service for one port.
#[derive(Debug, Clone)]
pub struct ServiceCommand {
    pub program: PathBuf,
    pub port: u16,
    pub env_file: PathBuf,
}

impl ServiceCommand {
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg(self.port.to_string()).arg(&self.env_file);
        command
    }
}

/// Starts the service in the background with output appended to `log_path`.
///
/// The child gets its own process group so a Ctrl-C aimed at the invoking
/// shell does not reach it.
pub fn spawn_detached(service: &ServiceCommand, log_path: &Path) -> io::Result<Child> {
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let mut command = service.command();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    debug!(program = %service.program.display(), port = service.port, "Spawning detached service");
    command.spawn()
}

/// Starts the service attached to the current terminal.
pub fn spawn_foreground(service: &ServiceCommand) -> io::Result<Child> {
    let mut command = service.command();
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!(program = %service.program.display(), port = service.port, "Spawning foreground service");
    command.spawn()
}

/// Sends SIGTERM to `pid`.
#[cfg(unix)]
pub fn terminate(pid: u32) -> io::Result<()> {
    // 0 and negative values address process groups, never a single process.
    let raw = libc::pid_t::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("invalid pid {}", pid))
        })?;

    let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn terminate(pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot signal pid {} on this platform", pid),
    ))
}
