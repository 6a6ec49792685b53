//! Out-of-process controller for the ECS emulator service.

pub mod pid_store;
pub mod probe;
pub mod process;
pub mod supervisor;

pub use pid_store::{FilePidStore, PidStore, PidStoreError};
pub use probe::{PortProbe, RetryPolicy, TcpProbe};
pub use supervisor::{Supervisor, SupervisorConfig};

pub const DEFAULT_PORT: u16 = 9988;
pub const SERVER_BIN_NAME: &str = "ecs-emulator";
