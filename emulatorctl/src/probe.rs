//! TCP reachability polling used to decide whether the emulator is up.

use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;
use tracing::trace;

pub trait PortProbe {
    /// Whether something accepts TCP connections on `port`.
    fn is_listening(&self, port: u16) -> bool;
}

#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: IpAddr,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: IpAddr, connect_timeout: Duration) -> Self {
        Self {
            host,
            connect_timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_secs(1))
    }
}

impl PortProbe for TcpProbe {
    fn is_listening(&self, port: u16) -> bool {
        let addr = SocketAddr::new(self.host, port);
        let result = TcpStream::connect_timeout(&addr, self.connect_timeout);
        trace!(%addr, ok = result.is_ok(), "probe");
        result.is_ok()
    }
}

/// How many times to probe and how long to sleep between probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub const fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Listening,
    Closed,
}

/// Polls `port` until it reaches the expected state or the policy runs out.
///
/// Returns whether the expected state was observed. Running out of attempts
/// is not an error; the last observation is reported and returned.
pub fn wait_for<P: PortProbe + ?Sized>(
    probe: &P,
    port: u16,
    expect: Expect,
    policy: RetryPolicy,
    out: &mut dyn Write,
) -> io::Result<bool> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        writeln!(out, "Is application listening on port {}? ", port)?;
        let listening = probe.is_listening(port);
        let reached = match expect {
            Expect::Listening => listening,
            Expect::Closed => !listening,
        };
        let answer = if listening { "Yes" } else { "No" };

        if reached {
            writeln!(out, "{}", answer)?;
            return Ok(true);
        }

        attempt += 1;
        if attempt < attempts {
            writeln!(
                out,
                "{}. Retrying in {}",
                answer,
                humantime::format_duration(policy.delay)
            )?;
            thread::sleep(policy.delay);
        } else {
            writeln!(out, "{}.", answer)?;
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::net::TcpListener;

    struct ScriptedProbe {
        answers: RefCell<VecDeque<bool>>,
        calls: RefCell<u32>,
    }

    impl ScriptedProbe {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().copied().collect()),
                calls: RefCell::new(0),
            }
        }
    }

    impl PortProbe for ScriptedProbe {
        fn is_listening(&self, _port: u16) -> bool {
            *self.calls.borrow_mut() += 1;
            let mut answers = self.answers.borrow_mut();
            if answers.len() > 1 {
                answers.pop_front().unwrap_or(false)
            } else {
                answers.front().copied().unwrap_or(false)
            }
        }
    }

    fn no_delay(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[test]
    fn tcp_probe_sees_bound_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(TcpProbe::default().is_listening(port));
    }

    #[test]
    fn wait_for_listening_stops_at_first_success() {
        let probe = ScriptedProbe::new(&[false, false, true]);
        let mut out = Vec::new();

        let ready = wait_for(&probe, 9988, Expect::Listening, no_delay(5), &mut out).unwrap();

        assert!(ready);
        assert_eq!(*probe.calls.borrow(), 3);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("No. Retrying in").count(), 2);
        assert!(text.ends_with("Yes\n"));
    }

    #[test]
    fn wait_for_gives_up_after_budget() {
        let probe = ScriptedProbe::new(&[false]);
        let mut out = Vec::new();

        let ready = wait_for(&probe, 9988, Expect::Listening, no_delay(5), &mut out).unwrap();

        assert!(!ready);
        assert_eq!(*probe.calls.borrow(), 5);
        assert!(String::from_utf8(out).unwrap().ends_with("No.\n"));
    }

    #[test]
    fn wait_for_closed_inverts_the_predicate() {
        let probe = ScriptedProbe::new(&[true, false]);
        let mut out = Vec::new();

        let stopped = wait_for(&probe, 9988, Expect::Closed, no_delay(5), &mut out).unwrap();

        assert!(stopped);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Yes. Retrying in"));
        assert!(text.ends_with("No\n"));
    }

    #[test]
    fn single_policy_probes_once() {
        let probe = ScriptedProbe::new(&[false]);
        let mut out = Vec::new();

        let ready =
            wait_for(&probe, 9988, Expect::Listening, RetryPolicy::single(), &mut out).unwrap();

        assert!(!ready);
        assert_eq!(*probe.calls.borrow(), 1);
    }
}
