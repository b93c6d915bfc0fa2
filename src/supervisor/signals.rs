//! Process-group signal delivery.

#[cfg(unix)]
use tracing::debug;

/// Signals this module can deliver to a process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupSignal {
    /// Graceful termination request.
    Terminate,
    /// Forceful kill.
    Kill,
}

/// Send a signal to the process group led by `pid`.
///
/// Returns `true` when the signal was delivered or the group is already
/// gone ("no such process" counts as success per the stop contract).
#[cfg(unix)]
pub(crate) fn signal_group(pid: u32, signal: GroupSignal) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw == 0 {
        // kill(0, sig) targets the caller's own process group.
        return false;
    }
    let sig = match signal {
        GroupSignal::Terminate => Signal::SIGTERM,
        GroupSignal::Kill => Signal::SIGKILL,
    };
    match kill(Pid::from_raw(-raw), sig) {
        Ok(()) | Err(Errno::ESRCH) => true,
        Err(err) => {
            debug!(pid, ?sig, %err, "group signal not delivered");
            false
        }
    }
}

/// Non-unix fallback: group signalling is unavailable.
#[cfg(not(unix))]
pub(crate) fn signal_group(_pid: u32, _signal: GroupSignal) -> bool {
    false
}
