//! Collects terminated CGI programs
//!
//! `SIGCHLD` is received through a [`Signals`] iterator on a dedicated thread,
//! so no work happens inside a signal handler.

use std::{
    io::Result as IoResult,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use nix::{
    errno::Errno,
    sys::wait::{waitpid, WaitPidFlag, WaitStatus},
};
use signal_hook::{consts::SIGCHLD, iterator::Signals};

use crate::log;

static STARTED: AtomicBool = AtomicBool::new(false);

/// Starts the reaper thread unless it is already running in this process.
///
/// Returns `true` if this call started it.
///
/// # Errors
///
/// - `std::io::Error` when the signal handler or the thread couldn't be set up
///
pub fn start() -> IoResult<bool> {
    if STARTED.swap(true, Ordering::AcqRel) {
        return Ok(false);
    }

    let started = Signals::new([SIGCHLD]).and_then(|mut signals| {
        thread::Builder::new()
            .name(String::from("reaper"))
            .spawn(move || {
                log::debug!("running reaper thread");
                for _ in signals.forever() {
                    let _ = reap_children();
                }
            })
    });

    match started {
        Ok(_) => Ok(true),
        Err(err) => {
            STARTED.store(false, Ordering::Release);
            Err(err)
        }
    }
}

/// Collects every child that has terminated so far, without blocking.
///
/// Returns the number of collected children.
pub fn reap_children() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
            Ok(status) => {
                log::debug!("reaped child: {status:?}");
                reaped += 1;
            }
            Err(Errno::EINTR) => {}
            Err(err) => {
                log::warn!("waitpid fail: {err}");
                break;
            }
        }
    }
    reaped
}
