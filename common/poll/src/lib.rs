// Licensed under the Apache-2.0 license

//! Bounded polling of a condition.

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("condition not met within {0:?}")]
pub struct PollTimeout(pub Duration);

/// Calls `condition` every `interval` until it returns `Ok(true)`.
///
/// Errors from `condition` end the wait immediately and are passed through.
/// If the condition is still false once `timeout` has elapsed, fails with a
/// [`PollTimeout`] that callers can recover with `downcast_ref`. The
/// condition is always evaluated at least once, and once more after the
/// deadline so a late success is not reported as a timeout.
pub fn poll_until<F>(timeout: Duration, interval: Duration, mut condition: F) -> anyhow::Result<()>
where
    F: FnMut() -> anyhow::Result<bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition()? {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(interval.min(deadline - now));
    }
    if condition()? {
        return Ok(());
    }
    Err(PollTimeout(timeout).into())
}

/// Returns true when `err` came from a [`poll_until`] timeout.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PollTimeout>().is_some()
}
