use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, timeout_at, Instant};

/// Reasons that [poll_until] stopped before its condition was met.
#[derive(Debug)]
pub enum PollError<E> {
    /// The condition was not met before the deadline.
    TimedOut { elapsed: Duration, attempts: u32 },
    /// The check failed in a way that should not be retried.
    Aborted(E),
}

impl<E: Display> Display for PollError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PollError::TimedOut { elapsed, attempts } => write!(
                f,
                "condition not met after {attempts} attempts in {:.1}s",
                elapsed.as_secs_f64()
            ),
            PollError::Aborted(e) => write!(f, "polling aborted: {e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for PollError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollError::TimedOut { .. } => None,
            PollError::Aborted(e) => Some(e),
        }
    }
}

/// About 30 years, the same horizon tokio uses for a timer that never fires.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Run `check` until it reports `true`, sleeping `interval` between attempts.
///
/// The first attempt is made immediately. No attempt runs past `timeout`: an attempt still in
/// flight at the deadline is dropped and the poll reports [PollError::TimedOut]. The wait between
/// attempts is shortened so that a final attempt is made at the deadline itself.
///
/// A `timeout` too large to represent as a deadline polls without one.
///
/// Returns the number of attempts it took for the condition to be met.
pub async fn poll_until<F, Fut, E>(
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<u32, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let started = Instant::now();
    let deadline = started
        .checked_add(timeout)
        .unwrap_or_else(|| started + FAR_FUTURE);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match timeout_at(deadline, check()).await {
            Ok(Ok(true)) => return Ok(attempts),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => return Err(PollError::Aborted(e)),
            Err(_) => {
                return Err(PollError::TimedOut {
                    elapsed: started.elapsed(),
                    attempts,
                })
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut {
                elapsed: started.elapsed(),
                attempts,
            });
        }
        let next = now
            .checked_add(interval)
            .map_or(deadline, |next| next.min(deadline));
        sleep_until(next).await;
    }
}
