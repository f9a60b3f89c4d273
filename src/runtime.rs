//! Small shims over the tokio primitives used throughout the crate.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::time::timeout;

/// Runs `fut` under a deadline, folding expiry into a timed-out `io::Error`
/// so that timeouts travel the same error path as other transport failures.
pub(crate) async fn io_timeout<F, T>(dur: Duration, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout(dur, fut).await {
        Ok(res) => res,
        Err(elapsed) => Err(io::Error::new(io::ErrorKind::TimedOut, elapsed)),
    }
}
