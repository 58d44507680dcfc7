//! Bounded polling for an uploaded artifact

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::filesys::file::File;

/// Wait bounds
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Give up after this much wall-clock time
    pub timeout: Duration,

    /// Pause between checks
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Result of waiting for an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The file exists and its size held steady across two checks
    Arrived { size: u64, elapsed: Duration },

    /// The bound elapsed first
    TimedOut { elapsed: Duration },
}

impl WaitOutcome {
    pub fn is_arrived(&self) -> bool {
        matches!(self, WaitOutcome::Arrived { .. })
    }
}

/// Polls for a named file
pub struct ArtifactWaiter<S> {
    options: WaitOptions,
    sleep_fn: S,
}

impl<S, F> ArtifactWaiter<S>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    pub fn new(options: WaitOptions, sleep_fn: S) -> Self {
        Self { options, sleep_fn }
    }

    /// Poll until `file` has arrived or the timeout elapses.
    ///
    /// Elapsed time is measured on the tokio clock, so a paused runtime
    /// drives the loop deterministically. A file first seen at the deadline
    /// gets one more poll and is accepted if it still exists then.
    pub async fn wait_for(&self, file: &File) -> WaitOutcome {
        let started = Instant::now();
        let mut last_size: Option<u64> = None;
        let mut overtime = false;

        loop {
            let size = file.size().await;
            let elapsed = started.elapsed();

            match (last_size, size) {
                (Some(prev), Some(now)) if prev == now || overtime => {
                    debug!("{} arrived ({} bytes) after {:?}", file.path().display(), now, elapsed);
                    return WaitOutcome::Arrived { size: now, elapsed };
                }
                _ => last_size = size,
            }

            if elapsed >= self.options.timeout {
                if size.is_none() || overtime {
                    debug!("Gave up on {} after {:?}", file.path().display(), elapsed);
                    return WaitOutcome::TimedOut { elapsed };
                }
                overtime = true;
                (self.sleep_fn)(self.options.poll_interval).await;
                continue;
            }

            let remaining = self.options.timeout - elapsed;
            (self.sleep_fn)(self.options.poll_interval.min(remaining)).await;
        }
    }
}
