//! Per-run progress bookkeeping on top of a `JobChannel`.

use std::io;

use super::channel::{JobChannel, Progress};

/// Tracks one run's progress. Created by `begin`, consumed by `end`.
///
/// `done` never decreases. Once a cancellation request has been seen the
/// handle remembers it and clears the request on the channel.
pub struct JobHandle<'a> {
    channel: &'a dyn JobChannel,
    progress: Progress,
    cancelled: bool,
}

impl<'a> JobHandle<'a> {
    /// Publish `0 total` and start tracking.
    pub fn begin(channel: &'a dyn JobChannel, total: u64) -> io::Result<Self> {
        let progress = Progress::new(0, total);
        channel.report(progress)?;
        Ok(Self {
            channel,
            progress,
            cancelled: false,
        })
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Count one more unit of work.
    pub fn advance(&mut self) -> io::Result<()> {
        self.set(self.progress.done + 1)
    }

    /// Move `done` forward to `done`. Lower values are ignored.
    pub fn set(&mut self, done: u64) -> io::Result<()> {
        let done = done.min(self.progress.total);
        if done <= self.progress.done {
            return Ok(());
        }
        self.progress.done = done;
        self.channel.report(self.progress)
    }

    /// Poll for cancellation. A request is honored once and then cleared.
    pub fn check_cancelled(&mut self) -> io::Result<bool> {
        if !self.cancelled && self.channel.is_cancel_requested() {
            tracing::info!(
                "Cancellation requested at {}/{}",
                self.progress.done,
                self.progress.total
            );
            self.cancelled = true;
            self.channel.acknowledge_cancel()?;
        }
        Ok(self.cancelled)
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Mark the run finished, cancelled or not, and report `total total`.
    ///
    /// A request that arrives after the last check is cleared here so it
    /// cannot cancel the next job in the same place.
    pub fn end(mut self) -> io::Result<Progress> {
        let total = self.progress.total;
        self.set(total)?;
        if self.channel.is_cancel_requested() {
            tracing::info!("Clearing cancellation requested after the last check");
            self.channel.acknowledge_cancel()?;
        }
        Ok(self.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::channel::MemoryChannel;

    #[test]
    fn progress_only_moves_forward() {
        let channel = MemoryChannel::new();
        let mut handle = JobHandle::begin(&channel, 5).unwrap();
        handle.advance().unwrap();
        handle.set(3).unwrap();
        handle.set(2).unwrap();
        assert_eq!(handle.progress(), Progress::new(3, 5));

        let last = handle.end().unwrap();
        assert_eq!(last, Progress::new(5, 5));
        let dones: Vec<u64> = channel.reports().iter().map(|p| p.done).collect();
        assert_eq!(dones, vec![0, 1, 3, 5]);
    }

    #[test]
    fn cancellation_is_latched_and_cleared() {
        let channel = MemoryChannel::new();
        let mut handle = JobHandle::begin(&channel, 3).unwrap();
        assert!(!handle.check_cancelled().unwrap());

        channel.cancel_handle().cancel();
        assert!(handle.check_cancelled().unwrap());
        assert!(!channel.is_cancel_requested());
        assert!(handle.check_cancelled().unwrap());
        assert!(handle.was_cancelled());
    }

    #[test]
    fn end_clears_a_late_request() {
        let channel = MemoryChannel::new();
        let mut handle = JobHandle::begin(&channel, 2).unwrap();
        assert!(!handle.check_cancelled().unwrap());
        handle.advance().unwrap();

        channel.cancel_handle().cancel();
        let last = handle.end().unwrap();
        assert_eq!(last, Progress::new(2, 2));
        assert!(!channel.is_cancel_requested());
    }
}
