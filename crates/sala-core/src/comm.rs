//! Progress reporting and cancellation for long-running builds.
//!
//! Builders take an `Option<&mut dyn Communicator>`. Passing `None`
//! disables reporting and never changes results. Reporting is throttled
//! by wall clock through [`Progress`], and the cancellation flag is
//! polled at each throttle check.

use std::fmt;
use std::time::{Duration, Instant};

/// What a posted progress value means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgressKind {
    /// Total number of top-level steps.
    NumSteps,
    /// Index of the current top-level step.
    CurrentStep,
    /// Total number of records within the current step.
    NumRecords,
    /// Index of the current record.
    CurrentRecord,
}

/// A progress and cancellation sink.
pub trait Communicator {
    /// Receive a progress update.
    fn post(&mut self, kind: ProgressKind, value: usize);

    /// True once the caller wants the running operation to stop.
    fn is_cancelled(&self) -> bool;
}

/// Marker error: a [`Communicator`] asked the running operation to stop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Minimum interval between two posted updates.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Wall-clock throttle: fires on the first check, then at most once per interval.
#[derive(Debug)]
pub struct ProgressTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl Default for ProgressTimer {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}

impl ProgressTimer {
    /// A timer with a custom interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if at least one interval has passed since the last time this returned true.
    pub fn due(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Throttled reporter wrapping an optional communicator.
pub struct Progress<'a> {
    comm: Option<&'a mut dyn Communicator>,
    timer: ProgressTimer,
}

impl<'a> Progress<'a> {
    /// Wrap an optional communicator.
    pub fn new(comm: Option<&'a mut dyn Communicator>) -> Self {
        Self {
            comm,
            timer: ProgressTimer::default(),
        }
    }

    /// True if a communicator is attached.
    pub fn is_attached(&self) -> bool {
        self.comm.is_some()
    }

    /// Lend the wrapped communicator to a nested build.
    pub fn communicator(&mut self) -> Option<&mut dyn Communicator> {
        match self.comm.as_deref_mut() {
            Some(comm) => {
                let comm: &mut dyn Communicator = comm;
                Some(comm)
            }
            None => None,
        }
    }

    /// Post immediately, bypassing the throttle.
    pub fn post(&mut self, kind: ProgressKind, value: usize) {
        if let Some(comm) = self.comm.as_deref_mut() {
            comm.post(kind, value);
        }
    }

    /// Announce the number of records for the upcoming loop.
    pub fn start(&mut self, records: usize) {
        self.post(ProgressKind::NumRecords, records);
    }

    /// Throttled check: polls cancellation and posts `CurrentRecord` when the timer fires.
    pub fn tick(&mut self, record: usize) -> Result<(), Cancelled> {
        let Some(comm) = self.comm.as_deref_mut() else {
            return Ok(());
        };
        if self.timer.due() {
            if comm.is_cancelled() {
                return Err(Cancelled);
            }
            comm.post(ProgressKind::CurrentRecord, record);
        }
        Ok(())
    }

    /// Unthrottled cancellation poll.
    pub fn check(&self) -> Result<(), Cancelled> {
        match self.comm.as_deref() {
            Some(comm) if comm.is_cancelled() => Err(Cancelled),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("attached", &self.comm.is_some())
            .field("timer", &self.timer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        posts: Vec<(ProgressKind, usize)>,
        cancel: bool,
    }

    impl Communicator for Recorder {
        fn post(&mut self, kind: ProgressKind, value: usize) {
            self.posts.push((kind, value));
        }
        fn is_cancelled(&self) -> bool {
            self.cancel
        }
    }

    #[test]
    fn detached_progress_never_cancels() {
        let mut p = Progress::new(None);
        p.start(10);
        for i in 0..10 {
            assert!(p.tick(i).is_ok());
        }
        assert!(p.check().is_ok());
    }

    #[test]
    fn first_tick_fires_then_throttles() {
        let mut rec = Recorder::default();
        {
            let mut p = Progress::new(Some(&mut rec));
            p.start(3);
            p.tick(0).unwrap();
            p.tick(1).unwrap();
            p.tick(2).unwrap();
        }
        assert_eq!(rec.posts[0], (ProgressKind::NumRecords, 3));
        assert_eq!(rec.posts[1], (ProgressKind::CurrentRecord, 0));
        assert_eq!(rec.posts.len(), 2);
    }

    #[test]
    fn cancellation_surfaces_on_tick() {
        let mut rec = Recorder {
            cancel: true,
            ..Recorder::default()
        };
        let mut p = Progress::new(Some(&mut rec));
        assert_eq!(p.tick(0), Err(Cancelled));
        assert_eq!(p.check(), Err(Cancelled));
    }
}
