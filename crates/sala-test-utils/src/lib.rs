//! Test utilities for Sala development.
//!
//! Provides recording and cancelling [`Communicator`] implementations and
//! a set of small drawings in [`fixtures`] that the crate tests share.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use sala_core::{Communicator, ProgressKind};

/// Records every posted update and never cancels.
#[derive(Debug, Default)]
pub struct RecordingComm {
    pub posts: Vec<(ProgressKind, usize)>,
}

impl RecordingComm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values posted under `kind`, in order.
    pub fn values(&self, kind: ProgressKind) -> Vec<usize> {
        self.posts.iter().filter(|(k, _)| *k == kind).map(|(_, v)| *v).collect()
    }
}

impl Communicator for RecordingComm {
    fn post(&mut self, kind: ProgressKind, value: usize) {
        self.posts.push((kind, value));
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Reports cancellation once it has received `after` posts.
///
/// `CancellingComm::new(0)` cancels at the first check.
#[derive(Debug)]
pub struct CancellingComm {
    after: usize,
    seen: usize,
}

impl CancellingComm {
    pub fn new(after: usize) -> Self {
        Self { after, seen: 0 }
    }

    /// Number of updates posted so far.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

impl Communicator for CancellingComm {
    fn post(&mut self, _kind: ProgressKind, _value: usize) {
        self.seen += 1;
    }

    fn is_cancelled(&self) -> bool {
        self.seen >= self.after
    }
}
