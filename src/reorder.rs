// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Reorders finished pictures by presentation count (POC) and decides when
//! the next one is ready to deliver, tolerant of a bounded backlog of
//! missing POCs before giving up and advancing past a gap.
//!
//! Grounded on `output_list_get_one_output_picture` in the original
//! implementation; the manually maintained singly linked list sorted by POC
//! is replaced by a `BTreeMap<i64, OutputPicture<P>>`, which preserves
//! ascending iteration and gives O(log n) insert/remove instead of O(n).

use std::collections::BTreeMap;

use crate::frame::OutputPicture;

/// Maximum acceptable reorder backlog before a missing POC is given up on
/// and `next_expected_poc` is advanced past the gap. Configurable via
/// [`crate::DecoderParams::reorder_backlog_limit`]; this is the default.
pub const DEFAULT_REORDER_BACKLOG_LIMIT: usize = 8;

pub struct ReorderState<P> {
    next_expected_poc: i64,
    pending: BTreeMap<i64, OutputPicture<P>>,
    backlog_limit: usize,
}

/// Why [`ReorderState::try_take_next`] did not return a picture this call.
#[derive(Debug, PartialEq, Eq)]
pub enum ReorderWait {
    /// Nothing pending at all.
    Empty,
    /// The next expected POC has not arrived yet; caller should wait for a
    /// frame-posted signal and retry.
    AwaitingPoc(i64),
}

impl<P> ReorderState<P> {
    pub fn new(backlog_limit: usize) -> Self {
        Self {
            next_expected_poc: 0,
            pending: BTreeMap::new(),
            backlog_limit,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_expected_poc(&self) -> i64 {
        self.next_expected_poc
    }

    /// Inserts a finished picture, ordered by POC.
    pub fn post(&mut self, picture: OutputPicture<P>) {
        self.pending.insert(picture.poc(), picture);
    }

    /// Attempts to take the next in-order picture.
    ///
    /// `stream_exhausted` should be true only while flushing, with no more
    /// pictures able to arrive (ready queue empty and every submitted unit
    /// accounted for): in that case a persistent gap is resolved by skipping
    /// the missing POC rather than waiting forever.
    pub fn try_take_next(&mut self, stream_exhausted: bool) -> Result<OutputPicture<P>, ReorderWait> {
        loop {
            let Some((&front_poc, _)) = self.pending.iter().next() else {
                return Err(ReorderWait::Empty);
            };

            if front_poc == self.next_expected_poc {
                let picture = self.pending.remove(&front_poc).unwrap();
                self.next_expected_poc += 1;
                return Ok(picture);
            }

            debug_assert!(
                front_poc > self.next_expected_poc,
                "reorder invariant violated: pending POC {front_poc} below next_expected_poc {}",
                self.next_expected_poc
            );

            if stream_exhausted {
                log::warn!(
                    "advancing past missing POC {} at end of stream (next pending is {front_poc})",
                    self.next_expected_poc
                );
                self.next_expected_poc += 1;
                continue;
            }

            if self.pending.len() <= self.backlog_limit {
                return Err(ReorderWait::AwaitingPoc(self.next_expected_poc));
            }

            log::warn!(
                "reorder backlog of {} reached limit {}; advancing to discontinuous POC {front_poc}",
                self.pending.len(),
                self.backlog_limit
            );
            self.next_expected_poc = front_poc;
        }
    }
}
