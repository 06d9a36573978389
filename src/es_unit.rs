// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The ES-unit pool: pre-allocated byte buffers carrying one framed access
//! unit plus its timestamps, cycled between an idle, a ready, and a recycle
//! queue.

use crate::queue::NodeQueue;

/// Initial capacity given to every freshly allocated [`EsUnit`] buffer.
pub const MAX_ES_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// One coded access unit's worth of bytes, after emulation-prevention removal.
#[derive(Debug, Default)]
pub struct EsUnit {
    pub data: Vec<u8>,
    pub pts: i64,
    pub dts: i64,
}

impl EsUnit {
    fn new() -> Self {
        Self {
            data: Vec::with_capacity(MAX_ES_FRAME_SIZE),
            pts: 0,
            dts: 0,
        }
    }

    fn reset(&mut self) {
        self.data.clear();
        self.pts = 0;
        self.dts = 0;
    }
}

/// Owns the three ES-unit lists (idle / ready / recycle) and enforces the
/// pool-size invariant: every unit is on exactly one list, or pinned in a
/// task slot, at all times.
pub struct EsUnitPool {
    idle: NodeQueue<EsUnit>,
    ready: NodeQueue<EsUnit>,
    pool_size: usize,
}

impl EsUnitPool {
    /// Allocates `pool_size` units and places them on the idle list.
    pub fn new(pool_size: usize) -> Self {
        let idle = NodeQueue::new();
        for _ in 0..pool_size {
            idle.append(EsUnit::new());
        }
        Self {
            idle,
            ready: NodeQueue::new(),
            pool_size,
        }
    }

    /// Total number of units ever allocated; used by tests to assert the
    /// count-is-constant invariant against idle+ready+in-flight.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Blocks until an idle unit is available, then returns it reset and
    /// ready to accumulate new bytes.
    pub fn take_idle(&self, blocking: bool) -> Option<EsUnit> {
        self.idle.remove_head(blocking).map(|mut unit| {
            unit.reset();
            unit
        })
    }

    pub fn push_ready(&self, unit: EsUnit) {
        self.ready.append(unit);
    }

    pub fn take_ready(&self, blocking: bool) -> Option<EsUnit> {
        self.ready.remove_head(blocking)
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Returns a unit that finished being in-flight back to the idle list.
    pub fn recycle(&self, unit: EsUnit) {
        self.idle.append(unit);
    }

    /// Unblocks any thread parked waiting for an idle or ready unit.
    pub fn shutdown(&self) {
        self.idle.shutdown();
        self.ready.shutdown();
    }
}

/// Removes the 3-byte emulation-prevention pattern `00 00 03` (compacting it
/// to `00 00`) in place. Idempotent: running it again on an already-clean
/// buffer is a no-op.
pub fn remove_emulation_prevention(data: &mut Vec<u8>) {
    let mut zero_run = 0usize;
    let mut write = 0usize;
    let mut read = 0usize;
    while read < data.len() {
        let byte = data[read];
        if zero_run >= 2 && byte == 0x03 {
            zero_run = 0;
            read += 1;
            continue;
        }
        if byte == 0x00 {
            zero_run += 1;
        } else {
            zero_run = 0;
        }
        data[write] = byte;
        write += 1;
        read += 1;
    }
    data.truncate(write);
}
