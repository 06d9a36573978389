// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Task slots: the bounded pool of in-flight decode contexts. Each slot owns
//! at most one ES unit at a time and moves between `Free` and `Busy` under
//! the manager mutex, mirroring the busy-scan-for-a-free-slot loop of the
//! original implementation, but blocking on a condvar instead of sleeping.

use std::sync::{Condvar, Mutex};

use crate::es_unit::EsUnit;

enum SlotState<Ctx> {
    Free,
    Busy { es_unit: EsUnit, ctx: Box<Ctx> },
}

/// One task slot.
pub struct TaskSlot<Ctx> {
    pub id: usize,
    state: Mutex<SlotState<Ctx>>,
}

impl<Ctx> TaskSlot<Ctx> {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            state: Mutex::new(SlotState::Free),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(*self.state.lock().unwrap(), SlotState::Free)
    }

    /// Attempts to claim this slot. On success takes ownership of `es_unit`
    /// and `ctx`. On failure (already busy) hands both back unchanged so the
    /// caller can try the next slot.
    pub fn try_claim(&self, es_unit: EsUnit, ctx: Ctx) -> Result<(), (EsUnit, Ctx)> {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, SlotState::Busy { .. }) {
            return Err((es_unit, ctx));
        }
        *state = SlotState::Busy {
            es_unit,
            ctx: Box::new(ctx),
        };
        Ok(())
    }

    /// Releases the slot, returning the ES unit it held so it can be
    /// recycled into the idle pool. Returns `None` if already free.
    pub fn release(&self) -> Option<EsUnit> {
        let mut state = self.state.lock().unwrap();
        match std::mem::replace(&mut *state, SlotState::Free) {
            SlotState::Busy { es_unit, .. } => Some(es_unit),
            SlotState::Free => None,
        }
    }

    pub fn with_ctx<R>(&self, f: impl FnOnce(&mut Ctx) -> R) -> Option<R> {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            SlotState::Busy { ctx, .. } => Some(f(ctx)),
            SlotState::Free => None,
        }
    }

    /// Gives a parse/bind step access to both the slot's raw bytes and its
    /// decoder context at once.
    pub fn with_unit_and_ctx<R>(&self, f: impl FnOnce(&EsUnit, &mut Ctx) -> R) -> Option<R> {
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            SlotState::Busy { es_unit, ctx } => Some(f(es_unit, ctx)),
            SlotState::Free => None,
        }
    }
}

/// Scans a fixed array of slots for the first free one, blocking on
/// `released` until one becomes available or `exit` is observed.
pub struct SlotArray<Ctx> {
    slots: Vec<TaskSlot<Ctx>>,
    released: Condvar,
    released_lock: Mutex<()>,
}

impl<Ctx> SlotArray<Ctx> {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(TaskSlot::new).collect(),
            released: Condvar::new(),
            released_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Claims the first free slot, waiting (bounded) if none are free and
    /// `exit` has not been signalled. Returns `Err(es_unit)` only once
    /// `exit` fires, handing the unit back to the caller.
    pub fn claim(
        &self,
        mut es_unit: EsUnit,
        mut ctx: Ctx,
        exit: &impl Fn() -> bool,
    ) -> Result<usize, EsUnit> {
        loop {
            for slot in &self.slots {
                match slot.try_claim(es_unit, ctx) {
                    Ok(()) => return Ok(slot.id),
                    Err((unit, c)) => {
                        es_unit = unit;
                        ctx = c;
                    }
                }
            }
            if exit() {
                return Err(es_unit);
            }
            let guard = self.released_lock.lock().unwrap();
            let (_guard, _timeout) = self
                .released
                .wait_timeout(guard, std::time::Duration::from_millis(50))
                .unwrap();
        }
    }

    pub fn slot(&self, id: usize) -> &TaskSlot<Ctx> {
        &self.slots[id]
    }

    /// Releases slot `id` and wakes any thread waiting for a free slot.
    pub fn release(&self, id: usize) -> Option<EsUnit> {
        let unit = self.slots[id].release();
        self.released.notify_all();
        unit
    }
}
