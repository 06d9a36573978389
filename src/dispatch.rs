// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Claims a free task slot, parses a ready ES unit's header, binds its
//! references, and submits reconstruction to the worker pool.
//!
//! Grounded on `decoder_decode_es_unit` in the original implementation: the
//! parse-and-bind step runs under the `aec` mutex (serializing the bitstream
//! reader and DPB lookups), while publishing the finished frame and freeing
//! the slot happens later, under the `mgr` mutex, inside the pool job itself
//! — keeping pool workers' lock usage to that one brief step, per the
//! concurrency model's stated lock-order rule (`aec` before `mgr`, never the
//! reverse, and pool workers never take `aec` at all).

use std::sync::{Arc, Condvar, Mutex};

use crate::collab::{ParseOutcome, Parser, Reconstructor, ReferenceBinder};
use crate::es_unit::EsUnitPool;
use crate::frame::OutputPicture;
use crate::reorder::ReorderState;
use crate::slot::SlotArray;

/// What dispatching one ES unit produced.
pub enum DispatchOutcome {
    /// The unit was a sequence header; no picture was submitted.
    SequenceHeader(Vec<u8>),
    /// A picture header was accepted and reconstruction was submitted.
    Submitted,
    /// Parsing or reference-binding failed; the unit was discarded.
    Discarded,
}

pub struct Dispatcher<Ctx, P, C> {
    collaborator: Arc<C>,
    slots: Arc<SlotArray<Ctx>>,
    pool_handle: Arc<crate::pool::WorkerPool>,
    es_units: Arc<EsUnitPool>,
    /// Serializes the bitstream-reader init, header parse, and reference
    /// binding; held only around that sequence, never around reconstruction.
    aec_mutex: Mutex<()>,
    reorder: Arc<Mutex<ReorderState<P>>>,
    frame_posted: Arc<Condvar>,
    num_frames_in: Arc<Mutex<u64>>,
}

impl<Ctx, P, C> Dispatcher<Ctx, P, C>
where
    Ctx: Default + Send + 'static,
    P: Send + 'static,
    C: Parser<Ctx> + ReferenceBinder<Ctx> + Reconstructor<Ctx, P> + Send + Sync + 'static,
{
    pub fn new(
        collaborator: Arc<C>,
        slots: Arc<SlotArray<Ctx>>,
        pool_handle: Arc<crate::pool::WorkerPool>,
        es_units: Arc<EsUnitPool>,
        reorder: Arc<Mutex<ReorderState<P>>>,
        frame_posted: Arc<Condvar>,
        num_frames_in: Arc<Mutex<u64>>,
    ) -> Self {
        Self {
            collaborator,
            slots,
            pool_handle,
            es_units,
            aec_mutex: Mutex::new(()),
            reorder,
            frame_posted,
            num_frames_in,
        }
    }

    /// Claims a slot for one ready ES unit and drives it through parse,
    /// bind, and submission. Blocks (bounded) waiting for a free slot;
    /// returns `None` if there was no ready unit (when `blocking_on_ready` is
    /// false), or if `exit` fired while waiting for a slot (the unit is
    /// pushed back onto ready in that case).
    pub fn dispatch_one(&self, blocking_on_ready: bool, exit: &impl Fn() -> bool) -> Option<DispatchOutcome> {
        let unit = self.es_units.take_ready(blocking_on_ready)?;
        let slot_id = match self.slots.claim(unit, Ctx::default(), exit) {
            Ok(id) => id,
            Err(unit) => {
                self.es_units.push_ready(unit);
                return None;
            }
        };

        let guard = self.aec_mutex.lock().unwrap();
        let outcome = self
            .slots
            .slot(slot_id)
            .with_unit_and_ctx(|unit, ctx| {
                self.parse_and_bind(unit.data.as_slice(), unit.pts, unit.dts, ctx)
            })
            .expect("slot was just claimed and cannot have been released concurrently");
        drop(guard);

        match outcome {
            Ok(ParseOutcome::SequenceHeader(sps)) => {
                self.release_slot(slot_id);
                Some(DispatchOutcome::SequenceHeader(sps))
            }
            Ok(ParseOutcome::PictureHeader { .. }) => {
                *self.num_frames_in.lock().unwrap() += 1;
                self.submit_reconstruction(slot_id);
                Some(DispatchOutcome::Submitted)
            }
            Err(()) => {
                self.release_slot(slot_id);
                Some(DispatchOutcome::Discarded)
            }
        }
    }

    fn parse_and_bind(
        &self,
        data: &[u8],
        pts: i64,
        dts: i64,
        ctx: &mut Ctx,
    ) -> Result<ParseOutcome, ()> {
        let outcome = self.collaborator.parse_header(ctx, data).map_err(|err| {
            log::warn!("discarding es unit: parse error: {err}");
        })?;
        if let ParseOutcome::PictureHeader { .. } = &outcome {
            self.collaborator
                .bind_references(ctx, pts, dts)
                .map_err(|err| {
                    log::warn!("discarding es unit: reference bind error: {err}");
                })?;
        }
        Ok(outcome)
    }

    fn submit_reconstruction(&self, slot_id: usize) {
        let collaborator = self.collaborator.clone();
        let slots = self.slots.clone();
        let es_units = self.es_units.clone();
        let reorder = self.reorder.clone();
        let frame_posted = self.frame_posted.clone();
        self.pool_handle.submit(move || {
            let result = slots
                .slot(slot_id)
                .with_ctx(|ctx| collaborator.reconstruct(ctx));
            match result {
                Some(Ok(frame)) => {
                    let picture = OutputPicture {
                        frame: Arc::new(frame),
                    };
                    reorder.lock().unwrap().post(picture);
                    frame_posted.notify_all();
                }
                Some(Err(err)) => log::warn!("reconstruction failed: {err}"),
                None => {}
            }
            if let Some(unit) = slots.release(slot_id) {
                es_units.recycle(unit);
            }
        });
    }

    fn release_slot(&self, slot_id: usize) {
        if let Some(unit) = self.slots.release(slot_id) {
            self.es_units.recycle(unit);
        }
    }
}
