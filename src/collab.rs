// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Trait contracts for the three external collaborators the control plane
//! drives but does not implement: bitstream syntax parsing, decoded-picture-
//! buffer reference binding, and pixel reconstruction. Modeled on the narrow
//! `C2Worker`/`StatelessDecoderBackend`-style trait seams this crate's
//! worker pool is grounded on: the control plane only needs to know the
//! shape of the boundary, never the codec-specific internals behind it.

use crate::error::{BindError, ParseError, ReconstructError};
use crate::frame::Frame;

/// Outcome of [`Parser::parse_header`].
pub enum ParseOutcome {
    /// A sequence header was captured; no picture to decode yet.
    SequenceHeader(Vec<u8>),
    /// A picture header was accepted; `poc`/`coi` identify it for ordering
    /// and delivery (reference binding itself keys off the ES unit's
    /// `pts`/`dts`, not these).
    PictureHeader { poc: i64, coi: i64 },
}

/// Parses one framed ES unit's bitstream syntax.
///
/// `Ctx` is the implementation-defined per-slot decoder context threaded
/// through parse, bind, and reconstruct.
pub trait Parser<Ctx> {
    fn parse_header(&self, ctx: &mut Ctx, data: &[u8]) -> Result<ParseOutcome, ParseError>;
}

/// Binds the current picture's reference list from the decoded-picture
/// buffer and allocates its reconstruction target.
///
/// `pts`/`dts` are the ES unit's own timestamps, not the picture's POC/COI —
/// matching `task_get_references(h, es_unit->pts, es_unit->dts)` in the
/// original implementation.
pub trait ReferenceBinder<Ctx> {
    fn bind_references(&self, ctx: &mut Ctx, pts: i64, dts: i64) -> Result<(), BindError>;
}

/// Performs entropy decoding and pixel reconstruction for a bound picture.
///
/// Returns the finished frame; the control plane (not the collaborator)
/// inserts it into the output list and frees the task slot, keeping pool
/// workers' lock usage limited to that one brief step under the manager
/// mutex.
pub trait Reconstructor<Ctx, P> {
    fn reconstruct(&self, ctx: &mut Ctx) -> Result<Frame<P>, ReconstructError>;
}
