// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Reference-counted picture buffers and the output records that carry them
//! to the caller.
//!
//! The original implementation this crate is modeled on manages picture
//! lifetime with a manually pooled, manually recycled "output record" whose
//! `frame` field is cleared on recycle to break the slot/frame/output-record
//! ownership cycle. Here `Arc<Frame<P>>` does that job directly: nothing
//! holds a mutable back-reference to its owner, so there is no cycle to
//! break, only shared, reference-counted views of the same picture data.

use std::sync::Arc;

/// A reconstructed picture, opaque to the control plane beyond the
/// attributes it needs for ordering and delivery. `P` is the
/// implementation-defined pixel/sample storage (owned by a collaborator).
pub struct Frame<P> {
    pub poc: i64,
    pub coi: i64,
    pub picture_type: PictureType,
    /// Quantization parameter the picture was coded at.
    pub qp: u32,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub samples: P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    I,
    P,
    B,
}

/// A frame handed back to the caller, plus enough bookkeeping to support
/// [`crate::manager::Manager::frame_unref`]. Recycling a `davs2`-style output
/// record collapses to dropping this value: there is no separate pooled node
/// to return to a manager-owned recycle list.
pub struct OutputPicture<P> {
    pub frame: Arc<Frame<P>>,
}

impl<P> OutputPicture<P> {
    pub fn poc(&self) -> i64 {
        self.frame.poc
    }
}

impl<P> Clone for OutputPicture<P> {
    fn clone(&self) -> Self {
        Self {
            frame: self.frame.clone(),
        }
    }
}
