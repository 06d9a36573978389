// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Control plane for an AVS2 / IEEE 1857.4 video decoder: bitstream framing,
//! a bounded task-slot pool, worker dispatch, and out-of-order reconstruction
//! with in-order delivery.
//!
//! This crate does not parse AVS2 syntax or reconstruct pixels itself; those
//! are supplied by an implementation of the [collab] traits. What lives
//! here is everything around that boundary: accumulating caller bytes into
//! framed access units ([ingest]), claiming a task slot and driving one unit
//! through parse/bind/submit ([dispatch]), and collecting finished pictures
//! back into presentation order for delivery ([reorder]).

pub mod collab;
pub mod dispatch;
pub mod error;
pub mod es_unit;
pub mod frame;
pub mod ingest;
pub mod manager;
pub mod pool;
pub mod queue;
pub mod reorder;
pub mod slot;
pub mod trace;

pub use collab::{ParseOutcome, Parser, Reconstructor, ReferenceBinder};
pub use dispatch::DispatchOutcome;
pub use error::{ApiError, BindError, OpenError, ParseError, ReconstructError};
pub use frame::{Frame, OutputPicture, PictureType};
pub use ingest::Packet;
pub use manager::{DecoderParams, Manager, ReturnKind, MAX_THREADS};
pub use reorder::DEFAULT_REORDER_BACKLOG_LIMIT;
