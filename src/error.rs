// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Typed errors for each boundary of the decoder control plane, one enum per
//! boundary rather than a single crate-wide error, matching the split used
//! for the stateless decoding boundary this crate's worker pool is modeled on.

use thiserror::Error;

/// Errors that can occur while opening a decoder.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("reorder backlog limit must be at least 1")]
    InvalidReorderLimit,
    #[error("failed to allocate es-unit pool: {0}")]
    PoolAllocation(String),
    #[error("failed to open trace file at {path}: {source}")]
    TraceFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by the `decode`/`flush` entry points.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("packet has zero length")]
    EmptyPacket,
    #[error("decoder has already been closed")]
    Closed,
}

/// Errors returned by a [`crate::collab::Parser`] implementation.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("bitstream is malformed: {0}")]
    Malformed(String),
    #[error("collaborator parser error")]
    Other(#[source] anyhow::Error),
}

/// Errors returned by a [`crate::collab::ReferenceBinder`] implementation.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("no reference picture available for POC {0}")]
    MissingReference(i64),
    #[error("collaborator reference-binding error")]
    Other(#[source] anyhow::Error),
}

/// Errors returned by a [`crate::collab::Reconstructor`] implementation.
#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("collaborator reconstruction error")]
    Other(#[source] anyhow::Error),
}
