// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Optional bitstream/decision trace file, the runtime-configured successor
//! to the original implementation's compile-time-gated trace hooks.
//!
//! Where the source wrote to `trace_bitstream.avs` / `trace_input.txt` only
//! when built with its trace feature enabled, this crate exposes a single
//! `Option<PathBuf>` in [`crate::DecoderParams`]: when set, every packet and
//! delivery decision is appended to that path. When unset this is a zero-cost
//! `None` check, so there is no cargo feature gate to carry.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::OpenError;

pub struct Tracer {
    file: File,
}

impl Tracer {
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| OpenError::TraceFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { file })
    }

    pub fn trace_packet(&mut self, len: usize, marker: bool, pts: i64, dts: i64) {
        let _ = writeln!(self.file, "packet len={len} marker={marker} pts={pts} dts={dts}");
    }

    pub fn trace_delivery(&mut self, poc: i64, num_frames_in: u64, num_frames_out: u64) {
        let _ = writeln!(
            self.file,
            "deliver poc={poc} num_frames_in={num_frames_in} num_frames_out={num_frames_out}"
        );
    }
}
