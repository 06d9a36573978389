// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Accumulates caller-supplied bytes into ES units, removes emulation
//! prevention, and hands completed units to the ready queue.
//!
//! Grounded on the ingest path of `decoder_decode_es_unit` in the original
//! implementation: pull an idle unit, append incoming bytes, run the
//! emulation-prevention scan, push to the ready list, and keep no working
//! unit held between calls (a fresh one is pulled from idle each time).

use crate::es_unit::{remove_emulation_prevention, EsUnit, EsUnitPool};

/// One packet submitted by the caller, prior to framing.
pub struct Packet<'a> {
    pub data: &'a [u8],
    pub pts: i64,
    pub dts: i64,
    /// Caller-asserted frame boundary at the end of this chunk. Framing here
    /// never depends on it (accumulation and the emulation-prevention scan
    /// handle that), but it is carried through for tracing.
    pub marker: bool,
}

/// Pulls an idle unit, copies `packet`'s bytes into it, strips emulation
/// prevention, and pushes the result onto the ready queue. `Vec<u8>`'s
/// automatic growth stands in for the original's manual
/// allocate-bigger-copy-free dance; the pool-size invariant only constrains
/// how many `EsUnit`s exist, not each one's capacity.
pub fn ingest_packet(pool: &EsUnitPool, packet: Packet<'_>) -> Result<(), crate::error::ApiError> {
    if packet.data.is_empty() {
        return Err(crate::error::ApiError::EmptyPacket);
    }
    let mut unit: EsUnit = pool
        .take_idle(true)
        .expect("idle queue only returns None after shutdown, which ingest never triggers");
    unit.data.extend_from_slice(packet.data);
    unit.pts = packet.pts;
    unit.dts = packet.dts;
    remove_emulation_prevention(&mut unit.data);
    pool.push_ready(unit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_packet() {
        let pool = EsUnitPool::new(2);
        let err = ingest_packet(
            &pool,
            Packet {
                data: &[],
                pts: 0,
                dts: 0,
                marker: false,
            },
        );
        assert!(matches!(err, Err(crate::error::ApiError::EmptyPacket)));
    }

    /// Submitting the same bytes one `ingest_packet` call per byte must
    /// produce the same total content as a single bulk call, since each
    /// call's emulation-prevention scan only sees that call's own bytes:
    /// a `00 00 03` pattern split across two single-byte calls would not be
    /// recognized (that edge case is the pool/bulk-only behavior covered by
    /// `es_unit::tests::removes_emulation_prevention_byte`), so this uses
    /// bytes with no such pattern to isolate the chunking property alone.
    #[test]
    fn single_byte_packets_equal_bulk_submission() {
        let bulk_pool = EsUnitPool::new(2);
        let bytes = [0x01, 0x67, 0x42, 0x00, 0x01, 0x02, 0x03, 0x04];
        ingest_packet(
            &bulk_pool,
            Packet {
                data: &bytes,
                pts: 0,
                dts: 0,
                marker: true,
            },
        )
        .unwrap();
        let bulk_result = bulk_pool.take_ready(false).unwrap().data;

        let byte_pool = EsUnitPool::new(2);
        for &byte in &bytes {
            ingest_packet(
                &byte_pool,
                Packet {
                    data: std::slice::from_ref(&byte),
                    pts: 0,
                    dts: 0,
                    marker: false,
                },
            )
            .unwrap();
        }
        // Each single-byte packet pulls a fresh idle unit and immediately
        // pushes it to ready (ingest keeps no working unit across calls),
        // so the ready queue holds one one-byte unit per call; concatenate
        // them in submission order to compare against the bulk result.
        let mut byte_result = Vec::new();
        while let Some(unit) = byte_pool.take_ready(false) {
            byte_result.extend_from_slice(&unit.data);
        }
        assert_eq!(byte_result, bulk_result);
    }
}
