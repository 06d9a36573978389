// Copyright 2026 The avs2-decoder Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! End-to-end coverage of the decoder lifecycle against a mock collaborator
//! standing in for bitstream parsing, reference binding, and reconstruction.
//!
//! Packets are three header bytes plus an unused payload byte:
//! `[tag, poc, coi, 0x00]`. `tag == 0xFE` is a sequence header (the rest of
//! the bytes are its payload); `tag == 0xFD` is a picture header that fails
//! to parse; anything else is a picture header at POC `poc` referencing
//! nothing (`bind_references` always succeeds).

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use avs2_decoder::{
    ApiError, BindError, DecoderParams, Manager, Packet, ParseError, ParseOutcome, Parser,
    PictureType, ReconstructError, Reconstructor, ReferenceBinder, ReturnKind,
};

#[derive(Default)]
struct MockCtx {
    poc: i64,
    coi: i64,
}

struct MockCollaborator {
    binds: AtomicUsize,
}

impl MockCollaborator {
    fn new() -> Self {
        Self {
            binds: AtomicUsize::new(0),
        }
    }
}

const TAG_SEQUENCE_HEADER: u8 = 0xFE;
const TAG_MALFORMED: u8 = 0xFD;

fn packet_bytes(tag: u8, poc: i64, coi: i64) -> Vec<u8> {
    vec![tag, poc as u8, coi as u8, 0x00]
}

impl Parser<MockCtx> for MockCollaborator {
    fn parse_header(&self, ctx: &mut MockCtx, data: &[u8]) -> Result<ParseOutcome, ParseError> {
        let tag = *data.first().ok_or_else(|| ParseError::Malformed("empty unit".into()))?;
        match tag {
            TAG_SEQUENCE_HEADER => Ok(ParseOutcome::SequenceHeader(data[1..].to_vec())),
            TAG_MALFORMED => Err(ParseError::Malformed("poisoned header byte".into())),
            _ => {
                let poc = data[1] as i64;
                let coi = data[2] as i64;
                ctx.poc = poc;
                ctx.coi = coi;
                Ok(ParseOutcome::PictureHeader { poc, coi })
            }
        }
    }
}

impl ReferenceBinder<MockCtx> for MockCollaborator {
    fn bind_references(&self, _ctx: &mut MockCtx, _pts: i64, _dts: i64) -> Result<(), BindError> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Reconstructor<MockCtx, i64> for MockCollaborator {
    fn reconstruct(&self, ctx: &mut MockCtx) -> Result<avs2_decoder::Frame<i64>, ReconstructError> {
        Ok(avs2_decoder::Frame {
            poc: ctx.poc,
            coi: ctx.coi,
            picture_type: PictureType::P,
            qp: 32,
            width: 0,
            height: 0,
            bit_depth: 8,
            samples: ctx.poc,
        })
    }
}

fn open(backlog_limit: usize) -> Manager<MockCtx, i64, MockCollaborator> {
    Manager::open(
        DecoderParams {
            threads: 2,
            reorder_backlog_limit: backlog_limit,
            trace_path: None,
            always_wait_for_output: true,
        },
        MockCollaborator::new(),
    )
    .unwrap()
}

fn drain_flush(manager: &mut Manager<MockCtx, i64, MockCollaborator>) -> Vec<i64> {
    let mut pocs = Vec::new();
    loop {
        match manager.flush() {
            ReturnKind::GotFrame(picture) => pocs.push(picture.poc()),
            ReturnKind::GotHeader(_) => {}
            ReturnKind::GotBoth(_, picture) => pocs.push(picture.poc()),
            ReturnKind::Default => continue,
            ReturnKind::End => break,
        }
    }
    pocs
}

/// Folds a `decode`/`flush` return into the running (header-seen, pocs)
/// accumulator; a header or frame can arrive on either call.
fn absorb(seen_header: &mut bool, pocs: &mut Vec<i64>, output: ReturnKind<i64>) {
    match output {
        ReturnKind::GotFrame(picture) => pocs.push(picture.poc()),
        ReturnKind::GotHeader(_) => *seen_header = true,
        ReturnKind::GotBoth(_, picture) => {
            *seen_header = true;
            pocs.push(picture.poc());
        }
        ReturnKind::Default | ReturnKind::End => {}
    }
}

#[test]
fn delivers_in_ascending_poc_order_for_interleaved_coding_order() {
    let mut manager = open(8);
    // I @ POC 0, P @ POC 2, B @ POC 1: coding order submits the future
    // reference (P) before the frame that depends on it (B).
    manager
        .decode(Packet {
            data: &packet_bytes(0x00, 0, 0),
            pts: 0,
            dts: 0,
            marker: false,
        })
        .unwrap();
    manager
        .decode(Packet {
            data: &packet_bytes(0x00, 2, 1),
            pts: 2,
            dts: 1,
            marker: false,
        })
        .unwrap();
    manager
        .decode(Packet {
            data: &packet_bytes(0x00, 1, 2),
            pts: 1,
            dts: 2,
            marker: false,
        })
        .unwrap();

    let pocs = drain_flush(&mut manager);
    assert_eq!(pocs, vec![0, 1, 2]);
    assert_eq!(manager.num_frames_out(), 3);
    assert_eq!(manager.num_frames_out(), manager.num_frames_in());
}

#[test]
fn rejects_empty_packet() {
    let manager = open(8);
    let err = manager.decode(Packet {
        data: &[],
        pts: 0,
        dts: 0,
        marker: false,
    });
    assert!(matches!(err, Err(ApiError::EmptyPacket)));
}

#[test]
fn flush_is_complete_num_frames_out_matches_in() {
    let mut manager = open(8);
    for poc in 0..5 {
        manager
            .decode(Packet {
                data: &packet_bytes(0x00, poc, poc),
                pts: poc,
                dts: poc,
                marker: false,
            })
            .unwrap();
    }
    let pocs = drain_flush(&mut manager);
    assert_eq!(pocs, vec![0, 1, 2, 3, 4]);
    assert_eq!(manager.num_frames_out(), manager.num_frames_in());
}

#[test]
fn each_poc_is_delivered_exactly_once() {
    let mut manager = open(8);
    for poc in 0..6 {
        manager
            .decode(Packet {
                data: &packet_bytes(0x00, poc, poc),
                pts: poc,
                dts: poc,
                marker: false,
            })
            .unwrap();
    }
    let pocs = drain_flush(&mut manager);
    let unique: HashSet<i64> = pocs.iter().copied().collect();
    assert_eq!(unique.len(), pocs.len());
}

#[test]
fn malformed_unit_is_discarded_not_delivered() {
    let mut manager = open(8);
    manager
        .decode(Packet {
            data: &packet_bytes(TAG_MALFORMED, 0, 0),
            pts: 0,
            dts: 0,
            marker: false,
        })
        .unwrap();
    manager
        .decode(Packet {
            data: &packet_bytes(0x00, 0, 0),
            pts: 0,
            dts: 0,
            marker: false,
        })
        .unwrap();

    let pocs = drain_flush(&mut manager);
    assert_eq!(pocs, vec![0]);
    assert_eq!(manager.num_frames_in(), 1);
    assert_eq!(manager.num_frames_out(), 1);
}

#[test]
fn sequence_header_is_surfaced_alongside_or_before_the_next_frame() {
    let mut manager = open(8);
    let mut saw_header = false;
    let mut pocs = Vec::new();

    let (_, output) = manager
        .decode(Packet {
            data: &packet_bytes(TAG_SEQUENCE_HEADER, 0, 0),
            pts: 0,
            dts: 0,
            marker: false,
        })
        .unwrap();
    absorb(&mut saw_header, &mut pocs, output);

    let (_, output) = manager
        .decode(Packet {
            data: &packet_bytes(0x00, 0, 0),
            pts: 0,
            dts: 0,
            marker: false,
        })
        .unwrap();
    absorb(&mut saw_header, &mut pocs, output);

    loop {
        let output = manager.flush();
        let is_end = matches!(output, ReturnKind::End);
        absorb(&mut saw_header, &mut pocs, output);
        if is_end {
            break;
        }
    }

    assert!(saw_header);
    assert_eq!(pocs, vec![0]);
}

#[test]
fn dropping_the_manager_mid_decode_does_not_hang() {
    let mut manager = open(8);
    manager
        .decode(Packet {
            data: &packet_bytes(0x00, 0, 0),
            pts: 0,
            dts: 0,
            marker: false,
        })
        .unwrap();
    // No flush: at least one reconstruction job may still be in flight.
    // Drop must tear the pool down (joining its workers) rather than block
    // forever waiting for delivery that nobody will request.
    drop(manager);
}

#[test]
fn closed_decoder_rejects_further_packets() {
    let manager = open(8);
    manager.close();
    let err = manager.decode(Packet {
        data: &packet_bytes(0x00, 0, 0),
        pts: 0,
        dts: 0,
        marker: false,
    });
    assert!(matches!(err, Err(ApiError::Closed)));
}
