//! Advisory cross-consistency checks over a decoded event.
//!
//! The hardware protocol guarantees these relations only when the readout
//! chain is healthy. The validator records where they fail without mutating
//! or rejecting the event; the caller decides what to do with the report.

use super::constants::EXPECTED_VFAT_MARKER;
use super::event::GemEvent;

/// Which relation a mismatch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Chamber trailer VFAT word count vs the chamber header's declared count.
    ChamberWordCountEcho,
    /// AMC trailer L1A echo vs the low 8 bits of the header's L1A id.
    L1aIdEcho,
    /// AMC trailer word count vs the words actually consumed by the decoder.
    TotalWordCount,
    /// Chamber-local bunch counter vs the event bunch crossing id plus one.
    ChamberBunchCounter,
    /// VFAT bunch counter vs the event bunch crossing id.
    VfatBunchCounter,
    /// VFAT marker vs its nominal constant.
    VfatMarker,
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Check::ChamberWordCountEcho => "chamber VFAT word count echo",
            Check::L1aIdEcho => "L1A id echo",
            Check::TotalWordCount => "total word count",
            Check::ChamberBunchCounter => "chamber bunch counter",
            Check::VfatBunchCounter => "VFAT bunch counter",
            Check::VfatMarker => "VFAT marker",
        };
        write!(f, "{name}")
    }
}

/// One failed consistency check, with the position it was observed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub check: Check,
    /// Chamber position within the event, for chamber- and VFAT-scoped checks.
    pub chamber: Option<usize>,
    /// VFAT position within the chamber, for VFAT-scoped checks.
    pub vfat: Option<usize>,
    pub observed: u64,
    pub expected: u64,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(chamber) = self.chamber {
            write!(f, "chamber {chamber} ")?;
        }
        if let Some(vfat) = self.vfat {
            write!(f, "VFAT {vfat} ")?;
        }
        write!(
            f,
            "{}: observed {:#x}, expected {:#x}",
            self.check, self.observed, self.expected
        )
    }
}

/// Run every advisory check against a decoded event.
///
/// Returns only the failed checks; an empty report means the event is
/// internally consistent.
pub fn validate(event: &GemEvent) -> Vec<Mismatch> {
    let mut report = Vec::new();

    check(
        &mut report,
        Check::L1aIdEcho,
        None,
        None,
        event.amc_trailer.l1a_id_echo as u64,
        (event.amc_header.l1a_id & 0xff) as u64,
    );
    check(
        &mut report,
        Check::TotalWordCount,
        None,
        None,
        event.amc_trailer.word_cnt as u64,
        event.words_consumed as u64,
    );

    for chamber in &event.chambers {
        let at_chamber = Some(chamber.chamber_index);
        check(
            &mut report,
            Check::ChamberWordCountEcho,
            at_chamber,
            None,
            chamber.trailer.vfat_word_cnt as u64,
            chamber.header.vfat_word_cnt as u64,
        );
        // Protocol convention: the chamber samples its bunch counter one
        // crossing after the trigger.
        check(
            &mut report,
            Check::ChamberBunchCounter,
            at_chamber,
            None,
            chamber.trailer.oh_bc as u64,
            event.amc_header.bx_id as u64 + 1,
        );

        for vfat in &chamber.vfats {
            let at_vfat = Some(vfat.vfat_index);
            check(
                &mut report,
                Check::VfatBunchCounter,
                at_chamber,
                at_vfat,
                vfat.bc as u64,
                event.amc_header.bx_id as u64,
            );
            check(
                &mut report,
                Check::VfatMarker,
                at_chamber,
                at_vfat,
                vfat.marker as u64,
                EXPECTED_VFAT_MARKER as u64,
            );
        }
    }

    report
}

fn check(
    report: &mut Vec<Mismatch>,
    check: Check,
    chamber: Option<usize>,
    vfat: Option<usize>,
    observed: u64,
    expected: u64,
) {
    if observed != expected {
        report.push(Mismatch {
            check,
            chamber,
            vfat,
            observed,
            expected,
        });
    }
}
