//! Party identifier sequencing
//!
//! Identifiers look like `P0001`: a fixed prefix followed by the sequence
//! number zero-padded to four digits. Numbers above 9999 widen the field
//! instead of being truncated.
//!
//! Nothing here touches storage. The caller reads the latest identifier,
//! asks for the next one and relies on the unique index on `partyId` to
//! detect a lost race, then asks again.

use chrono::{DateTime, Utc};

pub const PARTY_ID_PREFIX: &str = "P";
pub const PARTY_ID_WIDTH: usize = 4;

/// Marker placed after the prefix for clock-derived identifiers. It keeps
/// them out of the `P<digits>` space so they never feed a later max-scan.
pub const CLOCK_ID_MARKER: &str = "T";

/// How a sequence number was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSource {
    /// No identifier had been assigned yet.
    First,
    /// Latest identifier parsed and was incremented.
    Incremented,
    /// Latest identifier did not parse; the record count was used instead.
    CountFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceAssignment {
    pub party_id: String,
    pub sequence: u64,
    pub source: SequenceSource,
}

/// Extracts the numeric payload of a `P<digits>` identifier.
pub fn parse_sequence(party_id: &str) -> Option<u64> {
    let digits = party_id.strip_prefix(PARTY_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn format_party_id(sequence: u64) -> String {
    format!("{}{:0width$}", PARTY_ID_PREFIX, sequence, width = PARTY_ID_WIDTH)
}

/// Derives the next identifier from the latest assigned one.
///
/// `fallback_count` is the number of existing parties; it is only consulted
/// when `current_max` is present but unparseable.
pub fn assign_identifier(current_max: Option<&str>, fallback_count: u64) -> SequenceAssignment {
    let (sequence, source) = match current_max {
        None => (1, SequenceSource::First),
        Some(latest) => match parse_sequence(latest) {
            Some(n) => (n.saturating_add(1), SequenceSource::Incremented),
            None => (fallback_count.saturating_add(1), SequenceSource::CountFallback),
        },
    };
    SequenceAssignment {
        party_id: format_party_id(sequence),
        sequence,
        source,
    }
}

/// Last-resort identifier once conflict retries are exhausted.
pub fn clock_identifier(now: DateTime<Utc>) -> String {
    format!("{}{}{}", PARTY_ID_PREFIX, CLOCK_ID_MARKER, now.timestamp_millis())
}
