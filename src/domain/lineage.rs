//! Quotation lineage planning
//!
//! Every party has one root quotation (version 1, no original). Each later
//! quotation gets the next version and points back at that root, never at an
//! intermediate revision. Titles are derived from the party identifier and
//! the version.

use bson::oid::ObjectId;

use crate::model::quotation::Quotation;

pub const TITLE_PREFIX: &str = "quote";
pub const UNKNOWN_PARTY_TITLE: &str = "quote-unknown";

/// The lineage-relevant slice of a stored quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotationVersionRef {
    pub id: ObjectId,
    pub version: u32,
    pub original_quote: Option<ObjectId>,
}

impl QuotationVersionRef {
    pub fn from_quotation(quotation: &Quotation) -> Option<Self> {
        quotation.id.map(|id| QuotationVersionRef {
            id,
            version: quotation.version,
            original_quote: quotation.original_quote,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageAnomaly {
    /// No version-1 quotation survives for the party.
    MissingRoot { anchored_to: ObjectId },
    /// The party has no usable identifier; the title is a placeholder.
    UnresolvedParty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineagePlan {
    pub version: u32,
    pub original_quote: Option<ObjectId>,
    pub title: String,
    pub anomalies: Vec<LineageAnomaly>,
}

impl LineagePlan {
    pub fn has_unresolved_party(&self) -> bool {
        self.anomalies.contains(&LineageAnomaly::UnresolvedParty)
    }
}

pub fn quotation_title(party_id: &str, version: u32) -> String {
    if version <= 1 {
        format!("{}-{}", TITLE_PREFIX, party_id)
    } else {
        format!("{}-{}-V{}", TITLE_PREFIX, party_id, version)
    }
}

/// Highest version among `existing`, zero when empty.
pub fn max_version(existing: &[QuotationVersionRef]) -> u32 {
    existing.iter().map(|q| q.version).max().unwrap_or(0)
}

/// Plans version, original reference and title for the next quotation.
///
/// `revision_source` names the quotation being revised, if any. It anchors
/// the lineage when the root has been deleted. `reserved_version` is a value
/// handed out by a per-party counter; when present it wins over max-scan
/// (but never goes below it). An empty history always starts a new root at
/// version 1.
pub fn plan_quotation(
    party_id: Option<&str>,
    existing: &[QuotationVersionRef],
    revision_source: Option<ObjectId>,
    reserved_version: Option<u32>,
) -> LineagePlan {
    let mut anomalies = Vec::new();
    let scanned = max_version(existing).saturating_add(1);
    let version = match reserved_version {
        _ if existing.is_empty() => 1,
        Some(reserved) => reserved.max(scanned),
        None => scanned,
    };

    let original_quote = if existing.is_empty() {
        None
    } else if let Some(root) = existing.iter().find(|q| q.version == 1) {
        Some(root.id)
    } else {
        let anchor = revision_source.or_else(|| existing.iter().min_by_key(|q| q.version).map(|q| q.id));
        if let Some(anchored_to) = anchor {
            anomalies.push(LineageAnomaly::MissingRoot { anchored_to });
        }
        anchor
    };

    let title = match party_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => quotation_title(id, version),
        None => {
            anomalies.push(LineageAnomaly::UnresolvedParty);
            UNKNOWN_PARTY_TITLE.to_string()
        }
    };

    LineagePlan {
        version,
        original_quote,
        title,
        anomalies,
    }
}
