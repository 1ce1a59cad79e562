use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::optional_bson_datetime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    /// Human-readable identifier (`P0001`). Empty only for legacy records.
    #[serde(default)]
    pub party_id: String,
    /// Numeric payload of `party_id`; absent for clock-derived identifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    pub name: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
    #[serde(default)]
    pub next_follow_up: Option<NextFollowUp>,
    #[serde(default)]
    pub follow_up_revision: i64,
    #[serde(default, with = "optional_bson_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_bson_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "optional_bson_datetime")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Cached copy of the earliest pending follow-up of a party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextFollowUp {
    pub follow_up_id: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
}

impl From<&FollowUp> for NextFollowUp {
    fn from(follow_up: &FollowUp) -> Self {
        NextFollowUp {
            follow_up_id: follow_up.id,
            scheduled_at: follow_up.scheduled_at,
            note: follow_up.note.clone(),
        }
    }
}

/// Editable party fields. The identifier is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct PartyDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// An empty string clears the stored address.
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyStats {
    pub total_parties: u64,
    pub parties_with_quotations: u64,
    pub parties_without_quotations: u64,
    /// False when no quotation store is wired in; the quotation counts are then zero.
    pub quotation_model_available: bool,
}
