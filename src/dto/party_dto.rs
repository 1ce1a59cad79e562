use crate::model::party::{FollowUp, NextFollowUp, Party, PartyDetails};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use validator::{Validate, ValidateEmail, ValidationError};

/// Blank means "no email"; anything else must be an address.
fn blank_or_email(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1, max = 30))]
    pub phone: String,

    #[validate(length(min = 1, max = 500))]
    pub address: String,

    #[validate(custom(function = "blank_or_email"))]
    pub email: Option<String>,
}

/// Partial update. Any `partyId` in the body is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 30))]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 500))]
    pub address: Option<String>,

    #[validate(custom(function = "blank_or_email"))]
    pub email: Option<String>,

    pub is_active: Option<bool>,
}

impl From<UpdatePartyRequest> for PartyDetails {
    fn from(request: UpdatePartyRequest) -> Self {
        PartyDetails {
            name: request.name.map(|s| s.trim().to_string()),
            phone: request.phone.map(|s| s.trim().to_string()),
            address: request.address.map(|s| s.trim().to_string()),
            email: request.email.map(|s| s.trim().to_string()),
            is_active: request.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddFollowUpRequest {
    pub scheduled_at: DateTime<Utc>,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub note: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpcomingQuery {
    /// `YYYY-MM-DD`; today (UTC) when absent.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpResponse {
    pub id: String,
    pub scheduled_at: String,
    pub note: String,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
}

impl From<&FollowUp> for FollowUpResponse {
    fn from(follow_up: &FollowUp) -> Self {
        FollowUpResponse {
            id: follow_up.id.to_hex(),
            scheduled_at: follow_up.scheduled_at.to_rfc3339(),
            note: follow_up.note.clone(),
            completed: follow_up.completed,
            completed_at: follow_up.completed_at.map(|at| at.to_rfc3339()),
            created_at: follow_up.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextFollowUpResponse {
    pub follow_up_id: String,
    pub scheduled_at: String,
    pub note: String,
}

impl From<&NextFollowUp> for NextFollowUpResponse {
    fn from(next: &NextFollowUp) -> Self {
        NextFollowUpResponse {
            follow_up_id: next.follow_up_id.to_hex(),
            scheduled_at: next.scheduled_at.to_rfc3339(),
            note: next.note.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyResponse {
    pub id: String,
    pub party_id: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub follow_ups: Vec<FollowUpResponse>,
    pub next_follow_up: Option<NextFollowUpResponse>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Party> for PartyResponse {
    fn from(party: Party) -> Self {
        PartyResponse {
            id: party.id.map(|id| id.to_hex()).unwrap_or_default(),
            party_id: party.party_id,
            name: party.name,
            phone: party.phone,
            address: party.address,
            email: party.email,
            is_active: party.is_active,
            follow_ups: party.follow_ups.iter().map(FollowUpResponse::from).collect(),
            next_follow_up: party.next_follow_up.as_ref().map(NextFollowUpResponse::from),
            created_at: party.created_at.map(|at| at.to_rfc3339()),
            updated_at: party.updated_at.map(|at| at.to_rfc3339()),
        }
    }
}
