use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

pub type Id = Uuid;

/// US states the intake form accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "us_state")]
pub enum UsState {
    MI,
    MD,
    PA,
    WV,
    OK,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "complaint_type")]
pub enum ComplaintType {
    Quality,
    Packaging,
    Service,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "submitter_role")]
pub enum SubmitterRole {
    Customer,
    Staff,
}

/// Lifecycle flag on a complaint. The only field mutable after creation.
/// Any member of the set is accepted on update (Resolved -> Open reopens).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "complaint_status")]
pub enum ComplaintStatus {
    Open,
    Resolved,
}

// Form fields arrive as plain strings; each closed set parses itself and an
// out-of-set value is rejected before anything is persisted.
impl FromStr for UsState {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "MI" => Ok(Self::MI),
            "MD" => Ok(Self::MD),
            "PA" => Ok(Self::PA),
            "WV" => Ok(Self::WV),
            "OK" => Ok(Self::OK),
            _ => Err(()),
        }
    }
}

impl FromStr for ComplaintType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "Quality" => Ok(Self::Quality),
            "Packaging" => Ok(Self::Packaging),
            "Service" => Ok(Self::Service),
            "Other" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

impl FromStr for SubmitterRole {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "Customer" => Ok(Self::Customer),
            "Staff" => Ok(Self::Staff),
            _ => Err(()),
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "Open" => Ok(Self::Open),
            "Resolved" => Ok(Self::Resolved),
            _ => Err(()),
        }
    }
}

/// A stored complaint record. Wire format is camelCase to match the original
/// intake API consumed by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Id,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub state: UsState,
    pub product_id: String,
    pub complaint_details: String,
    pub complaint_type: Option<ComplaintType>,
    pub submitter_role: Option<SubmitterRole>,
    pub photo_id: Option<Uuid>,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
}

/// Submission payload; `id`, `status` and `created_at` are assigned by the
/// repository on insert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub state: UsState,
    pub product_id: String,
    pub complaint_details: String,
    pub complaint_type: Option<ComplaintType>,
    pub submitter_role: Option<SubmitterRole>,
    pub photo_id: Option<Uuid>,
}
