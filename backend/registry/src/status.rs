//! # Status state machines
//!
//! Both record types follow a strict forward-only lifecycle. Each has one
//! authoritative transition table (`state × event → next state`); anything
//! not listed in it is rejected.
//!
//! Waste batches:
//!
//! ```text
//! SUBMITTED ─classify─► AI_VERIFIED ─approve─► APPROVED ─reserve─► RESERVED
//!                           └─reject─► REJECTED
//! RESERVED ─verify_weight─► WEIGHT_VERIFIED ─allocate─► POOL_ALLOCATED
//! POOL_ALLOCATED ─plant─► PLANTED ─credit─► CREDITED
//! ```
//!
//! Plantation projects:
//!
//! ```text
//! waiting_for_after_images ─upload_after_images─► pending
//! pending ─approve─► Approved ─confirm_after_images─► AFTER_UPLOADED
//!    └─reject─► Rejected
//! AFTER_UPLOADED ─verify─► PLANTATION_VERIFIED ─credit─► CREDITED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{RegistryError, Result};

/// Lifecycle status of a waste batch. A record without a status is `Submitted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteStatus {
    #[default]
    Submitted,
    AiVerified,
    Approved,
    Rejected,
    Reserved,
    WeightVerified,
    PoolAllocated,
    Planted,
    Credited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasteEvent {
    Classify,
    Approve,
    Reject,
    Reserve,
    VerifyWeight,
    Allocate,
    Plant,
    Credit,
}

impl WasteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::AiVerified => "AI_VERIFIED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Reserved => "RESERVED",
            Self::WeightVerified => "WEIGHT_VERIFIED",
            Self::PoolAllocated => "POOL_ALLOCATED",
            Self::Planted => "PLANTED",
            Self::Credited => "CREDITED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "SUBMITTED" => Self::Submitted,
            "AI_VERIFIED" => Self::AiVerified,
            "APPROVED" => Self::Approved,
            "REJECTED" => Self::Rejected,
            "RESERVED" => Self::Reserved,
            "WEIGHT_VERIFIED" => Self::WeightVerified,
            "POOL_ALLOCATED" => Self::PoolAllocated,
            "PLANTED" => Self::Planted,
            "CREDITED" => Self::Credited,
            _ => return None,
        })
    }

    /// The transition table.
    pub fn apply(self, event: WasteEvent) -> Result<Self> {
        use WasteEvent as E;
        let next = match (self, event) {
            (Self::Submitted, E::Classify) => Self::AiVerified,
            (Self::AiVerified, E::Approve) => Self::Approved,
            (Self::AiVerified, E::Reject) => Self::Rejected,
            (Self::Approved, E::Reserve) => Self::Reserved,
            (Self::Reserved, E::VerifyWeight) => Self::WeightVerified,
            (Self::WeightVerified, E::Allocate) => Self::PoolAllocated,
            (Self::PoolAllocated, E::Plant) => Self::Planted,
            (Self::Planted, E::Credit) => Self::Credited,
            (from, event) => {
                return Err(RegistryError::InvalidTransition {
                    from: from.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }
}

impl fmt::Display for WasteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WasteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classify => "classify",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Reserve => "reserve",
            Self::VerifyWeight => "verify_weight",
            Self::Allocate => "allocate",
            Self::Plant => "plant",
            Self::Credit => "credit",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a plantation project.
///
/// The stored spellings are mixed-case because the contributor portal and
/// the admin portal each introduced their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    #[serde(rename = "waiting_for_after_images")]
    WaitingForAfterImages,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Rejected")]
    Rejected,
    #[serde(rename = "AFTER_UPLOADED")]
    AfterUploaded,
    #[serde(rename = "PLANTATION_VERIFIED")]
    PlantationVerified,
    #[serde(rename = "CREDITED")]
    Credited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectEvent {
    UploadAfterImages,
    Approve,
    Reject,
    ConfirmAfterImages,
    Verify,
    Credit,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForAfterImages => "waiting_for_after_images",
            Self::Pending => "pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::AfterUploaded => "AFTER_UPLOADED",
            Self::PlantationVerified => "PLANTATION_VERIFIED",
            Self::Credited => "CREDITED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "waiting_for_after_images" => Self::WaitingForAfterImages,
            "pending" => Self::Pending,
            "Approved" => Self::Approved,
            "Rejected" => Self::Rejected,
            "AFTER_UPLOADED" => Self::AfterUploaded,
            "PLANTATION_VERIFIED" => Self::PlantationVerified,
            "CREDITED" => Self::Credited,
            _ => return None,
        })
    }

    /// The transition table.
    pub fn apply(self, event: ProjectEvent) -> Result<Self> {
        use ProjectEvent as E;
        let next = match (self, event) {
            (Self::WaitingForAfterImages, E::UploadAfterImages) => Self::Pending,
            (Self::Pending, E::Approve) => Self::Approved,
            (Self::Pending, E::Reject) => Self::Rejected,
            (Self::Approved, E::ConfirmAfterImages) => Self::AfterUploaded,
            (Self::AfterUploaded, E::Verify) => Self::PlantationVerified,
            (Self::PlantationVerified, E::Credit) => Self::Credited,
            (from, event) => {
                return Err(RegistryError::InvalidTransition {
                    from: from.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProjectEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UploadAfterImages => "upload_after_images",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::ConfirmAfterImages => "confirm_after_images",
            Self::Verify => "verify",
            Self::Credit => "credit",
        };
        f.write_str(name)
    }
}
