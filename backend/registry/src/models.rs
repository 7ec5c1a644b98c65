//! Document shapes stored in the shared tree.
//!
//! Field names are camelCase to match what the portals already read.

use serde::{Deserialize, Serialize};

use crate::payout::{PayoutDestination, PayoutMode};
use crate::status::{ProjectStatus, WasteStatus};

/// A user-submitted waste batch (`WasteProjects/{ownerKey}/{wasteId}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRecord {
    pub waste_name: String,
    /// Declared weight in kg.
    #[serde(alias = "quantityKg")]
    pub waste_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_mark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default)]
    pub status: WasteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recycler_reported_weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_verified_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_entry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plantation_units: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planted_at: Option<i64>,
    /// Bumped on every payout claim, including re-claims after a failed payout.
    #[serde(default)]
    pub payout_attempts: u32,
    /// When the current payout claim was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<i64>,
    /// Submitted ledger transaction whose receipt has not been seen yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<PayoutDestination>,
    /// Set when the last payout attempt failed; allows the payout to be re-claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_mode: Option<PayoutMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_issued: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credited_at: Option<i64>,
    #[serde(default)]
    pub created_at: i64,
}

/// A tree-planting project (`Projects/{ownerKey}/{projectId}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantationProject {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub tree_type: String,
    #[serde(rename = "noTree")]
    pub tree_count: u32,
    /// Planted area in square metres.
    pub area: f64,
    pub tree_category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<PayoutDestination>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub before_images: Vec<String>,
    #[serde(default, rename = "bLocation", skip_serializing_if = "Option::is_none")]
    pub before_location: Option<String>,
    #[serde(default)]
    pub after_images: Vec<String>,
    #[serde(default, rename = "aLocation", skip_serializing_if = "Option::is_none")]
    pub after_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<i64>,
    #[serde(default)]
    pub payout_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tx: Option<String>,
    /// Set when the last payout attempt failed; allows the payout to be re-claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_mode: Option<PayoutMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_issued: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credited_at: Option<i64>,
    #[serde(default)]
    pub created_at: i64,
}

impl PlantationProject {
    /// At least three populated after-images.
    pub fn has_after_images(&self) -> bool {
        populated(&self.after_images) >= MIN_IMAGES
    }
}

/// Minimum number of before/after images a plantation must carry.
pub const MIN_IMAGES: usize = 3;

/// Count of non-blank image references.
pub fn populated(images: &[String]) -> usize {
    images.iter().filter(|i| !i.trim().is_empty()).count()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    #[default]
    #[serde(rename = "POOL_LOCKED")]
    Locked,
}

/// Immutable commitment of a verified waste batch (`PlantationPool/{entryId}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolAllocation {
    pub owner_key: String,
    pub waste_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub final_weight_kg: f64,
    pub plantation_units: f64,
    #[serde(default)]
    pub status: PoolStatus,
    pub created_at: i64,
}

/// Append-only payout ledger entry (`Transfers/{ownerKey}/{transferId}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub owner_key: String,
    pub credits: u64,
    pub payout_mode: PayoutMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_wallet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx: Option<String>,
    pub timestamp: i64,
}

// ─────────────────────────────────────────────────────────
// Marketplace and accounts
// ─────────────────────────────────────────────────────────

/// A contributor selling credits (`Sellers/{userId}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerListing {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Price per credit (INR).
    pub price: f64,
    pub min_qty: u32,
    pub max_qty: u32,
    pub updated_at: i64,
}

/// Contributor price listing (`Marketplace/{ownerKey}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketListing {
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Initiated,
}

/// A buy order against a seller (`Orders/{sellerId}/{orderId}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub seller_id: String,
    pub buyer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    pub qty: u32,
    pub price_per_credit: f64,
    pub total_amount: f64,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: i64,
}

/// Registered wallet user (`Users/{walletAddress}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// individual / ngo / community
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_proof: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}
