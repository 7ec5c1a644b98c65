//! The transition service.
//!
//! Every status change of a waste batch or plantation project goes through
//! [`Workflow`]. A transition reads the record with its version, checks the
//! move against the transition table in [`crate::status`], and writes back
//! only if nobody else wrote in between. The loser of a race gets
//! [`RegistryError::Conflict`] and the record is left as the winner wrote it.
//!
//! Credit issuance is split into three writes:
//!
//! 1. **claim**: `POOL_ALLOCATED → PLANTED` (waste) or
//!    `AFTER_UPLOADED → PLANTATION_VERIFIED` (plantation). Only the actor
//!    whose claim lands may pay out.
//! 2. **payout**: bank payouts are recorded as-is; chain payouts call
//!    `registerProject`, store the returned hash as `pendingTx`, then wait
//!    for its receipt. A failed payout is written back as `payoutError`,
//!    which lets a later call re-claim the record. A re-claim with
//!    `pendingTx` set only polls that receipt; a new `registerProject` is
//!    sent only after a `failed` receipt.
//! 3. **credit**: `→ CREDITED` stamping `creditsIssued`/`blockchainTx`,
//!    followed by an append to `Transfers/{ownerKey}`.
//!
//! A claim that is neither credited nor released (the process died mid
//! payout) can be taken over once it is older than the claim timeout.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::credits::{self, CategoryFactors};
use crate::errors::{RegistryError, Result};
use crate::keys::owner_key;
use crate::ledger::{LedgerClient, ProjectType, RegisterProject, TxOutcome};
use crate::models::{
    populated, PlantationProject, PoolAllocation, PoolStatus, TransferRecord, WasteRecord,
    MIN_IMAGES,
};
use crate::path::{Collection, DocPath};
use crate::payout::{PayoutDestination, PayoutMode};
use crate::status::{ProjectEvent, ProjectStatus, WasteEvent, WasteStatus};
use crate::store::{now_millis, Store, Versioned};

// ─────────────────────────────────────────────────────────
// Inputs and outputs
// ─────────────────────────────────────────────────────────

/// A contributor's waste submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWaste {
    pub waste_name: String,
    #[serde(alias = "quantityKg")]
    pub waste_weight: f64,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub land_mark: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    /// UPI id or wallet address.
    #[serde(default, alias = "userWallet")]
    pub payout: Option<String>,
}

/// A contributor's plantation registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub region: Option<String>,
    pub tree_type: String,
    #[serde(alias = "noTree")]
    pub tree_count: u32,
    pub area: f64,
    #[serde(default)]
    pub tree_category: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    /// UPI id or wallet address.
    #[serde(default, alias = "upiMetamask")]
    pub payout: Option<String>,
    #[serde(default)]
    pub before_images: Vec<String>,
    #[serde(default, alias = "bLocation")]
    pub before_location: Option<String>,
}

/// Result of a completed credit issuance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditOutcome {
    pub path: DocPath,
    pub credits: u64,
    pub payout_mode: PayoutMode,
    pub blockchain_tx: Option<String>,
    pub transfer: DocPath,
}

const DEFAULT_TREE_CATEGORY: &str = "Sapling";

/// Age after which an unreleased payout claim may be taken over.
const DEFAULT_CLAIM_TIMEOUT: Duration = Duration::from_secs(30 * 60);

// ─────────────────────────────────────────────────────────
// Settlement (claim → payout → credit), shared by both record types
// ─────────────────────────────────────────────────────────

trait Settle: Serialize + DeserializeOwned + Clone {
    /// Record is in the claimed intermediate state.
    fn is_claimed(&self) -> bool;
    /// Move into the claimed state.
    fn claim(&mut self, now: i64) -> Result<()>;
    fn payout_error_mut(&mut self) -> &mut Option<String>;
    fn payout_attempts_mut(&mut self) -> &mut u32;
    fn claimed_at_mut(&mut self) -> &mut Option<i64>;
    fn pending_tx_mut(&mut self) -> &mut Option<String>;
    fn already_credited(&self) -> bool;
    fn credit(&mut self, credits: u64, mode: PayoutMode, tx: Option<String>, now: i64)
        -> Result<()>;
    fn status_name(&self) -> &'static str;
}

impl Settle for WasteRecord {
    fn is_claimed(&self) -> bool {
        self.status == WasteStatus::Planted
    }

    fn claim(&mut self, now: i64) -> Result<()> {
        self.status = self.status.apply(WasteEvent::Plant)?;
        self.planted_at = Some(now);
        Ok(())
    }

    fn payout_error_mut(&mut self) -> &mut Option<String> {
        &mut self.payout_error
    }

    fn payout_attempts_mut(&mut self) -> &mut u32 {
        &mut self.payout_attempts
    }

    fn claimed_at_mut(&mut self) -> &mut Option<i64> {
        &mut self.claimed_at
    }

    fn pending_tx_mut(&mut self) -> &mut Option<String> {
        &mut self.pending_tx
    }

    fn already_credited(&self) -> bool {
        self.credits_issued.is_some() || self.blockchain_tx.is_some()
    }

    fn credit(
        &mut self,
        credits: u64,
        mode: PayoutMode,
        tx: Option<String>,
        now: i64,
    ) -> Result<()> {
        self.status = self.status.apply(WasteEvent::Credit)?;
        self.credits_issued = Some(credits);
        self.payout_mode = Some(mode);
        self.blockchain_tx = tx;
        self.pending_tx = None;
        self.payout_error = None;
        self.credited_at = Some(now);
        Ok(())
    }

    fn status_name(&self) -> &'static str {
        self.status.as_str()
    }
}

impl Settle for PlantationProject {
    fn is_claimed(&self) -> bool {
        self.status == ProjectStatus::PlantationVerified
    }

    fn claim(&mut self, now: i64) -> Result<()> {
        self.status = self.status.apply(ProjectEvent::Verify)?;
        self.verified_at = Some(now);
        Ok(())
    }

    fn payout_error_mut(&mut self) -> &mut Option<String> {
        &mut self.payout_error
    }

    fn payout_attempts_mut(&mut self) -> &mut u32 {
        &mut self.payout_attempts
    }

    fn claimed_at_mut(&mut self) -> &mut Option<i64> {
        &mut self.claimed_at
    }

    fn pending_tx_mut(&mut self) -> &mut Option<String> {
        &mut self.pending_tx
    }

    fn already_credited(&self) -> bool {
        self.credits_issued.is_some() || self.blockchain_tx.is_some()
    }

    fn credit(
        &mut self,
        credits: u64,
        mode: PayoutMode,
        tx: Option<String>,
        now: i64,
    ) -> Result<()> {
        self.status = self.status.apply(ProjectEvent::Credit)?;
        self.credits_issued = Some(credits);
        self.payout_mode = Some(mode);
        self.blockchain_tx = tx;
        self.pending_tx = None;
        self.payout_error = None;
        self.credited_at = Some(now);
        Ok(())
    }

    fn status_name(&self) -> &'static str {
        self.status.as_str()
    }
}

/// What a settlement links its transfer record to.
enum TransferLink {
    Waste(String),
    Project(String),
}

// ─────────────────────────────────────────────────────────
// Workflow
// ─────────────────────────────────────────────────────────

pub struct Workflow {
    store: Store,
    ledger: Option<LedgerClient>,
    factors: CategoryFactors,
    claim_timeout: Duration,
}

impl Workflow {
    pub fn new(store: Store, ledger: Option<LedgerClient>, factors: CategoryFactors) -> Self {
        Self {
            store,
            ledger,
            factors,
            claim_timeout: DEFAULT_CLAIM_TIMEOUT,
        }
    }

    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Read, mutate and conditionally write back one record.
    async fn transition<T, F>(&self, path: &DocPath, apply: F) -> Result<Versioned<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<()>,
    {
        let mut current: Versioned<T> = self.store.require(path).await?;
        apply(&mut current.value)?;
        current.version = self
            .store
            .replace(path, current.version, &current.value)
            .await?;
        Ok(current)
    }

    // ─────────────────────────────────────────────────────
    // Waste: intake and review
    // ─────────────────────────────────────────────────────

    /// Create a `SUBMITTED` waste record under the submitter's owner key.
    pub async fn submit_waste(&self, owner: &str, input: NewWaste) -> Result<DocPath> {
        let waste_name = input.waste_name.trim().to_string();
        if waste_name.is_empty() {
            return Err(RegistryError::Validation("Waste name is required".to_string()));
        }
        if !input.waste_weight.is_finite() || input.waste_weight <= 0.0 {
            return Err(RegistryError::Validation(
                "Declared weight must be a positive number of kg".to_string(),
            ));
        }
        let payout = PayoutDestination::parse_optional(input.payout.as_deref())?;

        let record = WasteRecord {
            waste_name,
            waste_weight: input.waste_weight,
            photo: input.photo,
            city: input.city,
            state: input.state,
            land_mark: input.land_mark,
            pincode: input.pincode,
            status: WasteStatus::Submitted,
            payout,
            created_at: now_millis(),
            ..Default::default()
        };

        let path = self
            .store
            .push(Collection::WasteProjects, &owner_key(owner), &record)
            .await?;
        info!("Waste submitted at {path}");
        Ok(path)
    }

    /// `SUBMITTED → AI_VERIFIED`, stamping the keyword classification.
    pub async fn classify_waste(&self, path: &DocPath) -> Result<WasteRecord> {
        let updated = self
            .transition(path, |w: &mut WasteRecord| {
                w.status = w.status.apply(WasteEvent::Classify)?;
                let category = credits::classify_waste(&w.waste_name);
                w.ai_category = Some(category.as_str().to_string());
                Ok(())
            })
            .await?;
        info!(
            "{path} -> {} ({})",
            updated.value.status,
            updated.value.ai_category.as_deref().unwrap_or_default()
        );
        Ok(updated.value)
    }

    /// Classify every waste record still waiting in `SUBMITTED`.
    ///
    /// Records another actor moved first are skipped. Returns how many were
    /// classified by this call.
    pub async fn classify_pending(&self) -> Result<usize> {
        let records: Vec<Versioned<WasteRecord>> =
            self.store.collection(Collection::WasteProjects).await?;
        let mut classified = 0;
        for record in records
            .into_iter()
            .filter(|r| r.value.status == WasteStatus::Submitted)
        {
            match self.classify_waste(&record.path).await {
                Ok(_) => classified += 1,
                Err(RegistryError::Conflict(p)) => warn!("Skipped {p}: changed concurrently"),
                Err(RegistryError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(classified)
    }

    pub async fn approve_waste(&self, path: &DocPath, admin: &str) -> Result<WasteRecord> {
        let updated = self
            .transition(path, |w: &mut WasteRecord| {
                w.status = w.status.apply(WasteEvent::Approve)?;
                w.approved_by = Some(admin.to_string());
                w.approved_at = Some(now_millis());
                Ok(())
            })
            .await?;
        info!("{path} -> {} by {admin}", updated.value.status);
        Ok(updated.value)
    }

    pub async fn reject_waste(&self, path: &DocPath, admin: &str) -> Result<WasteRecord> {
        let updated = self
            .transition(path, |w: &mut WasteRecord| {
                w.status = w.status.apply(WasteEvent::Reject)?;
                w.rejected_by = Some(admin.to_string());
                w.rejected_at = Some(now_millis());
                Ok(())
            })
            .await?;
        info!("{path} -> {} by {admin}", updated.value.status);
        Ok(updated.value)
    }

    // ─────────────────────────────────────────────────────
    // Waste: buyer / recycler
    // ─────────────────────────────────────────────────────

    pub async fn reserve_waste(&self, path: &DocPath, buyer_id: &str) -> Result<WasteRecord> {
        let buyer_id = buyer_id.trim();
        if buyer_id.is_empty() {
            return Err(RegistryError::Validation("Buyer id is required".to_string()));
        }
        let updated = self
            .transition(path, |w: &mut WasteRecord| {
                w.status = w.status.apply(WasteEvent::Reserve)?;
                w.buyer_id = Some(buyer_id.to_string());
                w.reserved_at = Some(now_millis());
                Ok(())
            })
            .await?;
        info!("{path} -> {} for {buyer_id}", updated.value.status);
        Ok(updated.value)
    }

    /// Record the recycler's measured weight; the settled weight is capped at
    /// the declared weight.
    pub async fn verify_weight(
        &self,
        path: &DocPath,
        buyer_id: &str,
        reported_kg: f64,
    ) -> Result<WasteRecord> {
        if !reported_kg.is_finite() || reported_kg <= 0.0 {
            return Err(RegistryError::Validation(
                "Enter valid received weight".to_string(),
            ));
        }
        let updated = self
            .transition(path, |w: &mut WasteRecord| {
                w.status = w.status.apply(WasteEvent::VerifyWeight)?;
                if w.buyer_id.as_deref() != Some(buyer_id) {
                    return Err(RegistryError::Precondition(format!(
                        "{path} is not reserved by {buyer_id}"
                    )));
                }
                w.recycler_reported_weight_kg = Some(reported_kg);
                w.final_weight_kg = Some(credits::cap_weight(w.waste_weight, reported_kg));
                w.weight_verified_at = Some(now_millis());
                Ok(())
            })
            .await?;
        info!(
            "{path} -> {} (declared {} kg, reported {reported_kg} kg, final {:?} kg)",
            updated.value.status, updated.value.waste_weight, updated.value.final_weight_kg
        );
        Ok(updated.value)
    }

    // ─────────────────────────────────────────────────────
    // Waste: pool allocation and execution
    // ─────────────────────────────────────────────────────

    /// `WEIGHT_VERIFIED → POOL_ALLOCATED` plus the immutable pool entry,
    /// written together.
    pub async fn allocate_to_pool(
        &self,
        path: &DocPath,
    ) -> Result<(WasteRecord, Versioned<PoolAllocation>)> {
        let mut current: Versioned<WasteRecord> = self.store.require(path).await?;
        let waste = &mut current.value;
        waste.status = waste.status.apply(WasteEvent::Allocate)?;
        let final_kg = waste
            .final_weight_kg
            .ok_or_else(|| RegistryError::Precondition(format!("{path} has no final weight")))?;
        let units = credits::plantation_units(&self.factors, waste.ai_category.as_deref(), final_kg);
        let entry_id = self.store.new_key();
        waste.plantation_units = Some(units);
        waste.pool_entry_id = Some(entry_id.clone());

        let allocation = PoolAllocation {
            owner_key: path.owner.clone(),
            waste_id: path.id.clone(),
            category: waste.ai_category.clone(),
            final_weight_kg: final_kg,
            plantation_units: units,
            status: PoolStatus::Locked,
            created_at: now_millis(),
        };
        let pool_path = DocPath::flat(Collection::PlantationPool, entry_id);
        self.store
            .replace_and_create(path, current.version, &current.value, &pool_path, &allocation)
            .await?;

        info!(
            "{path} -> {} ({units} plantation units at {pool_path})",
            current.value.status
        );
        Ok((
            current.value,
            Versioned {
                path: pool_path,
                version: 1,
                value: allocation,
            },
        ))
    }

    /// Complete the plantation for a pooled waste batch and issue its credits.
    pub async fn execute_plantation(&self, path: &DocPath) -> Result<CreditOutcome> {
        let snapshot: Versioned<WasteRecord> = self.store.require(path).await?;
        let waste = &snapshot.value;
        if waste.already_credited() {
            return Err(RegistryError::AlreadyCredited(path.to_string()));
        }

        let (final_kg, category) = match (waste.final_weight_kg, waste.ai_category.as_deref()) {
            (Some(kg), Some(category)) if kg > 0.0 => (kg, category),
            _ => {
                return Err(RegistryError::Precondition(
                    "Final weight or category missing".to_string(),
                ))
            }
        };
        let credits = credits::waste_credits(&self.factors, Some(category), final_kg);
        if credits == 0 {
            return Err(RegistryError::Precondition(
                "Credits calculated as zero".to_string(),
            ));
        }
        let entry = waste
            .pool_entry_id
            .as_ref()
            .map(|id| DocPath::flat(Collection::PlantationPool, id.clone()));
        let pooled = match &entry {
            Some(entry) => self.store.get::<PoolAllocation>(entry).await?.is_some(),
            None => false,
        };
        if !pooled {
            return Err(RegistryError::Precondition(format!(
                "{path} has no plantation pool entry"
            )));
        }

        let data_hash = json!({
            "wasteId": path.id,
            "finalWeightKg": final_kg,
            "category": category,
            "timestamp": now_millis(),
        })
        .to_string();

        self.settle(
            path,
            snapshot.clone(),
            snapshot.value.payout.clone(),
            credits,
            ProjectType::Waste,
            data_hash,
            TransferLink::Waste(path.id.clone()),
        )
        .await
    }

    // ─────────────────────────────────────────────────────
    // Plantation projects
    // ─────────────────────────────────────────────────────

    /// Register a plantation in `waiting_for_after_images`.
    pub async fn submit_project(&self, owner: &str, input: NewProject) -> Result<DocPath> {
        if populated(&input.before_images) < MIN_IMAGES {
            return Err(RegistryError::Precondition(
                "Upload at least 3 before images.".to_string(),
            ));
        }
        let tree_type = input.tree_type.trim().to_string();
        if tree_type.is_empty()
            || input.tree_count == 0
            || !input.area.is_finite()
            || input.area <= 0.0
        {
            return Err(RegistryError::Validation(
                "Tree type, tree count and area are required".to_string(),
            ));
        }
        let payout = PayoutDestination::parse_optional(input.payout.as_deref())?;

        let project = PlantationProject {
            user_name: input.user_name,
            email: input.email,
            region: input.region,
            tree_type,
            tree_count: input.tree_count,
            area: input.area,
            tree_category: input
                .tree_category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TREE_CATEGORY.to_string()),
            description: input.description,
            org_name: input.org_name,
            org_id: input.org_id,
            payout,
            status: ProjectStatus::WaitingForAfterImages,
            before_images: input.before_images,
            before_location: input.before_location,
            created_at: now_millis(),
            ..Default::default()
        };

        let path = self
            .store
            .push(Collection::Projects, &owner_key(owner), &project)
            .await?;
        info!("Plantation registered at {path}");
        Ok(path)
    }

    /// Attach after-images and hand the project to admin review (`pending`).
    pub async fn upload_after_images(
        &self,
        path: &DocPath,
        images: Vec<String>,
        location: Option<String>,
    ) -> Result<PlantationProject> {
        if populated(&images) < MIN_IMAGES {
            return Err(RegistryError::Precondition(
                "Please upload at least 3 after images.".to_string(),
            ));
        }
        let updated = self
            .transition(path, |p: &mut PlantationProject| {
                p.status = p.status.apply(ProjectEvent::UploadAfterImages)?;
                p.after_images = images;
                p.after_location = location;
                Ok(())
            })
            .await?;
        info!("{path} -> {}", updated.value.status);
        Ok(updated.value)
    }

    pub async fn approve_project(&self, path: &DocPath, admin: &str) -> Result<PlantationProject> {
        self.review_project(path, admin, ProjectEvent::Approve).await
    }

    pub async fn reject_project(&self, path: &DocPath, admin: &str) -> Result<PlantationProject> {
        self.review_project(path, admin, ProjectEvent::Reject).await
    }

    async fn review_project(
        &self,
        path: &DocPath,
        admin: &str,
        event: ProjectEvent,
    ) -> Result<PlantationProject> {
        let updated = self
            .transition(path, |p: &mut PlantationProject| {
                p.status = p.status.apply(event)?;
                p.reviewed_by = Some(admin.to_string());
                p.reviewed_at = Some(now_millis());
                Ok(())
            })
            .await?;
        info!("{path} -> {} by {admin}", updated.value.status);
        Ok(updated.value)
    }

    /// `Approved → AFTER_UPLOADED` once three after-images are present.
    pub async fn confirm_after_images(&self, path: &DocPath) -> Result<PlantationProject> {
        let updated = self
            .transition(path, |p: &mut PlantationProject| {
                p.status = p.status.apply(ProjectEvent::ConfirmAfterImages)?;
                if !p.has_after_images() {
                    return Err(RegistryError::Precondition(format!(
                        "{path} needs at least 3 after images"
                    )));
                }
                Ok(())
            })
            .await?;
        info!("{path} -> {}", updated.value.status);
        Ok(updated.value)
    }

    /// Promote every approved project whose after-images are complete.
    pub async fn promote_after_uploaded(&self) -> Result<usize> {
        let approved: Vec<Versioned<PlantationProject>> = self
            .store
            .with_status(Collection::Projects, ProjectStatus::Approved.as_str())
            .await?;
        let mut promoted = 0;
        for project in approved.into_iter().filter(|p| p.value.has_after_images()) {
            match self.confirm_after_images(&project.path).await {
                Ok(_) => promoted += 1,
                Err(RegistryError::Conflict(p)) => warn!("Skipped {p}: changed concurrently"),
                Err(RegistryError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(promoted)
    }

    /// Verify a planted project and issue one credit per tree.
    pub async fn verify_plantation(&self, path: &DocPath) -> Result<CreditOutcome> {
        let snapshot: Versioned<PlantationProject> = self.store.require(path).await?;
        let project = &snapshot.value;
        if project.already_credited() {
            return Err(RegistryError::AlreadyCredited(path.to_string()));
        }
        if project.tree_count == 0 || project.payout.is_none() {
            return Err(RegistryError::Precondition(
                "Missing tree count or payout details".to_string(),
            ));
        }
        let credits = credits::tree_credits(project.tree_count);

        let data_hash = json!({
            "projectId": path.id,
            "treeType": project.tree_type,
            "treeCategory": project.tree_category,
            "noTree": project.tree_count,
            "area": project.area,
            "region": project.region,
            "verifiedAt": now_millis(),
        })
        .to_string();

        self.settle(
            path,
            snapshot.clone(),
            snapshot.value.payout.clone(),
            credits,
            ProjectType::Plantation,
            data_hash,
            TransferLink::Project(path.id.clone()),
        )
        .await
    }

    // ─────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    async fn settle<T: Settle>(
        &self,
        path: &DocPath,
        snapshot: Versioned<T>,
        payout: Option<PayoutDestination>,
        credits: u64,
        project_type: ProjectType,
        data_hash: String,
        link: TransferLink,
    ) -> Result<CreditOutcome> {
        let payout = payout.ok_or_else(|| {
            RegistryError::Precondition("No payout destination on record".to_string())
        })?;
        if matches!(payout, PayoutDestination::Chain { .. }) && self.ledger.is_none() {
            return Err(RegistryError::Precondition(
                "Chain payouts are disabled: no ledger gateway configured".to_string(),
            ));
        }

        // 1. Claim.
        let mut claimed = snapshot;
        let now = now_millis();
        if claimed.value.is_claimed() && claimed.value.payout_error_mut().is_none() {
            let stale = claimed
                .value
                .claimed_at_mut()
                .map_or(true, |at| now - at >= self.claim_timeout_millis());
            if !stale {
                return Err(RegistryError::Conflict(format!(
                    "{path} (payout already in progress)"
                )));
            }
            warn!("Taking over abandoned payout claim on {path}");
        } else if !claimed.value.is_claimed() {
            claimed.value.claim(now)?;
        }
        *claimed.value.payout_error_mut() = None;
        *claimed.value.payout_attempts_mut() += 1;
        *claimed.value.claimed_at_mut() = Some(now);
        claimed.version = self
            .store
            .replace(path, claimed.version, &claimed.value)
            .await?;
        info!("{path} -> {} (payout claimed)", claimed.value.status_name());

        // 2. Payout.
        let blockchain_tx = match &payout {
            PayoutDestination::Bank { .. } => None,
            PayoutDestination::Chain { address } => {
                let request = RegisterProject {
                    owner: address.clone(),
                    data_hash,
                    credits,
                    project_type,
                };
                match self.pay_on_chain(path, &mut claimed, &request).await {
                    Ok(hash) => Some(hash),
                    Err(e) => {
                        self.release_claim(path, claimed, &e).await;
                        return Err(e);
                    }
                }
            }
        };

        // 3. Credit.
        let mut credited = claimed.clone();
        credited.value.credit(
            credits,
            payout.mode(),
            blockchain_tx.clone(),
            now_millis(),
        )?;
        if let Err(e) = self
            .store
            .replace(path, credited.version, &credited.value)
            .await
        {
            // `claimed` still carries the confirmed hash as `pendingTx`.
            self.release_claim(path, claimed, &e).await;
            return Err(e);
        }
        info!("{path} -> {} ({credits} credits)", credited.value.status_name());

        let now = now_millis();
        let (upi_id, user_wallet) = match &payout {
            PayoutDestination::Bank { upi_id } => (Some(upi_id.clone()), None),
            PayoutDestination::Chain { address } => (None, Some(address.clone())),
        };
        let (waste_id, project_id) = match link {
            TransferLink::Waste(id) => (Some(id), None),
            TransferLink::Project(id) => (None, Some(id)),
        };
        let transfer = TransferRecord {
            transaction_id: now.to_string(),
            waste_id,
            project_id,
            owner_key: path.owner.clone(),
            credits,
            payout_mode: payout.mode(),
            upi_id,
            user_wallet,
            blockchain_tx: blockchain_tx.clone(),
            timestamp: now,
        };
        let transfer_path = self
            .store
            .push(Collection::Transfers, &path.owner, &transfer)
            .await
            .inspect_err(|e| error!("{path} credited but transfer append failed: {e}"))?;

        Ok(CreditOutcome {
            path: path.clone(),
            credits,
            payout_mode: payout.mode(),
            blockchain_tx,
            transfer: transfer_path,
        })
    }

    fn claim_timeout_millis(&self) -> i64 {
        i64::try_from(self.claim_timeout.as_millis()).unwrap_or(i64::MAX)
    }

    /// Issue credits on chain for a claimed record and return the confirmed
    /// transaction hash.
    ///
    /// The submitted hash is persisted as `pendingTx` before its receipt is
    /// polled, so a later re-claim polls the same transaction instead of
    /// registering the project again.
    async fn pay_on_chain<T: Settle>(
        &self,
        path: &DocPath,
        claimed: &mut Versioned<T>,
        request: &RegisterProject,
    ) -> Result<String> {
        let ledger = self.ledger.as_ref().ok_or_else(|| {
            RegistryError::Precondition("No ledger gateway configured".to_string())
        })?;

        if let Some(hash) = claimed.value.pending_tx_mut().clone() {
            match ledger.await_receipt(&hash).await? {
                TxOutcome::Confirmed => return Ok(hash),
                TxOutcome::Reverted => {
                    warn!("{path}: earlier transaction {hash} reverted, submitting again");
                    *claimed.value.pending_tx_mut() = None;
                }
            }
        }

        let hash = ledger.submit_project(request).await?;
        *claimed.value.pending_tx_mut() = Some(hash.clone());
        claimed.version = self
            .store
            .replace(path, claimed.version, &claimed.value)
            .await
            .inspect_err(|e| error!("{path}: could not record pending transaction {hash}: {e}"))?;

        match ledger.await_receipt(&hash).await? {
            TxOutcome::Confirmed => Ok(hash),
            TxOutcome::Reverted => {
                *claimed.value.pending_tx_mut() = None;
                Err(RegistryError::Ledger(format!("Transaction {hash} reverted")))
            }
        }
    }

    /// Record a failed payout so the claim can be taken again.
    async fn release_claim<T: Settle>(
        &self,
        path: &DocPath,
        mut claimed: Versioned<T>,
        cause: &RegistryError,
    ) {
        warn!("Payout for {path} failed: {cause}");
        *claimed.value.payout_error_mut() = Some(cause.to_string());
        if let Err(e) = self
            .store
            .replace(path, claimed.version, &claimed.value)
            .await
        {
            error!("Could not release payout claim on {path}: {e}");
        }
    }
}
