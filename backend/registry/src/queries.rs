//! Read-side filters over document snapshots.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::errors::Result;
use crate::models::{PlantationProject, PoolAllocation, TransferRecord, WasteRecord};
use crate::path::Collection;
use crate::status::{ProjectStatus, WasteStatus};
use crate::store::{Store, Versioned};

/// Query-string filter for waste listings. Every field is optional and
/// matched exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub buyer_id: Option<String>,
}

impl WasteFilter {
    pub fn matches(&self, record: &WasteRecord) -> bool {
        self.status
            .as_deref()
            .map_or(true, |s| record.status.as_str() == s)
            && self
                .category
                .as_deref()
                .map_or(true, |c| record.ai_category.as_deref() == Some(c))
            && self
                .city
                .as_deref()
                .map_or(true, |c| record.city.as_deref() == Some(c))
            && self
                .buyer_id
                .as_deref()
                .map_or(true, |b| record.buyer_id.as_deref() == Some(b))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub status: Option<String>,
    /// Owner key, already encoded.
    pub owner: Option<String>,
}

pub async fn waste_records(
    store: &Store,
    filter: &WasteFilter,
) -> Result<Vec<Versioned<WasteRecord>>> {
    // A known status narrows the scan in SQL; anything else filters in memory.
    let records: Vec<Versioned<WasteRecord>> = match filter
        .status
        .as_deref()
        .and_then(WasteStatus::from_name)
    {
        Some(status) => {
            store
                .with_status(Collection::WasteProjects, status.as_str())
                .await?
        }
        None => store.collection(Collection::WasteProjects).await?,
    };
    Ok(records
        .into_iter()
        .filter(|r| filter.matches(&r.value))
        .collect())
}

/// Distinct cities that currently have waste open for reservation.
pub async fn listable_cities(store: &Store) -> Result<Vec<String>> {
    let approved: Vec<Versioned<WasteRecord>> = store
        .with_status(Collection::WasteProjects, WasteStatus::Approved.as_str())
        .await?;
    let cities: BTreeSet<String> = approved
        .into_iter()
        .filter_map(|r| r.value.city)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    Ok(cities.into_iter().collect())
}

pub async fn projects(
    store: &Store,
    filter: &ProjectFilter,
) -> Result<Vec<Versioned<PlantationProject>>> {
    let records: Vec<Versioned<PlantationProject>> = match (
        filter.owner.as_deref(),
        filter.status.as_deref().and_then(ProjectStatus::from_name),
    ) {
        (Some(owner), _) => store.children(Collection::Projects, owner).await?,
        (None, Some(status)) => {
            store
                .with_status(Collection::Projects, status.as_str())
                .await?
        }
        (None, None) => store.collection(Collection::Projects).await?,
    };
    let status = filter.status.as_deref();
    Ok(records
        .into_iter()
        .filter(|r| status.map_or(true, |s| r.value.status.as_str() == s))
        .collect())
}

/// Transfers of one owner, newest first.
pub async fn transfers_for(store: &Store, owner: &str) -> Result<Vec<Versioned<TransferRecord>>> {
    let mut transfers: Vec<Versioned<TransferRecord>> =
        store.children(Collection::Transfers, owner).await?;
    transfers.sort_by(|a, b| {
        b.value
            .timestamp
            .cmp(&a.value.timestamp)
            .then_with(|| b.path.id.cmp(&a.path.id))
    });
    Ok(transfers)
}

pub async fn pool_entries(store: &Store) -> Result<Vec<Versioned<PoolAllocation>>> {
    store.collection(Collection::PlantationPool).await
}
