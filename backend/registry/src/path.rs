//! Addresses inside the shared document tree.
//!
//! ```text
//! WasteProjects/{ownerKey}/{wasteId}
//! Projects/{ownerKey}/{projectId}
//! PlantationPool/{entryId}
//! Transfers/{ownerKey}/{transferId}
//! Users/{userId}   Sellers/{userId}   Marketplace/{ownerKey}
//! Orders/{sellerId}/{orderId}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level collections of the document tree. Names are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    WasteProjects,
    Projects,
    PlantationPool,
    Transfers,
    Users,
    Sellers,
    Marketplace,
    Orders,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WasteProjects => "WasteProjects",
            Self::Projects => "Projects",
            Self::PlantationPool => "PlantationPool",
            Self::Transfers => "Transfers",
            Self::Users => "Users",
            Self::Sellers => "Sellers",
            Self::Marketplace => "Marketplace",
            Self::Orders => "Orders",
        }
    }

    /// Whether records live one level below an owner key.
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            Self::WasteProjects | Self::Projects | Self::Transfers | Self::Orders
        )
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full path of one document. `owner` is empty for two-level collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocPath {
    pub collection: Collection,
    pub owner: String,
    pub id: String,
}

impl DocPath {
    pub fn nested(collection: Collection, owner: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection,
            owner: owner.into(),
            id: id.into(),
        }
    }

    pub fn flat(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            owner: String::new(),
            id: id.into(),
        }
    }

    pub fn waste(owner: &str, id: &str) -> Self {
        Self::nested(Collection::WasteProjects, owner, id)
    }

    pub fn project(owner: &str, id: &str) -> Self {
        Self::nested(Collection::Projects, owner, id)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.owner.is_empty() {
            write!(f, "{}/{}", self.collection, self.id)
        } else {
            write!(f, "{}/{}/{}", self.collection, self.owner, self.id)
        }
    }
}
