//! Wallet-keyed user registration and login.

use serde::Deserialize;
use tracing::info;

use crate::errors::{RegistryError, Result};
use crate::models::UserProfile;
use crate::path::{Collection, DocPath};
use crate::store::{Store, Versioned};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub wallet_address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub land_proof: Option<String>,
}

fn user_path(wallet: &str) -> Result<DocPath> {
    let wallet = wallet.trim();
    if wallet.is_empty() {
        return Err(RegistryError::Validation(
            "Wallet address is required".to_string(),
        ));
    }
    Ok(DocPath::flat(Collection::Users, wallet))
}

pub async fn register_user(store: &Store, input: RegisterUser) -> Result<UserProfile> {
    let path = user_path(&input.wallet_address)?;
    let profile = UserProfile {
        wallet_address: path.id.clone(),
        name: input.name,
        phone: input.phone,
        role: input.role,
        age: input.age,
        land_proof: input.land_proof,
        projects: Vec::new(),
    };
    store.create(&path, &profile).await.map_err(|e| match e {
        RegistryError::Conflict(_) => {
            RegistryError::Conflict(format!("User {} already registered", path.id))
        }
        other => other,
    })?;
    info!("Registered user {}", path.id);
    Ok(profile)
}

pub async fn login_user(store: &Store, wallet: &str) -> Result<UserProfile> {
    let path = user_path(wallet)?;
    let user: Versioned<UserProfile> = store.require(&path).await?;
    Ok(user.value)
}
