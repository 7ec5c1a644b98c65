//! Credit marketplace: seller listings, buy orders and contributor prices.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::errors::{RegistryError, Result};
use crate::keys::owner_key;
use crate::models::{MarketListing, Order, OrderStatus, SellerListing};
use crate::path::{Collection, DocPath};
use crate::store::{now_millis, Store, Versioned};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerInput {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub price: f64,
    pub min_qty: u32,
    pub max_qty: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    pub buyer_id: String,
    #[serde(default)]
    pub buyer_email: Option<String>,
    pub qty: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingInput {
    pub price: f64,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

fn seller_path(user_id: &str) -> DocPath {
    DocPath::flat(Collection::Sellers, user_id)
}

/// Publish (or overwrite) a seller's offer.
pub async fn publish_seller(
    store: &Store,
    user_id: &str,
    input: SellerInput,
) -> Result<SellerListing> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(RegistryError::Validation("User id is required".to_string()));
    }
    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(RegistryError::Validation(
            "Price must be greater than zero".to_string(),
        ));
    }
    if input.min_qty == 0 || input.min_qty > input.max_qty {
        return Err(RegistryError::Validation(
            "Quantities must satisfy 1 <= minQty <= maxQty".to_string(),
        ));
    }

    let listing = SellerListing {
        user_id: user_id.to_string(),
        email: input.email,
        full_name: input.full_name,
        price: input.price,
        min_qty: input.min_qty,
        max_qty: input.max_qty,
        updated_at: now_millis(),
    };
    store.set(&seller_path(user_id), &listing).await?;
    info!("Seller {user_id} listed at {} per credit", listing.price);
    Ok(listing)
}

/// Sellers with a positive price.
pub async fn active_sellers(store: &Store) -> Result<Vec<SellerListing>> {
    let sellers: Vec<Versioned<SellerListing>> = store.collection(Collection::Sellers).await?;
    Ok(sellers
        .into_iter()
        .map(|s| s.value)
        .filter(|s| s.price > 0.0)
        .collect())
}

/// Place a buy order against a seller at the seller's current price.
pub async fn place_order(
    store: &Store,
    seller_id: &str,
    input: OrderInput,
) -> Result<Versioned<Order>> {
    let seller: Versioned<SellerListing> = store.require(&seller_path(seller_id)).await?;
    let seller = seller.value;

    let buyer_id = input.buyer_id.trim();
    if buyer_id.is_empty() {
        return Err(RegistryError::Validation("Buyer id is required".to_string()));
    }
    if input.qty < seller.min_qty || input.qty > seller.max_qty {
        return Err(RegistryError::Validation(format!(
            "Quantity must be between {} and {}",
            seller.min_qty, seller.max_qty
        )));
    }

    let order_id = store.new_key();
    let order = Order {
        order_id: order_id.clone(),
        seller_id: seller_id.to_string(),
        buyer_id: buyer_id.to_string(),
        buyer_email: input.buyer_email,
        qty: input.qty,
        price_per_credit: seller.price,
        total_amount: seller.price * f64::from(input.qty),
        status: OrderStatus::Initiated,
        created_at: now_millis(),
    };
    let path = DocPath::nested(Collection::Orders, seller_id, order_id);
    store.create(&path, &order).await?;
    info!(
        "Order {path}: {} credits for {} from {buyer_id}",
        order.qty, order.total_amount
    );

    Ok(Versioned {
        path,
        version: 1,
        value: order,
    })
}

pub async fn orders_for(store: &Store, seller_id: &str) -> Result<Vec<Versioned<Order>>> {
    store.children(Collection::Orders, seller_id).await
}

/// Set a contributor's credit price.
pub async fn publish_listing(
    store: &Store,
    owner: &str,
    input: ListingInput,
) -> Result<Versioned<MarketListing>> {
    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(RegistryError::Validation(
            "Price must be greater than zero".to_string(),
        ));
    }
    let listing = MarketListing {
        price: input.price,
        wallet_address: input.wallet_address.filter(|w| !w.trim().is_empty()),
    };
    let path = DocPath::flat(Collection::Marketplace, owner_key(owner));

    // Existing listings are patched so fields written elsewhere survive.
    let version = if store.get::<MarketListing>(&path).await?.is_some() {
        let mut fields = Map::new();
        fields.insert("price".to_string(), json!(listing.price));
        fields.insert(
            "walletAddress".to_string(),
            listing.wallet_address.clone().map_or(Value::Null, Value::String),
        );
        store.update(&path, fields).await?
    } else {
        store.set(&path, &listing).await?
    };
    Ok(Versioned {
        path,
        version,
        value: listing,
    })
}

pub async fn listings(store: &Store) -> Result<Vec<Versioned<MarketListing>>> {
    store.collection(Collection::Marketplace).await
}
