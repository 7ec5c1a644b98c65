//! Axum REST API handlers.
//!
//! Every status change is routed to [`Workflow`]; handlers only decode the
//! request, call one operation and encode the result. Errors map to HTTP
//! statuses through [`RegistryError`]'s `IntoResponse`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::accounts::{self, RegisterUser};
use crate::errors::RegistryError;
use crate::keys::owner_key;
use crate::marketplace::{self, ListingInput, OrderInput, SellerInput};
use crate::models::{
    MarketListing, Order, PlantationProject, PoolAllocation, SellerListing, TransferRecord,
    UserProfile, WasteRecord,
};
use crate::path::DocPath;
use crate::queries::{self, ProjectFilter, WasteFilter};
use crate::store::Versioned;
use crate::sweeper::{self, SweepReport};
use crate::workflow::{CreditOutcome, NewProject, NewWaste, Workflow};

type ApiResult<T> = Result<Json<T>, RegistryError>;

#[derive(Clone)]
pub struct ApiState {
    pub workflow: Arc<Workflow>,
}

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitWasteRequest {
    /// Email or wallet of the contributor.
    pub owner: String,
    #[serde(flatten)]
    pub waste: NewWaste,
}

#[derive(Debug, Deserialize)]
pub struct SubmitProjectRequest {
    pub owner: String,
    #[serde(flatten)]
    pub project: NewProject,
}

#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub buyer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightRequest {
    pub buyer_id: String,
    pub reported_weight_kg: f64,
}

#[derive(Debug, Deserialize)]
pub struct AfterImagesRequest {
    pub images: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub wallet_address: String,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

/// A stored document with its address and version.
#[derive(Debug, Serialize)]
pub struct DocumentResponse<T> {
    pub path: String,
    pub id: String,
    pub version: i64,
    #[serde(flatten)]
    pub record: T,
}

impl<T> From<Versioned<T>> for DocumentResponse<T> {
    fn from(doc: Versioned<T>) -> Self {
        Self {
            path: doc.path.to_string(),
            id: doc.path.id,
            version: doc.version,
            record: doc.value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub records: Vec<T>,
}

impl<T> ListResponse<DocumentResponse<T>> {
    fn from_docs(docs: Vec<Versioned<T>>) -> Self {
        let records: Vec<_> = docs.into_iter().map(DocumentResponse::from).collect();
        Self {
            count: records.len(),
            records,
        }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(records: Vec<T>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub path: String,
    pub owner_key: String,
    pub id: String,
}

impl From<DocPath> for CreatedResponse {
    fn from(path: DocPath) -> Self {
        Self {
            path: path.to_string(),
            owner_key: path.owner,
            id: path.id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    pub waste: WasteRecord,
    pub pool_entry: DocumentResponse<PoolAllocation>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

fn waste_path(owner: &str, id: &str) -> DocPath {
    DocPath::waste(&owner_key(owner), id)
}

fn project_path(owner: &str, id: &str) -> DocPath {
    DocPath::project(&owner_key(owner), id)
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Waste ────────────────────────────────────────────────

/// `POST /waste`
pub async fn submit_waste(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<SubmitWasteRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), RegistryError> {
    let path = state.workflow.submit_waste(&req.owner, req.waste).await?;
    Ok((StatusCode::CREATED, Json(path.into())))
}

/// `GET /waste?status&category&city&buyerId`
pub async fn list_waste(
    State(state): State<Arc<ApiState>>,
    Query(filter): Query<WasteFilter>,
) -> ApiResult<ListResponse<DocumentResponse<WasteRecord>>> {
    let records = queries::waste_records(state.workflow.store(), &filter).await?;
    Ok(Json(ListResponse::from_docs(records)))
}

/// `GET /waste/cities`
pub async fn list_cities(State(state): State<Arc<ApiState>>) -> ApiResult<ListResponse<String>> {
    let cities = queries::listable_cities(state.workflow.store()).await?;
    Ok(Json(cities.into()))
}

/// `GET /waste/:owner/:id`
pub async fn get_waste(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<DocumentResponse<WasteRecord>> {
    let record: Versioned<WasteRecord> = state
        .workflow
        .store()
        .require(&waste_path(&owner, &id))
        .await?;
    Ok(Json(record.into()))
}

/// `POST /waste/classify`
pub async fn classify_pending(State(state): State<Arc<ApiState>>) -> ApiResult<CountResponse> {
    let count = state.workflow.classify_pending().await?;
    Ok(Json(CountResponse { count }))
}

/// `POST /waste/:owner/:id/classify`
pub async fn classify_waste(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<WasteRecord> {
    let record = state
        .workflow
        .classify_waste(&waste_path(&owner, &id))
        .await?;
    Ok(Json(record))
}

/// `POST /waste/:owner/:id/approve`
pub async fn approve_waste(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<WasteRecord> {
    let record = state
        .workflow
        .approve_waste(&waste_path(&owner, &id), &req.actor)
        .await?;
    Ok(Json(record))
}

/// `POST /waste/:owner/:id/reject`
pub async fn reject_waste(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<WasteRecord> {
    let record = state
        .workflow
        .reject_waste(&waste_path(&owner, &id), &req.actor)
        .await?;
    Ok(Json(record))
}

/// `POST /waste/:owner/:id/reserve`
pub async fn reserve_waste(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(req): Json<ReserveRequest>,
) -> ApiResult<WasteRecord> {
    let record = state
        .workflow
        .reserve_waste(&waste_path(&owner, &id), &req.buyer_id)
        .await?;
    Ok(Json(record))
}

/// `POST /waste/:owner/:id/weight`
pub async fn verify_weight(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(req): Json<WeightRequest>,
) -> ApiResult<WasteRecord> {
    let record = state
        .workflow
        .verify_weight(
            &waste_path(&owner, &id),
            &req.buyer_id,
            req.reported_weight_kg,
        )
        .await?;
    Ok(Json(record))
}

/// `POST /waste/:owner/:id/allocate`
pub async fn allocate_to_pool(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<AllocationResponse> {
    let (waste, entry) = state
        .workflow
        .allocate_to_pool(&waste_path(&owner, &id))
        .await?;
    Ok(Json(AllocationResponse {
        waste,
        pool_entry: entry.into(),
    }))
}

/// `POST /waste/:owner/:id/execute`
pub async fn execute_plantation(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<CreditOutcome> {
    let outcome = state
        .workflow
        .execute_plantation(&waste_path(&owner, &id))
        .await?;
    Ok(Json(outcome))
}

/// `GET /pool`
pub async fn list_pool(
    State(state): State<Arc<ApiState>>,
) -> ApiResult<ListResponse<DocumentResponse<PoolAllocation>>> {
    let entries = queries::pool_entries(state.workflow.store()).await?;
    Ok(Json(ListResponse::from_docs(entries)))
}

// ── Plantation projects ──────────────────────────────────

/// `POST /projects`
pub async fn submit_project(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<SubmitProjectRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), RegistryError> {
    let path = state.workflow.submit_project(&req.owner, req.project).await?;
    Ok((StatusCode::CREATED, Json(path.into())))
}

/// `GET /projects?status&owner`
pub async fn list_projects(
    State(state): State<Arc<ApiState>>,
    Query(mut filter): Query<ProjectFilter>,
) -> ApiResult<ListResponse<DocumentResponse<PlantationProject>>> {
    filter.owner = filter.owner.as_deref().map(owner_key);
    let projects = queries::projects(state.workflow.store(), &filter).await?;
    Ok(Json(ListResponse::from_docs(projects)))
}

/// `GET /projects/:owner/:id`
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<DocumentResponse<PlantationProject>> {
    let project: Versioned<PlantationProject> = state
        .workflow
        .store()
        .require(&project_path(&owner, &id))
        .await?;
    Ok(Json(project.into()))
}

/// `POST /projects/promote`
pub async fn promote_projects(State(state): State<Arc<ApiState>>) -> ApiResult<CountResponse> {
    let count = state.workflow.promote_after_uploaded().await?;
    Ok(Json(CountResponse { count }))
}

/// `POST /projects/:owner/:id/after-images`
pub async fn upload_after_images(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(req): Json<AfterImagesRequest>,
) -> ApiResult<PlantationProject> {
    let project = state
        .workflow
        .upload_after_images(&project_path(&owner, &id), req.images, req.location)
        .await?;
    Ok(Json(project))
}

/// `POST /projects/:owner/:id/approve`
pub async fn approve_project(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<PlantationProject> {
    let project = state
        .workflow
        .approve_project(&project_path(&owner, &id), &req.actor)
        .await?;
    Ok(Json(project))
}

/// `POST /projects/:owner/:id/reject`
pub async fn reject_project(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<PlantationProject> {
    let project = state
        .workflow
        .reject_project(&project_path(&owner, &id), &req.actor)
        .await?;
    Ok(Json(project))
}

/// `POST /projects/:owner/:id/confirm`
pub async fn confirm_after_images(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<PlantationProject> {
    let project = state
        .workflow
        .confirm_after_images(&project_path(&owner, &id))
        .await?;
    Ok(Json(project))
}

/// `POST /projects/:owner/:id/verify`
pub async fn verify_plantation(
    State(state): State<Arc<ApiState>>,
    Path((owner, id)): Path<(String, String)>,
) -> ApiResult<CreditOutcome> {
    let outcome = state
        .workflow
        .verify_plantation(&project_path(&owner, &id))
        .await?;
    Ok(Json(outcome))
}

/// `POST /sweep`: run the scheduled transitions now.
pub async fn sweep(State(state): State<Arc<ApiState>>) -> ApiResult<SweepReport> {
    let report = sweeper::sweep_once(&state.workflow).await?;
    Ok(Json(report))
}

// ── Transfers ────────────────────────────────────────────

/// `GET /transfers/:owner`
pub async fn list_transfers(
    State(state): State<Arc<ApiState>>,
    Path(owner): Path<String>,
) -> ApiResult<ListResponse<DocumentResponse<TransferRecord>>> {
    let transfers = queries::transfers_for(state.workflow.store(), &owner_key(&owner)).await?;
    Ok(Json(ListResponse::from_docs(transfers)))
}

// ── Marketplace ──────────────────────────────────────────

/// `PUT /sellers/:user_id`
pub async fn publish_seller(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
    Json(req): Json<SellerInput>,
) -> ApiResult<SellerListing> {
    let listing = marketplace::publish_seller(state.workflow.store(), &user_id, req).await?;
    Ok(Json(listing))
}

/// `GET /sellers`
pub async fn list_sellers(
    State(state): State<Arc<ApiState>>,
) -> ApiResult<ListResponse<SellerListing>> {
    let sellers = marketplace::active_sellers(state.workflow.store()).await?;
    Ok(Json(sellers.into()))
}

/// `POST /orders/:seller_id`
pub async fn place_order(
    State(state): State<Arc<ApiState>>,
    Path(seller_id): Path<String>,
    Json(req): Json<OrderInput>,
) -> Result<(StatusCode, Json<DocumentResponse<Order>>), RegistryError> {
    let order = marketplace::place_order(state.workflow.store(), &seller_id, req).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// `GET /orders/:seller_id`
pub async fn list_orders(
    State(state): State<Arc<ApiState>>,
    Path(seller_id): Path<String>,
) -> ApiResult<ListResponse<DocumentResponse<Order>>> {
    let orders = marketplace::orders_for(state.workflow.store(), &seller_id).await?;
    Ok(Json(ListResponse::from_docs(orders)))
}

/// `PUT /marketplace/:owner`
pub async fn publish_listing(
    State(state): State<Arc<ApiState>>,
    Path(owner): Path<String>,
    Json(req): Json<ListingInput>,
) -> ApiResult<DocumentResponse<MarketListing>> {
    let listing = marketplace::publish_listing(state.workflow.store(), &owner, req).await?;
    Ok(Json(listing.into()))
}

/// `GET /marketplace`
pub async fn list_listings(
    State(state): State<Arc<ApiState>>,
) -> ApiResult<ListResponse<DocumentResponse<MarketListing>>> {
    let listings = marketplace::listings(state.workflow.store()).await?;
    Ok(Json(ListResponse::from_docs(listings)))
}

// ── Accounts ─────────────────────────────────────────────

/// `POST /users/register`
pub async fn register_user(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<RegisterUser>,
) -> Result<(StatusCode, Json<UserProfile>), RegistryError> {
    let profile = accounts::register_user(state.workflow.store(), req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `POST /users/login`
pub async fn login_user(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<UserProfile> {
    let profile = accounts::login_user(state.workflow.store(), &req.wallet_address).await?;
    Ok(Json(profile))
}
