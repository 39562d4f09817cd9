//! Credit service routes, mounted under `/api/credits`.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::{
    health_body, http_layers, json_body, path_id, route_not_found, ApiError, ApiResponse,
};
use crate::config::{Environment, ServiceConfig};
use crate::entities::{CreditApplication, CustomerSnapshot};
use crate::error::CreditError;
use crate::lifecycle::{CreditLifecycle, CreditRequest};
use crate::validation;

/// Shared application state
#[derive(Clone)]
pub struct CreditState {
    lifecycle: CreditLifecycle,
    environment: Environment,
}

impl CreditState {
    fn fail(&self, err: CreditError) -> ApiError {
        ApiError::from_credit(err, self.environment)
    }

    /// Attach customer display fields to each application.
    ///
    /// One directory lookup per distinct customer, run concurrently. A
    /// customer that cannot be resolved leaves the fields empty.
    async fn with_customers(&self, credits: Vec<CreditApplication>) -> Vec<CreditView> {
        let customer_ids: BTreeSet<i64> = credits.iter().map(|c| c.customer_id).collect();
        let lookups = customer_ids.into_iter().map(|id| async move {
            (id, self.lifecycle.lookup_customer(id).await)
        });
        let customers: HashMap<i64, CustomerSnapshot> = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(id, snapshot)| snapshot.map(|s| (id, s)))
            .collect();

        credits
            .into_iter()
            .map(|credit| {
                let customer = customers.get(&credit.customer_id);
                CreditView {
                    customer_name: customer.map(CustomerSnapshot::full_name),
                    identity_number: customer.map(|c| c.identity_number.clone()),
                    credit,
                }
            })
            .collect()
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCreditBody {
    pub customer_id: i64,
    pub requested_amount: Decimal,
    pub term_months: i64,
    pub interest_rate: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Application joined with its customer's display fields.
#[derive(Debug, Serialize)]
pub struct CreditView {
    #[serde(flatten)]
    pub credit: CreditApplication,
    pub customer_name: Option<String>,
    pub identity_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub id: i64,
    pub name: String,
    pub identity_number: String,
}

impl From<&CustomerSnapshot> for CustomerSummary {
    fn from(snapshot: &CustomerSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.full_name(),
            identity_number: snapshot.identity_number.clone(),
        }
    }
}

/// Freshly created application plus the customer it was verified against.
#[derive(Debug, Serialize)]
pub struct CreatedView {
    #[serde(flatten)]
    pub credit: CreditApplication,
    pub customer: CustomerSummary,
}

#[derive(Debug, Serialize)]
pub struct CustomerCreditsResponse {
    success: bool,
    customer: CustomerSummary,
    count: usize,
    data: Vec<CreditApplication>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/credits - All applications, newest first
async fn list_credits(
    State(state): State<CreditState>,
) -> Result<Json<ApiResponse<Vec<CreditView>>>, ApiError> {
    let credits = state.lifecycle.list_all().map_err(|e| state.fail(e))?;
    let views = state.with_customers(credits).await;
    Ok(Json(ApiResponse::list(views)))
}

/// GET /api/credits/:id
async fn get_credit(
    State(state): State<CreditState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<CreditView>>, ApiError> {
    let id = path_id(path, "id")?;
    let credit = state.lifecycle.get(id).map_err(|e| state.fail(e))?;

    let view = state
        .with_customers(vec![credit])
        .await
        .pop()
        .ok_or_else(|| ApiError::not_found(format!("credit application {} not found", id)))?;
    Ok(Json(ApiResponse::ok(view)))
}

/// GET /api/credits/customer/:customer_id - Verify the customer, then list
async fn list_customer_credits(
    State(state): State<CreditState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<CustomerCreditsResponse>, ApiError> {
    let customer_id = path_id(path, "customer_id")?;

    let customer = match state.lifecycle.verify_customer(customer_id).await {
        Ok(customer) => customer,
        Err(CreditError::UnknownCustomer(id)) => {
            return Err(ApiError::not_found(format!("customer {} not found", id)));
        }
        Err(e) => return Err(state.fail(e)),
    };

    let credits = state
        .lifecycle
        .list_by_customer(customer_id)
        .map_err(|e| state.fail(e))?;

    Ok(Json(CustomerCreditsResponse {
        success: true,
        customer: CustomerSummary::from(&customer),
        count: credits.len(),
        data: credits,
    }))
}

/// POST /api/credits - Create a pending application
async fn create_credit(
    State(state): State<CreditState>,
    body: Result<Json<CreateCreditBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(body)?;
    validation::positive_id("customer_id", body.customer_id).map_err(ApiError::bad_request)?;
    validation::interest_rate(body.interest_rate).map_err(ApiError::bad_request)?;

    let created = state
        .lifecycle
        .create(CreditRequest {
            customer_id: body.customer_id,
            requested_amount: body.requested_amount,
            term_months: body.term_months,
            interest_rate: body.interest_rate,
        })
        .await
        .map_err(|e| state.fail(e))?;

    let view = CreatedView {
        customer: CustomerSummary::from(&created.customer),
        credit: created.credit,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(view).with_message("credit application created successfully")),
    ))
}

/// PUT /api/credits/:id/approve
async fn approve_credit(
    State(state): State<CreditState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<CreditApplication>>, ApiError> {
    let id = path_id(path, "id")?;
    let credit = state.lifecycle.approve(id).map_err(|e| state.fail(e))?;
    Ok(Json(
        ApiResponse::ok(credit).with_message("credit application approved successfully"),
    ))
}

/// PUT /api/credits/:id/reject - Body: { "reason": "..." }
async fn reject_credit(
    State(state): State<CreditState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<RejectBody>, JsonRejection>,
) -> Result<Json<ApiResponse<CreditApplication>>, ApiError> {
    let id = path_id(path, "id")?;
    let body = match body {
        // a bare PUT carries no reason at all
        Err(JsonRejection::MissingJsonContentType(_)) => RejectBody::default(),
        body => json_body(body)?,
    };
    let reason = body.reason.unwrap_or_default();
    validation::rejection_reason(&reason).map_err(ApiError::bad_request)?;

    let credit = state
        .lifecycle
        .reject(id, &reason)
        .map_err(|e| state.fail(e))?;
    Ok(Json(ApiResponse::ok(credit).with_message("credit application rejected")))
}

/// DELETE /api/credits/:id - Only while pending
async fn delete_credit(
    State(state): State<CreditState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = path_id(path, "id")?;
    state.lifecycle.delete(id).map_err(|e| state.fail(e))?;
    Ok(Json(ApiResponse::message("credit application removed successfully")))
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    health_body("credit service")
}

// ============================================================================
// Router
// ============================================================================

/// Build the credit service router.
pub fn credit_app(lifecycle: CreditLifecycle, config: &ServiceConfig) -> Router {
    let state = CreditState {
        lifecycle,
        environment: config.environment,
    };

    let credit_routes = Router::new()
        .route("/", get(list_credits).post(create_credit))
        .route("/customer/:customer_id", get(list_customer_credits))
        .route("/:id", get(get_credit).delete(delete_credit))
        .route("/:id/approve", put(approve_credit))
        .route("/:id/reject", put(reject_credit))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/credits", credit_routes)
        .fallback(route_not_found)
        .layer(http_layers(&config.cors_origin))
}
