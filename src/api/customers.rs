//! Client directory routes, mounted under `/api/customers`.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::{
    health_body, http_layers, json_body, path_id, route_not_found, ApiError, ApiResponse,
};
use crate::config::{Environment, ServiceConfig};
use crate::directory::CustomerDirectory;
use crate::entities::{Customer, CustomerUpdate, NewCustomer};
use crate::error::DirectoryError;
use crate::validation;

#[derive(Clone)]
pub struct DirectoryState {
    directory: CustomerDirectory,
    environment: Environment,
}

impl DirectoryState {
    fn fail(&self, err: DirectoryError) -> ApiError {
        ApiError::from_directory(err, self.environment)
    }
}

/// GET /api/customers
async fn list_customers(
    State(state): State<DirectoryState>,
) -> Result<Json<ApiResponse<Vec<Customer>>>, ApiError> {
    let customers = state.directory.list().map_err(|e| state.fail(e))?;
    Ok(Json(ApiResponse::list(customers)))
}

/// GET /api/customers/:id - Consumed by the credit service's verification
async fn get_customer(
    State(state): State<DirectoryState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<Customer>>, ApiError> {
    let id = path_id(path, "id")?;
    let customer = state.directory.get(id).map_err(|e| state.fail(e))?;
    Ok(Json(ApiResponse::ok(customer)))
}

/// POST /api/customers
async fn create_customer(
    State(state): State<DirectoryState>,
    body: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let new = json_body(body)?.normalized();
    validation::new_customer(&new).map_err(ApiError::validation)?;

    let customer = state.directory.register(new).map_err(|e| state.fail(e))?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(customer).with_message("customer created successfully")),
    ))
}

/// PUT /api/customers/:id
async fn update_customer(
    State(state): State<DirectoryState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CustomerUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<Customer>>, ApiError> {
    let id = path_id(path, "id")?;
    let update = json_body(body)?.normalized();
    validation::customer_update(&update).map_err(ApiError::validation)?;

    let customer = state
        .directory
        .update(id, &update)
        .map_err(|e| state.fail(e))?;
    Ok(Json(
        ApiResponse::ok(customer).with_message("customer updated successfully"),
    ))
}

/// DELETE /api/customers/:id
async fn delete_customer(
    State(state): State<DirectoryState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = path_id(path, "id")?;
    state.directory.remove(id).map_err(|e| state.fail(e))?;
    Ok(Json(ApiResponse::message("customer removed successfully")))
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    health_body("client directory")
}

/// Build the client directory router.
pub fn directory_app(directory: CustomerDirectory, config: &ServiceConfig) -> Router {
    let state = DirectoryState {
        directory,
        environment: config.environment,
    };

    let customer_routes = Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/customers", customer_routes)
        .fallback(route_not_found)
        .layer(http_layers(&config.cors_origin))
}
