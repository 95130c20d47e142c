//! Search interaction handler.
//!
//! Implements the FHIR [search interaction](https://hl7.org/fhir/http.html#search):
//! - `GET [base]/[type]?params` - Type-level search
//! - `GET [base]/[type]/_search?params` - Type-level search
//! - `POST [base]/[type]/_search` - Type-level search with a form body
//!
//! All three collect their key/value pairs in order, repeated keys included,
//! and hand them to the same dispatch path.

use axum::{
    Form, Json,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helios_dispatch::RawParameterSet;
use tracing::debug;

use crate::error::RestResult;
use crate::responses::bundle::searchset_bundle;
use crate::state::AppState;

/// Handler for GET search.
///
/// # HTTP Request
///
/// `GET [base]/[type]?params` or `GET [base]/[type]/_search?params`
///
/// # Response
///
/// Returns a Bundle of type "searchset".
pub async fn search_get_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> RestResult<Response> {
    let Query(params) = query?;
    debug!(
        resource_type = %resource_type,
        params = ?params,
        "Processing search GET request"
    );

    execute_search(&state, resource_type, params).await
}

/// Handler for POST search.
///
/// # HTTP Request
///
/// `POST [base]/[type]/_search` with an `application/x-www-form-urlencoded`
/// body. Any other body is rejected with a 400 OperationOutcome.
pub async fn search_post_handler(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> RestResult<Response> {
    let Form(params) = form?;
    debug!(
        resource_type = %resource_type,
        params = ?params,
        "Processing search POST request"
    );

    execute_search(&state, resource_type, params).await
}

/// Dispatches a search and renders the result as a searchset Bundle.
///
/// Handlers are synchronous and may block, so dispatch runs on the
/// blocking pool.
async fn execute_search(
    state: &AppState,
    resource_type: String,
    params: Vec<(String, String)>,
) -> RestResult<Response> {
    let raw = RawParameterSet::from_pairs(params.iter().cloned());
    let dispatcher = state.dispatcher_arc();

    let (resource_type, result) = tokio::task::spawn_blocking(move || {
        let result = dispatcher.dispatch(&resource_type, &raw);
        (resource_type, result)
    })
    .await?;
    let result = result?;

    debug!(
        resource_type = %resource_type,
        total = result.len(),
        "Search completed"
    );

    let bundle = searchset_bundle(result, state.base_url(), &resource_type, &params);
    Ok((StatusCode::OK, Json(bundle)).into_response())
}
