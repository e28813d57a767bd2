use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tower_http::cors::{Any, CorsLayer};

use crate::error::AppResult;
use crate::records::{build_records, OutputRecord};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TmyQuery {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TmyResponse {
    pub meta: Map<String, JsonValue>,
    pub tz: String,
    pub records: Vec<OutputRecord>,
}

pub(crate) async fn get_tmy(
    State(state): State<AppState>,
    Query(query): Query<TmyQuery>,
) -> AppResult<Json<TmyResponse>> {
    let dataset = state.pvgis.fetch_tmy(query.lat, query.lon).await?;
    let zone = state
        .timezones
        .resolve(query.lat, query.lon, &dataset.meta);
    let records = build_records(&dataset.rows, &zone);
    let tz = zone.identifier();

    tracing::info!(
        lat = query.lat,
        lon = query.lon,
        tz = %tz,
        records = records.len(),
        "served TMY records"
    );

    Ok(Json(TmyResponse {
        meta: dataset.meta,
        tz,
        records,
    }))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tmy", get(get_tmy))
        .layer(cors)
        .with_state(state)
}
