use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use energy_client::domain::EnergyRecord;
use serde::Deserialize;
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::sinks::{TableStore, TimeRange};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct RecordsParams {
    site_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteParams {
    site_id: Option<String>,
}

/// Read-only routes over the records the pipeline writes.
pub fn router(table: Arc<dyn TableStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fetchrecords", get(fetch_records))
        .route("/fetchanomalies", get(fetch_anomalies))
        .route("/fetchall", get(fetch_all))
        .with_state(table)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("missing query parameter '{name}'"))),
    }
}

fn parse_instant(value: &str, name: &str) -> Result<OffsetDateTime, ApiError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map_err(|e| ApiError::BadRequest(format!("invalid {name} '{value}': {e}")))
}

async fn fetch_records(
    State(table): State<Arc<dyn TableStore>>,
    Query(params): Query<RecordsParams>,
) -> Result<Json<Vec<EnergyRecord>>, ApiError> {
    let site_id = required(params.site_id, "site_id")?;
    let start = parse_instant(&required(params.start_date, "start_date")?, "start_date")?;
    let end = parse_instant(&required(params.end_date, "end_date")?, "end_date")?;
    if start > end {
        return Err(ApiError::BadRequest("start_date is after end_date".to_string()));
    }

    let records = table
        .query(&site_id, Some(TimeRange { start, end }))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(records))
}

async fn fetch_anomalies(
    State(table): State<Arc<dyn TableStore>>,
    Query(params): Query<SiteParams>,
) -> Result<Json<Vec<EnergyRecord>>, ApiError> {
    let site_id = required(params.site_id, "site_id")?;

    let records = table
        .query_anomalies(&site_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(records))
}

async fn fetch_all(State(table): State<Arc<dyn TableStore>>) -> Result<Json<Vec<EnergyRecord>>, ApiError> {
    let records = table
        .scan()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemoryTableStore;
    use axum::{body::Body, http::Request};
    use time::macros::datetime;
    use tower::ServiceExt;

    async fn seeded() -> Arc<dyn TableStore> {
        let store = MemoryTableStore::new();
        let rows = [
            ("site1", datetime!(2025-02-17 04:10:43 UTC), 10.0, false),
            ("site1", datetime!(2025-02-17 04:15:43 UTC), -1.0, true),
            ("site1", datetime!(2025-02-17 04:30:43 UTC), 3.0, false),
            ("site2", datetime!(2025-02-17 04:15:43 UTC), 4.0, false),
        ];
        for (site, ts, generated, anomaly) in rows {
            store
                .put_item(&EnergyRecord {
                    site_id: site.to_string(),
                    timestamp: ts,
                    energy_generated_kwh: generated,
                    energy_consumed_kwh: 1.0,
                    net_energy_kwh: generated - 1.0,
                    anomaly,
                })
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let (status, body) = get_json(router(seeded().await), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn fetch_records_honours_range() {
        let uri = "/fetchrecords?site_id=site1&start_date=2025-02-17T04:10:43Z&end_date=2025-02-17T04:20:43Z";
        let (status, body) = get_json(router(seeded().await), uri).await;
        assert_eq!(status, StatusCode::OK);

        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["timestamp"], "2025-02-17T04:10:43Z");
        assert_eq!(rows[1]["anomaly"], true);
    }

    #[tokio::test]
    async fn fetch_records_requires_parameters() {
        let (status, body) = get_json(router(seeded().await), "/fetchrecords?site_id=site1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("start_date"));
    }

    #[tokio::test]
    async fn fetch_anomalies_returns_only_flagged_rows() {
        let (status, body) = get_json(router(seeded().await), "/fetchanomalies?site_id=site1").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["energy_generated_kwh"], -1.0);
    }

    #[tokio::test]
    async fn fetch_all_scans_every_site() {
        let (status, body) = get_json(router(seeded().await), "/fetchall").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 4);
    }
}
