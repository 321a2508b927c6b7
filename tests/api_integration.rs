use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use smartfarm_dash::Error;
use smartfarm_dash::api::{DashboardClient, EnvironmentMetric, OperationTotals, series};
use smartfarm_dash::storage::{
    ACCESS_TOKEN_KEY, DurableStore, EXPIRATION_TIME_KEY, MemoryStore,
};

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer farm-token")
}

async fn envir(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!([
        {"id": 1, "temperature": 20.5, "humidity": 61.0, "soil_humid": 35.0, "grow": 0, "created_at": "2023-06-01T09:00:00"},
        {"id": 2, "temperature": 22.0, "humidity": 58.0, "soil_humid": 34.0, "grow": 11.5, "created_at": "2023-06-01T10:00:00"}
    ])))
}

async fn machines(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!([
        {"device": "pump-1", "name": "north"},
        {"device": "pump 2", "name": "south"}
    ])))
}

async fn operation_log(
    headers: HeaderMap,
    Path(device): Path<String>,
) -> Result<String, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let body = match device.as_str() {
        "pump-1" => concat!(
            "2023-06-05 08:00:00,120 - {\"wtime1\": 4, \"wtime2\": 2, \"ctime\": 1}\n",
            "2023-06-06 08:00:00,120 - {\"wtime1\": 2, \"wtime2\": 0, \"ctime\": 0}\n",
        ),
        "pump 2" => "2023-06-05 12:00:00,000 - {\"wtime1\": \"6\", \"wtime2\": \"0\", \"ctime\": \"2\"}\n",
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(body.to_owned())
}

async fn spawn_api() -> String {
    let app = Router::new()
        .route("/envir", get(envir))
        .route("/machine", get(machines))
        .route("/manual/log/{device}", get(operation_log));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn storage_with_token(token: &str, expires: &str) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries([
        (ACCESS_TOKEN_KEY, token),
        (EXPIRATION_TIME_KEY, expires),
    ]))
}

#[tokio::test]
async fn test_environment_growth_series() {
    let base = spawn_api().await;
    let client =
        DashboardClient::new(&base, storage_with_token("farm-token", "2099-01-01T00:00:00Z"))
            .unwrap();

    let records = client.environment().await.unwrap();
    assert_eq!(records.len(), 2);

    let growth = series(&records, EnvironmentMetric::Growth);
    assert_eq!(growth.len(), 1);
    assert_eq!(growth[0].value, 11.5);

    let machines = client.machines().await.unwrap();
    assert_eq!(machines[0].device, "pump-1");
}

#[tokio::test]
async fn test_rejected_token_maps_to_api_error() {
    let base = spawn_api().await;
    let client =
        DashboardClient::new(&base, storage_with_token("stale", "2099-01-01T00:00:00Z")).unwrap();

    let err = client.environment().await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_expired_token_never_leaves_client() {
    let base = spawn_api().await;
    let storage = storage_with_token("farm-token", "2000-01-01T00:00:00Z");
    let client = DashboardClient::new(&base, storage.clone()).unwrap();

    assert!(matches!(
        client.environment().await,
        Err(Error::SessionExpired(_))
    ));
    // The stored identity is left for logout to clear.
    assert!(storage.get(ACCESS_TOKEN_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn test_operation_history_sums_every_machine() {
    let base = spawn_api().await;
    let client =
        DashboardClient::new(&base, storage_with_token("farm-token", "2099-01-01T00:00:00Z"))
            .unwrap();

    let history = client.operation_history(None).await.unwrap();
    let monday = "2023-06-05".parse().unwrap();
    assert_eq!(
        history.day(monday),
        OperationTotals {
            wtime1: 5.0,
            wtime2: 1.0,
            ctime: 1.5,
        }
    );

    let week = history.week(monday);
    assert_eq!(week.len(), 7);
    assert_eq!(week[0].totals, OperationTotals::default());
    assert_eq!(week[2].totals.wtime1, 1.0);
}

#[tokio::test]
async fn test_operation_history_single_device() {
    let base = spawn_api().await;
    let client =
        DashboardClient::new(&base, storage_with_token("farm-token", "2099-01-01T00:00:00Z"))
            .unwrap();

    let entries = client.operation_log("pump 2").await.unwrap();
    assert_eq!(entries.len(), 1);

    let history = client.operation_history(Some("pump-1")).await.unwrap();
    assert_eq!(history.day("2023-06-05".parse().unwrap()).wtime1, 2.0);

    let err = client.operation_log("pump-9").await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 404, .. }));
}
