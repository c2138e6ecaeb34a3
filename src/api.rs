// 🌐 REST API (feature = "server")
// Thin axum handlers over the store. Every JSON endpoint answers with the
// same envelope: { "success": bool, "data": ..., "error": string|null }.

use crate::entities::{Account, Ledger, Participant, Payment, Role};
use crate::error::Error;
use crate::export::export_participants_csv;
use crate::money::Money;
use crate::pricing::Category;
use crate::reports::{self, AdminStats, FamilyOverview};
use crate::store::Store;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

// ============================================================================
// STATE & ENVELOPE
// ============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

/// Response wrapper used by every JSON endpoint.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            data,
            error: None,
        })
    }
}

/// Library error carrying its HTTP status; still rendered in the envelope.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ApiResponse {
            success: false,
            data: (),
            error: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// ROUTER
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/family", get(get_family))
        .route("/accounts/:id/ledger", get(get_ledger))
        .route("/accounts/:id/rebuild", get(get_rebuilt_ledger))
        .route("/accounts/:id/payments", get(get_payments))
        .route("/accounts/:id/members", post(add_member))
        .route("/participants/:id", patch(edit_member).delete(remove_member))
        .route("/payments", post(record_payment))
        .route("/payments/:id/reject", post(reject_payment))
        .route("/payments/:id", delete(delete_payment))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/families", get(admin_families))
        .route("/admin/participants", get(admin_participants))
        .route("/admin/notifications", get(get_notifications))
        .route("/admin/notifications/seen", post(mark_notifications_seen))
        .route("/admin/export", get(export_csv));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// HEALTH
// ============================================================================

async fn health() -> Json<ApiResponse<serde_json::Value>> {
    ApiResponse::ok(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

// ============================================================================
// ACCOUNTS
// ============================================================================

#[derive(Deserialize)]
struct CreateAccountRequest {
    name: String,
    email: Option<String>,
}

async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Account> {
    let account =
        state
            .store
            .create_account(&req.name, req.email.as_deref(), Role::FamilyLeader)?;
    Ok(ApiResponse::ok(account))
}

async fn list_accounts(State(state): State<AppState>) -> ApiResult<Vec<Account>> {
    Ok(ApiResponse::ok(state.store.accounts()?))
}

async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Account> {
    Ok(ApiResponse::ok(state.store.account(id)?))
}

async fn get_family(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Participant>> {
    state.store.account(id)?;
    Ok(ApiResponse::ok(state.store.participants(id)?))
}

async fn get_ledger(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Ledger> {
    Ok(ApiResponse::ok(state.store.ledger(id)?))
}

async fn get_rebuilt_ledger(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Ledger> {
    Ok(ApiResponse::ok(state.store.rebuild_ledger(id)?))
}

async fn get_payments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Payment>> {
    state.store.account(id)?;
    Ok(ApiResponse::ok(state.store.payments(id)?))
}

// ============================================================================
// PARTICIPANTS
// ============================================================================

#[derive(Deserialize)]
struct AddMemberRequest {
    name: String,
    category: String,
    age: i64,
    days: i64,
}

async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<Participant> {
    // parse through the pricing module so "adulto"/"Adult" fail the same way
    let category: Category = req.category.parse()?;
    let participant = state
        .store
        .add_participant(id, &req.name, category, req.age, req.days)?;
    Ok(ApiResponse::ok(participant))
}

#[derive(Deserialize)]
struct EditMemberRequest {
    name: Option<String>,
    age: Option<i64>,
}

async fn edit_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<EditMemberRequest>,
) -> ApiResult<Participant> {
    let participant = state
        .store
        .edit_participant(id, req.name.as_deref(), req.age)?;
    Ok(ApiResponse::ok(participant))
}

async fn remove_member(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.store.remove_participant(id)?;
    Ok(ApiResponse::ok(()))
}

// ============================================================================
// PAYMENTS
// ============================================================================

#[derive(Deserialize)]
struct RecordPaymentRequest {
    account_id: i64,
    amount_cents: i64,
    paid_on: NaiveDate,
    receipt_base64: Option<String>,
}

async fn record_payment(
    State(state): State<AppState>,
    Json(req): Json<RecordPaymentRequest>,
) -> ApiResult<Payment> {
    let receipt = match &req.receipt_base64 {
        Some(encoded) => Some(
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| Error::InvalidInput(format!("receipt is not valid base64: {e}")))?,
        ),
        None => None,
    };

    let payment = state.store.record_payment(
        req.account_id,
        Money::from_cents(req.amount_cents),
        req.paid_on,
        receipt,
    )?;
    Ok(ApiResponse::ok(payment))
}

async fn reject_payment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.store.reject_payment(id)?;
    Ok(ApiResponse::ok(()))
}

async fn delete_payment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.store.delete_payment(id)?;
    Ok(ApiResponse::ok(()))
}

// ============================================================================
// ADMIN
// ============================================================================

async fn admin_stats(State(state): State<AppState>) -> ApiResult<AdminStats> {
    Ok(ApiResponse::ok(reports::admin_stats(&state.store)?))
}

async fn admin_families(State(state): State<AppState>) -> ApiResult<Vec<FamilyOverview>> {
    Ok(ApiResponse::ok(reports::families_overview(&state.store)?))
}

/// Participant row joined with its family's money, the JSON face of the CSV
/// export.
#[derive(Serialize)]
struct AdminParticipantRow {
    #[serde(flatten)]
    participant: Participant,
    #[serde(rename = "family_total_cents")]
    family_total: Money,
    #[serde(rename = "family_paid_cents")]
    family_paid: Money,
    #[serde(rename = "family_balance_cents")]
    family_balance: Money,
    family_status: String,
}

async fn admin_participants(
    State(state): State<AppState>,
) -> ApiResult<Vec<AdminParticipantRow>> {
    let rows = reports::participants_with_ledgers(&state.store)?
        .into_iter()
        .map(|(participant, ledger)| AdminParticipantRow {
            participant,
            family_total: ledger.total,
            family_paid: ledger.paid,
            family_balance: ledger.balance,
            family_status: ledger.status.as_str().to_string(),
        })
        .collect();
    Ok(ApiResponse::ok(rows))
}

#[derive(Serialize)]
struct NotificationsResponse {
    count: usize,
    payments: Vec<Payment>,
}

async fn get_notifications(State(state): State<AppState>) -> ApiResult<NotificationsResponse> {
    let payments = state.store.unseen_payments()?;
    Ok(ApiResponse::ok(NotificationsResponse {
        count: payments.len(),
        payments,
    }))
}

async fn mark_notifications_seen(
    State(state): State<AppState>,
) -> ApiResult<serde_json::Value> {
    let marked = state.store.mark_payments_seen()?;
    Ok(ApiResponse::ok(serde_json::json!({ "marked": marked })))
}

async fn export_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut buf = Vec::new();
    export_participants_csv(&state.store, &mut buf)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"participants.csv\"",
            ),
        ],
        buf,
    )
        .into_response())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> (Arc<Store>, Router) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let app = build_router(AppState {
            store: store.clone(),
        });
        (store, app)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_answers_with_envelope() {
        let (_store, app) = test_app();

        let response = app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["error"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_registration_flow_end_to_end() {
        let (_store, app) = test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/accounts",
                r#"{"name":"Vera Calado","email":"vera@example.com"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let id = json["data"]["id"].as_i64().unwrap();
        assert_eq!(json["data"]["role"], "family-leader");

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/accounts/{id}/members"),
                r#"{"name":"Vera Calado","category":"adult","age":41,"days":4}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["price_cents"], 40_000);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/accounts/{id}/ledger")))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["total_cents"], 40_000);
        assert_eq!(json["data"]["status"], "pending");
    }

    #[tokio::test]
    async fn test_missing_account_maps_to_404() {
        let (_store, app) = test_app();

        let response = app.oneshot(get("/api/accounts/999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("account 999"));
    }

    #[tokio::test]
    async fn test_unknown_category_maps_to_400() {
        let (store, app) = test_app();
        let id = store
            .create_account("Vera", None, Role::FamilyLeader)
            .unwrap()
            .id;

        let response = app
            .oneshot(post_json(
                &format!("/api/accounts/{id}/members"),
                r#"{"name":"X","category":"grownup","age":30,"days":4}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_receipt_base64_maps_to_400() {
        let (store, app) = test_app();
        let id = store
            .create_account("Vera", None, Role::FamilyLeader)
            .unwrap()
            .id;

        let response = app
            .oneshot(post_json(
                "/api/payments",
                &format!(
                    r#"{{"account_id":{id},"amount_cents":10000,"paid_on":"2026-01-16","receipt_base64":"!!not base64!!"}}"#
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_payment_and_reject_via_api() {
        let (store, app) = test_app();
        let id = store
            .create_account("Vera", None, Role::FamilyLeader)
            .unwrap()
            .id;
        store
            .add_participant(id, "Vera", Category::Adult, 41, 4)
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/payments",
                &format!(
                    r#"{{"account_id":{id},"amount_cents":10000,"paid_on":"2026-01-16"}}"#
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let payment_id = json["data"]["id"].as_i64().unwrap();
        assert_eq!(json["data"]["status"], "validated");

        // reject twice: both succeed, ledger identical (idempotent)
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json(
                    &format!("/api/payments/{payment_id}/reject"),
                    "{}",
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let ledger = store.ledger(id).unwrap();
        assert_eq!(ledger.paid, Money::ZERO);
    }

    #[tokio::test]
    async fn test_notifications_flow() {
        let (store, app) = test_app();
        let id = store
            .create_account("Vera", None, Role::FamilyLeader)
            .unwrap()
            .id;
        store
            .record_payment(id, Money::from_units(50), "2026-01-16".parse().unwrap(), None)
            .unwrap();

        let response = app
            .clone()
            .oneshot(get("/api/admin/notifications"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["count"], 1);

        let response = app
            .clone()
            .oneshot(post_json("/api/admin/notifications/seen", "{}"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["marked"], 1);

        let response = app
            .oneshot(get("/api/admin/notifications"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["count"], 0);
    }

    #[tokio::test]
    async fn test_admin_export_is_csv() {
        let (store, app) = test_app();
        let id = store
            .create_account("Vera Calado", None, Role::FamilyLeader)
            .unwrap()
            .id;
        store
            .add_participant(id, "Vera Calado", Category::Adult, 41, 4)
            .unwrap();

        let response = app.oneshot(get("/api/admin/export")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("account_id,leader,name"));
        assert!(text.contains("Vera Calado"));
    }
}
