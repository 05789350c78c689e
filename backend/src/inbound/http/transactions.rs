//! Transaction verification endpoint.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::TransactionStatus;
use crate::domain::ports::VerifyTransactionRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_transaction_kind, parse_tx_hash};

/// Request body for `POST /transactions/verify`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTransactionBody {
    #[schema(example = "97264395BD65A255A429B11326C84128B7D70FFED7949ABAE3036D506BA38621")]
    pub tx_hash: String,
    /// `tip` or `quiz_reward`.
    #[serde(rename = "type")]
    #[schema(example = "quiz_reward")]
    pub kind: String,
    /// `{"postId": ...}` for tips, `{"questionId": ...}` for reward claims.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

/// Successful verification.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTransactionResponseBody {
    pub success: bool,
    pub status: TransactionStatus,
}

/// Confirm an on-chain transaction and credit it exactly once.
///
/// Repeating a call for a hash this user already confirmed returns the same
/// success body.
#[utoipa::path(
    post,
    path = "/transactions/verify",
    request_body = VerifyTransactionBody,
    responses(
        (status = 200, description = "Transaction confirmed", body = VerifyTransactionResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 409, description = "Hash or claim already used", body = ErrorSchema),
        (status = 422, description = "Transaction rejected", body = ErrorSchema),
        (status = 429, description = "Cooldown active", body = ErrorSchema),
        (status = 503, description = "Chain indexer or store unavailable", body = ErrorSchema)
    ),
    tags = ["transactions"],
    operation_id = "verifyTransaction",
    security(("BearerSession" = []))
)]
#[post("/transactions/verify")]
pub async fn verify_transaction(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<VerifyTransactionBody>,
) -> ApiResult<web::Json<VerifyTransactionResponseBody>> {
    let VerifyTransactionBody {
        tx_hash,
        kind,
        metadata,
    } = payload.into_inner();
    let request = VerifyTransactionRequest {
        user_id: session.user_id(),
        tx_hash: parse_tx_hash(tx_hash, FieldName::new("txHash"))?,
        kind: parse_transaction_kind(&kind, FieldName::new("type"))?,
        metadata,
    };

    let response = state.transactions.verify(request).await?;
    if response.replayed {
        info!(user_id = %session.user_id(), "idempotent transaction re-verification");
    }
    Ok(web::Json(VerifyTransactionResponseBody {
        success: true,
        status: response.status,
    }))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{MockTransactionVerification, VerifyTransactionResponse};
    use crate::domain::{Error, HostProfile, HostUserId, TransactionKind, User};
    use crate::inbound::http::test_utils::{TestPorts, session_tokens, test_clock};
    use actix_web::http::StatusCode;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    async fn call(transactions: MockTransactionVerification, body: Value) -> (StatusCode, Value) {
        let clock = test_clock();
        let tokens = session_tokens(&clock);
        let user = User::first_seen(HostUserId::new(9), HostProfile::default());
        let bearer = format!("Bearer {}", tokens.issue(&user).expect("token").token);
        let state = TestPorts {
            transactions: Arc::new(transactions),
            ..TestPorts::default()
        }
        .into_state(tokens);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(verify_transaction),
        )
        .await;
        let request = test::TestRequest::post()
            .uri("/transactions/verify")
            .insert_header((AUTHORIZATION, bearer))
            .set_json(body)
            .to_request();
        let response = test::call_service(&app, request).await;
        let status = response.status();
        (status, test::read_body_json(response).await)
    }

    fn claim_body() -> Value {
        json!({
            "txHash": "abc123",
            "type": "quiz_reward",
            "metadata": { "questionId": "q1" },
        })
    }

    #[rstest]
    #[case::first(false)]
    #[case::replay(true)]
    #[actix_web::test]
    async fn confirmed_verification_has_stable_shape(#[case] replayed: bool) {
        let mut transactions = MockTransactionVerification::new();
        transactions
            .expect_verify()
            .withf(|request| {
                request.kind == TransactionKind::QuizReward
                    && request.tx_hash.as_ref() == "abc123"
                    && request.metadata["questionId"] == "q1"
            })
            .times(1)
            .return_once(move |_| {
                Ok(VerifyTransactionResponse {
                    status: TransactionStatus::Confirmed,
                    replayed,
                })
            });

        let (status, body) = call(transactions, claim_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "status": "confirmed" }));
    }

    #[actix_web::test]
    async fn rejected_claim_is_unprocessable() {
        let mut transactions = MockTransactionVerification::new();
        transactions
            .expect_verify()
            .return_once(|_| Err(Error::rejected("Claim signature mismatch.")));

        let (status, body) = call(transactions, claim_body()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], json!("rejected"));
    }

    #[actix_web::test]
    async fn unknown_type_is_bad_request() {
        let mut body = claim_body();
        body["type"] = json!("refund");

        let (status, body) = call(MockTransactionVerification::new(), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], json!("type"));
    }

    #[actix_web::test]
    async fn indexer_outage_is_service_unavailable() {
        let mut transactions = MockTransactionVerification::new();
        transactions
            .expect_verify()
            .return_once(|_| Err(Error::upstream_unavailable("chain indexer timed out")));

        let (status, _) = call(transactions, claim_body()).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
