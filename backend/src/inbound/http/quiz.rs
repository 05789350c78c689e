//! Quiz endpoints: open a session for a question, then submit one answer.
//!
//! Submission outcomes are ordinary `200` responses distinguished by
//! `success`/`correct`; store, rate-limit, and integrity failures go through
//! the shared error mapping.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{SubmitAnswerOutcome, SubmitAnswerRequest};
use crate::domain::{ClaimTemplate, REQUIREMENT_NOT_MET};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_answer_index, parse_question_id, parse_session_id,
};

const REWARD_UNLOCKED: &str = "Correct! Reward unlocked.";
const ALREADY_CLAIMED: &str = "Correct! You have already claimed this reward.";
const INCORRECT: &str = "Incorrect answer.";

/// Request body for opening a quiz session.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    #[schema(example = "q-101")]
    pub question_id: String,
}

/// Response body for an opened quiz session.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    #[schema(example = "6c8e0f43-0c8f-4f38-9a1e-37f2d3b4c1aa")]
    pub session_id: String,
}

/// Request body for answering an active session.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerBody {
    pub question_id: String,
    pub answer_index: u32,
    pub session_id: String,
    /// Seconds of playback the client observed.
    #[schema(example = 15.2)]
    pub duration_watched: f64,
}

/// Outcome of a submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub success: bool,
    pub correct: bool,
    pub message: String,
    /// Revealed only for a wrong answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_amount: Option<u64>,
    /// Hex claim signature; present only when a reward was unlocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Unsigned wallet transaction carrying `claim:<signature>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<ClaimTemplate>,
}

impl SubmitAnswerResponse {
    fn plain(success: bool, correct: bool, message: &str) -> Self {
        Self {
            success,
            correct,
            message: message.to_owned(),
            correct_answer_index: None,
            reward_amount: None,
            signature: None,
            claim: None,
        }
    }
}

impl From<SubmitAnswerOutcome> for SubmitAnswerResponse {
    fn from(value: SubmitAnswerOutcome) -> Self {
        match value {
            SubmitAnswerOutcome::RequirementNotMet => Self::plain(false, false, REQUIREMENT_NOT_MET),
            SubmitAnswerOutcome::Incorrect {
                correct_answer_index,
            } => Self {
                correct_answer_index: Some(correct_answer_index),
                ..Self::plain(true, false, INCORRECT)
            },
            SubmitAnswerOutcome::Rewarded {
                reward_amount,
                signature,
                claim,
            } => Self {
                reward_amount: Some(reward_amount),
                signature: Some(signature),
                claim,
                ..Self::plain(true, true, REWARD_UNLOCKED)
            },
            SubmitAnswerOutcome::AlreadyClaimed => Self {
                reward_amount: Some(0),
                ..Self::plain(true, true, ALREADY_CLAIMED)
            },
        }
    }
}

/// Open a quiz session for the authenticated user.
#[utoipa::path(
    post,
    path = "/quiz/session",
    request_body = StartQuizRequest,
    responses(
        (status = 200, description = "Session opened", body = StartQuizResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Unknown question", body = ErrorSchema),
        (status = 429, description = "Cooldown active", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["quiz"],
    operation_id = "startQuizSession",
    security(("BearerSession" = []))
)]
#[post("/quiz/session")]
pub async fn start_session(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<StartQuizRequest>,
) -> ApiResult<web::Json<StartQuizResponse>> {
    let question_id = parse_question_id(
        payload.into_inner().question_id,
        FieldName::new("questionId"),
    )?;
    let session_id = state.quiz.start(&session.user_id(), &question_id).await?;
    Ok(web::Json(StartQuizResponse {
        session_id: session_id.to_string(),
    }))
}

/// Submit the single answer an active session accepts.
#[utoipa::path(
    post,
    path = "/quiz/submit",
    request_body = SubmitAnswerBody,
    responses(
        (status = 200, description = "Session completed", body = SubmitAnswerResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 404, description = "Unknown session", body = ErrorSchema),
        (status = 409, description = "Session already completed or reward already granted", body = ErrorSchema),
        (status = 429, description = "Cooldown active", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["quiz"],
    operation_id = "submitQuizAnswer",
    security(("BearerSession" = []))
)]
#[post("/quiz/submit")]
pub async fn submit_answer(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SubmitAnswerBody>,
) -> ApiResult<web::Json<SubmitAnswerResponse>> {
    let SubmitAnswerBody {
        question_id,
        answer_index,
        session_id,
        duration_watched,
    } = payload.into_inner();
    let request = SubmitAnswerRequest {
        user_id: session.user_id(),
        session_id: parse_session_id(&session_id, FieldName::new("sessionId"))?,
        question_id: parse_question_id(question_id, FieldName::new("questionId"))?,
        answer_index: parse_answer_index(answer_index, FieldName::new("answerIndex"))?,
        duration_watched,
    };

    let outcome = state.quiz.submit(request).await?;
    Ok(web::Json(SubmitAnswerResponse::from(outcome)))
}

#[cfg(test)]
#[path = "quiz_tests.rs"]
mod tests;
