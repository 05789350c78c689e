//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{questions, quiz_sessions, transactions, user_rate_limits, users};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub host_user_id: i64,
    pub role: String,
    pub wallet_address: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub host_user_id: i64,
    pub role: &'a str,
    pub wallet_address: Option<&'a str>,
    pub first_name: &'a str,
    pub last_name: Option<&'a str>,
    pub username: Option<&'a str>,
    pub language_code: Option<&'a str>,
    pub is_premium: bool,
}

/// Host-vouched display fields refreshed on each handshake.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserProfileUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: Option<&'a str>,
    pub username: Option<&'a str>,
    pub language_code: Option<&'a str>,
    pub is_premium: bool,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Rate limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_rate_limits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RateLimitRow {
    pub user_id: Uuid,
    pub action: String,
    pub last_attempt_at: DateTime<Utc>,
    pub violation_count: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_rate_limits)]
pub(crate) struct NewRateLimitRow<'a> {
    pub user_id: Uuid,
    pub action: &'a str,
    pub last_attempt_at: DateTime<Utc>,
    pub violation_count: i32,
}

// ---------------------------------------------------------------------------
// Questions and quiz sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QuestionRow {
    pub id: String,
    pub correct_option_index: i32,
    pub media_duration_secs: i32,
    pub reward_amount: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = quiz_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct QuizSessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_correct: Option<bool>,
    pub answer_index: Option<i32>,
    pub duration_watched: Option<f64>,
    pub reward_granted: bool,
}

/// Values written by the `active → completed` transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = quiz_sessions)]
pub(crate) struct QuizSessionCompletion<'a> {
    pub status: &'a str,
    pub completed_at: DateTime<Utc>,
    pub is_correct: bool,
    pub answer_index: i32,
    pub duration_watched: f64,
    pub reward_granted: bool,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TransactionRow {
    pub tx_hash: String,
    pub user_id: Uuid,
    pub kind: String,
    pub metadata: serde_json::Value,
    pub amount: i64,
    pub status: String,
    pub claim_session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = transactions)]
pub(crate) struct NewTransactionRow<'a> {
    pub tx_hash: &'a str,
    pub user_id: Uuid,
    pub kind: &'a str,
    pub metadata: &'a serde_json::Value,
    pub amount: i64,
    pub status: &'a str,
    pub claim_session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
