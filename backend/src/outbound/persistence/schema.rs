//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// Platform users keyed by host identity.
    ///
    /// `host_user_id` is unique; concurrent first handshakes race on it.
    users (id) {
        id -> Uuid,
        host_user_id -> Int8,
        role -> Varchar,
        wallet_address -> Nullable<Varchar>,
        first_name -> Varchar,
        last_name -> Nullable<Varchar>,
        username -> Nullable<Varchar>,
        language_code -> Nullable<Varchar>,
        is_premium -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Last attempt per `(user, action)` plus a passive violation counter.
    user_rate_limits (user_id, action) {
        user_id -> Uuid,
        action -> Varchar,
        last_attempt_at -> Timestamptz,
        violation_count -> Int4,
    }
}

diesel::table! {
    /// Read-only quiz content.
    questions (id) {
        id -> Varchar,
        correct_option_index -> Int4,
        media_duration_secs -> Int4,
        reward_amount -> Int8,
    }
}

diesel::table! {
    /// Quiz attempts.
    ///
    /// A partial unique index on `(user_id, question_id) WHERE reward_granted`
    /// allows one rewarded session per user and question.
    quiz_sessions (id) {
        id -> Uuid,
        user_id -> Uuid,
        question_id -> Varchar,
        status -> Varchar,
        started_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
        is_correct -> Nullable<Bool>,
        answer_index -> Nullable<Int4>,
        duration_watched -> Nullable<Float8>,
        reward_granted -> Bool,
    }
}

diesel::table! {
    /// Credited chain transactions. `tx_hash` and `claim_session_id` are
    /// unique.
    transactions (id) {
        id -> Int8,
        tx_hash -> Varchar,
        user_id -> Uuid,
        kind -> Varchar,
        metadata -> Jsonb,
        amount -> Int8,
        status -> Varchar,
        claim_session_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(user_rate_limits -> users (user_id));
diesel::joinable!(quiz_sessions -> users (user_id));
diesel::joinable!(transactions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    questions,
    quiz_sessions,
    transactions,
    user_rate_limits,
    users,
);
