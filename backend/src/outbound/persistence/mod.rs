//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of domain repository ports
//! backed by PostgreSQL via the Diesel ORM with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: Repository implementations only translate between
//!   Diesel models and domain types. No business logic resides here.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) are internal implementation details, never
//!   exposed to the domain layer.
//! - **Store-enforced uniqueness**: replay protection and the one-reward rule
//!   live in unique constraints, surfaced as dedicated port error variants.
//!
//! # Example
//!
//! ```ignore
//! use zimbeat_backend::outbound::persistence::{
//!     DbPool, DieselTransactionRepository, PoolConfig,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/zimbeat")).await?;
//! let repo = DieselTransactionRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_question_repository;
mod diesel_quiz_session_repository;
mod diesel_rate_limit_repository;
mod diesel_transaction_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_question_repository::DieselQuestionRepository;
pub use diesel_quiz_session_repository::DieselQuizSessionRepository;
pub use diesel_rate_limit_repository::DieselRateLimitRepository;
pub use diesel_transaction_repository::DieselTransactionRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
