//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod background_tasks;
mod chain_indexer;
mod identity_handshake;
mod question_repository;
mod quiz_command;
mod quiz_session_repository;
mod rate_limit_repository;
mod transaction_repository;
mod transaction_verification;
mod user_repository;

pub use background_tasks::{BackgroundJob, BackgroundTasks};
#[cfg(test)]
pub use chain_indexer::MockChainIndexer;
pub use chain_indexer::{ChainIndexer, ChainIndexerError};
#[cfg(test)]
pub use identity_handshake::MockIdentityHandshake;
pub use identity_handshake::{HandshakeOutcome, IdentityHandshake};
#[cfg(test)]
pub use question_repository::MockQuestionRepository;
pub use question_repository::{QuestionRepository, QuestionRepositoryError};
#[cfg(test)]
pub use quiz_command::MockQuizCommand;
pub use quiz_command::{QuizCommand, SubmitAnswerOutcome, SubmitAnswerRequest};
#[cfg(test)]
pub use quiz_session_repository::MockQuizSessionRepository;
pub use quiz_session_repository::{QuizSessionRepository, QuizSessionRepositoryError};
#[cfg(test)]
pub use rate_limit_repository::{MockRateLimitGate, MockRateLimitRepository};
pub use rate_limit_repository::{
    FixtureRateLimitGate, RateLimitGate, RateLimitRepository, RateLimitRepositoryError,
};
#[cfg(test)]
pub use transaction_repository::MockTransactionRepository;
pub use transaction_repository::{TransactionRepository, TransactionRepositoryError};
#[cfg(test)]
pub use transaction_verification::MockTransactionVerification;
pub use transaction_verification::{
    TransactionVerification, VerifyTransactionRequest, VerifyTransactionResponse,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
