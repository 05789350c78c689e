//! Read-only port onto the content store's questions.

use async_trait::async_trait;

use crate::domain::{Question, QuestionId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by question store adapters.
    pub enum QuestionRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } => "question store connection failed: {message}",
        /// Query failed or returned an unusable row.
        Query { message: String } => "question store query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuestionId) -> Result<Option<Question>, QuestionRepositoryError>;
}
