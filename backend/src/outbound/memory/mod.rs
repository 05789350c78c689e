//! In-process store implementing every persistence port.
//!
//! Used when no database URL is configured and by tests. It mirrors the
//! uniqueness rules of the PostgreSQL schema: one user per host account, one
//! record per `(user, action)`, one transaction per hash, one confirmed claim
//! per quiz session, and one rewarded session per `(user, question)`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    QuestionRepository, QuestionRepositoryError, QuizSessionRepository,
    QuizSessionRepositoryError, RateLimitRepository, RateLimitRepositoryError,
    TransactionRepository, TransactionRepositoryError, UserPersistenceError, UserRepository,
};
use crate::domain::{
    ActionKind, HostProfile, HostUserId, Question, QuestionId, QuizSession, QuizSessionId,
    RateLimitRecord, SessionCompletion, SessionStatus, TransactionRecord, TxHash, User, UserId,
};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    rate_limits: HashMap<(UserId, ActionKind), RateLimitRecord>,
    sessions: HashMap<QuizSessionId, QuizSession>,
    questions: HashMap<QuestionId, Question>,
    transactions: HashMap<String, TransactionRecord>,
}

/// Mutex-guarded tables. Every operation is atomic with respect to the
/// others.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed or replace a question.
    pub fn put_question(&self, question: Question) {
        self.tables()
            .questions
            .insert(question.id.clone(), question);
    }

    /// Seed or replace a quiz session.
    pub fn put_session(&self, session: QuizSession) {
        self.tables().sessions.insert(session.id, session);
    }

    pub fn session(&self, id: &QuizSessionId) -> Option<QuizSession> {
        self.tables().sessions.get(id).cloned()
    }

    pub fn rate_limit(&self, user_id: &UserId, action: ActionKind) -> Option<RateLimitRecord> {
        self.tables().rate_limits.get(&(*user_id, action)).cloned()
    }

    pub fn user_by_host(&self, host_user_id: HostUserId) -> Option<User> {
        self.tables()
            .users
            .values()
            .find(|user| user.host_user_id == host_user_id)
            .cloned()
    }

    pub fn transaction(&self, tx_hash: &str) -> Option<TransactionRecord> {
        self.tables().transactions.get(tx_hash).cloned()
    }

    pub fn transaction_count(&self) -> usize {
        self.tables().transactions.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_host_id(
        &self,
        host_user_id: HostUserId,
    ) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.user_by_host(host_user_id))
    }

    async fn insert(&self, user: &User) -> Result<(), UserPersistenceError> {
        let mut tables = self.tables();
        if tables
            .users
            .values()
            .any(|existing| existing.host_user_id == user.host_user_id)
        {
            return Err(UserPersistenceError::duplicate_host_user(
                user.host_user_id.get(),
            ));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &UserId,
        profile: &HostProfile,
    ) -> Result<(), UserPersistenceError> {
        if let Some(user) = self.tables().users.get_mut(id) {
            user.profile = profile.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryStore {
    async fn find(
        &self,
        user_id: &UserId,
        action: ActionKind,
    ) -> Result<Option<RateLimitRecord>, RateLimitRepositoryError> {
        Ok(self.rate_limit(user_id, action))
    }

    async fn record_attempt(
        &self,
        user_id: &UserId,
        action: ActionKind,
        at: DateTime<Utc>,
    ) -> Result<(), RateLimitRepositoryError> {
        self.tables()
            .rate_limits
            .entry((*user_id, action))
            .and_modify(|record| record.last_attempt_at = at)
            .or_insert_with(|| RateLimitRecord {
                user_id: *user_id,
                action,
                last_attempt_at: at,
                violation_count: 0,
            });
        Ok(())
    }

    async fn record_violation(
        &self,
        user_id: &UserId,
        action: ActionKind,
    ) -> Result<(), RateLimitRepositoryError> {
        if let Some(record) = self.tables().rate_limits.get_mut(&(*user_id, action)) {
            record.violation_count = record.violation_count.saturating_add(1);
        }
        Ok(())
    }
}

#[async_trait]
impl QuizSessionRepository for InMemoryStore {
    async fn create(&self, session: &QuizSession) -> Result<(), QuizSessionRepositoryError> {
        self.put_session(session.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &QuizSessionId,
    ) -> Result<Option<QuizSession>, QuizSessionRepositoryError> {
        Ok(self.session(id))
    }

    async fn complete(
        &self,
        id: &QuizSessionId,
        completion: &SessionCompletion,
    ) -> Result<bool, QuizSessionRepositoryError> {
        let mut tables = self.tables();
        let Some(target) = tables.sessions.get(id) else {
            return Ok(false);
        };
        if !target.is_active() {
            return Ok(false);
        }
        if completion.reward_granted {
            let (user_id, question_id) = (target.user_id, target.question_id.clone());
            let taken = tables.sessions.values().any(|other| {
                other.id != *id
                    && other.reward_granted
                    && other.user_id == user_id
                    && other.question_id == question_id
            });
            if taken {
                return Err(QuizSessionRepositoryError::reward_already_granted());
            }
        }
        if let Some(session) = tables.sessions.get_mut(id) {
            session.status = SessionStatus::Completed;
            session.completed_at = Some(completion.completed_at);
            session.is_correct = Some(completion.is_correct);
            session.answer_index = Some(completion.answer_index);
            session.duration_watched = Some(completion.duration_watched);
            session.reward_granted = completion.reward_granted;
        }
        Ok(true)
    }

    async fn has_other_correct(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
        excluding: &QuizSessionId,
    ) -> Result<bool, QuizSessionRepositoryError> {
        Ok(self.tables().sessions.values().any(|session| {
            session.id != *excluding
                && session.user_id == *user_id
                && session.question_id == *question_id
                && session.is_correct == Some(true)
        }))
    }

    async fn latest_rewarded(
        &self,
        user_id: &UserId,
        question_id: &QuestionId,
    ) -> Result<Option<QuizSession>, QuizSessionRepositoryError> {
        Ok(self
            .tables()
            .sessions
            .values()
            .filter(|session| {
                session.user_id == *user_id
                    && session.question_id == *question_id
                    && session.is_correct == Some(true)
                    && session.reward_granted
            })
            .max_by_key(|session| session.completed_at)
            .cloned())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn find_by_id(&self, id: &QuestionId) -> Result<Option<Question>, QuestionRepositoryError> {
        Ok(self.tables().questions.get(id).cloned())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn find_by_hash(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<TransactionRecord>, TransactionRepositoryError> {
        Ok(self.transaction(tx_hash.as_ref()))
    }

    async fn insert(&self, record: &TransactionRecord) -> Result<(), TransactionRepositoryError> {
        let mut tables = self.tables();
        if tables.transactions.contains_key(record.tx_hash.as_ref()) {
            return Err(TransactionRepositoryError::duplicate_hash(
                record.tx_hash.to_string(),
            ));
        }
        if let Some(session_id) = record.claim_session_id {
            let claimed = tables
                .transactions
                .values()
                .any(|existing| existing.claim_session_id == Some(session_id));
            if claimed {
                return Err(TransactionRepositoryError::duplicate_claim(
                    session_id.to_string(),
                ));
            }
        }
        tables
            .transactions
            .insert(record.tx_hash.to_string(), record.clone());
        Ok(())
    }
}
