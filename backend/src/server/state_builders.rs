//! Builders wiring repositories and domain services into [`HttpState`].

use std::sync::Arc;

use tracing::warn;

use crate::domain::ports::{
    ChainIndexer, QuestionRepository, QuizSessionRepository, RateLimitGate, RateLimitRepository,
    TransactionRepository, UserRepository,
};
use crate::domain::{
    ClaimSigner, HandshakeService, IdentityVerifier, QuizService, RateLimiter, SessionTokens,
    TransactionService, TransactionServiceDeps,
};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::outbound::chain::{HttpChainIndexer, HttpChainIndexerBuildError};
use crate::outbound::memory::InMemoryStore;
use crate::outbound::persistence::{
    DieselQuestionRepository, DieselQuizSessionRepository, DieselRateLimitRepository,
    DieselTransactionRepository, DieselUserRepository,
};

use super::ServerConfig;

/// One repository per persistence port.
struct Repositories<U, R, S, Q, T> {
    users: Arc<U>,
    rate_limits: Arc<R>,
    sessions: Arc<S>,
    questions: Arc<Q>,
    transactions: Arc<T>,
}

impl Repositories<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore, InMemoryStore> {
    fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            rate_limits: store.clone(),
            sessions: store.clone(),
            questions: store.clone(),
            transactions: store,
        }
    }
}

/// Services shared by every port, independent of the store.
struct SharedServices {
    tokens: Arc<SessionTokens>,
    verifier: Arc<IdentityVerifier>,
    signer: Arc<ClaimSigner>,
    indexer: Arc<dyn ChainIndexer>,
}

fn build_ports<U, R, S, Q, T>(
    config: &ServerConfig,
    repos: Repositories<U, R, S, Q, T>,
    shared: &SharedServices,
) -> HttpStatePorts
where
    U: UserRepository + 'static,
    R: RateLimitRepository + 'static,
    S: QuizSessionRepository + 'static,
    Q: QuestionRepository + 'static,
    T: TransactionRepository + 'static,
{
    let Repositories {
        users,
        rate_limits,
        sessions,
        questions,
        transactions,
    } = repos;

    let gate: Arc<dyn RateLimitGate> = Arc::new(RateLimiter::new(
        rate_limits,
        config.settings.rate_limit_policy(),
        config.clock.clone(),
        config.tasks.clone(),
    ));

    HttpStatePorts {
        handshake: Arc::new(HandshakeService::new(
            shared.verifier.clone(),
            users,
            shared.tokens.clone(),
            config.tasks.clone(),
        )),
        quiz: Arc::new(QuizService::new(
            sessions.clone(),
            questions.clone(),
            gate.clone(),
            shared.signer.clone(),
            config.clock.clone(),
        )),
        transactions: Arc::new(TransactionService::new(
            transactions,
            sessions,
            questions,
            TransactionServiceDeps {
                indexer: shared.indexer.clone(),
                gate,
                signer: shared.signer.clone(),
                policy: config.settings.verification_policy(),
                clock: config.clock.clone(),
            },
        )),
    }
}

fn build_chain_indexer(
    config: &ServerConfig,
) -> Result<Arc<dyn ChainIndexer>, HttpChainIndexerBuildError> {
    if let Some(indexer) = &config.chain_indexer {
        return Ok(indexer.clone());
    }
    let indexer_config = config
        .settings
        .chain_indexer(config.secrets.chain_api_key.clone());
    Ok(Arc::new(HttpChainIndexer::new(indexer_config)?))
}

/// Build the HTTP state, choosing Diesel repositories when a pool is
/// configured and the in-memory store otherwise.
///
/// # Errors
///
/// Returns [`std::io::Error`] when the chain indexer client cannot be built.
pub fn build_http_state(config: &ServerConfig) -> std::io::Result<HttpState> {
    let secrets = &config.secrets;
    let tokens = Arc::new(SessionTokens::new(
        &secrets.session_secret,
        config.settings.session_ttl(),
        config.clock.clone(),
    ));
    let shared = SharedServices {
        tokens: tokens.clone(),
        verifier: Arc::new(IdentityVerifier::new(
            &secrets.bot_token,
            config.clock.clone(),
        )),
        signer: Arc::new(ClaimSigner::new(
            secrets.claim_secret.clone(),
            config.settings.claim_template(),
            config.clock.clone(),
        )),
        indexer: build_chain_indexer(config)
            .map_err(|err| std::io::Error::other(format!("chain indexer setup failed: {err}")))?,
    };

    let ports = match &config.db_pool {
        Some(pool) => build_ports(
            config,
            Repositories {
                users: Arc::new(DieselUserRepository::new(pool.clone())),
                rate_limits: Arc::new(DieselRateLimitRepository::new(pool.clone())),
                sessions: Arc::new(DieselQuizSessionRepository::new(pool.clone())),
                questions: Arc::new(DieselQuestionRepository::new(pool.clone())),
                transactions: Arc::new(DieselTransactionRepository::new(pool.clone())),
            },
            &shared,
        ),
        None => {
            let store = match &config.memory_store {
                Some(store) => store.clone(),
                None => {
                    warn!("no database configured; using the in-memory store (development only)");
                    Arc::new(InMemoryStore::default())
                }
            };
            build_ports(config, Repositories::in_memory(store), &shared)
        }
    };

    Ok(HttpState::new(ports, tokens))
}
