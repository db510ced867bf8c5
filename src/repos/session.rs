/*
 * Responsibility
 * - Request-scoped storage session provider (acquire / release)
 * - The pipeline bookends the session: handlers acquire it on demand,
 *   the pipeline releases it once the response is final
 */
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, pool::PoolConnection};

use crate::repos::error::RepoResult;

/// Source of request-scoped storage sessions.
///
/// `release` is called by the pipeline at most once for every session that
/// `acquire` handed out.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    type Session: Send + 'static;

    async fn acquire(&self) -> RepoResult<Self::Session>;

    async fn release(&self, session: Self::Session);
}

/// Postgres sessions backed by a connection pool.
#[derive(Clone, Debug)]
pub struct PgSessions {
    pool: PgPool,
}

impl PgSessions {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionProvider for PgSessions {
    type Session = PoolConnection<Postgres>;

    async fn acquire(&self) -> RepoResult<Self::Session> {
        Ok(self.pool.acquire().await?)
    }

    async fn release(&self, session: Self::Session) {
        // Dropping a pooled connection hands it back to the pool.
        drop(session);
        tracing::debug!(idle = self.pool.num_idle(), "storage session returned to pool");
    }
}
