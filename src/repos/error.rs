/*
 * Responsibility
 * - Failures raised by the storage layer, as seen by the rest of the app
 * - Anything wrapped here is classified as a storage error by the pipeline
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
