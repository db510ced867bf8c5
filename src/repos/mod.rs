pub mod error;
pub mod session;

pub use error::{RepoError, RepoResult};
pub use session::{PgSessions, SessionProvider};
