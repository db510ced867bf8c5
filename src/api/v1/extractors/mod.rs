/*
 * Responsibility
 * - Handler-facing extractors over the state the pipeline put in request extensions
 */
mod identity;
mod session;

pub use crate::pipeline::Identity;
pub use identity::Authenticated;
pub use session::DbSession;
