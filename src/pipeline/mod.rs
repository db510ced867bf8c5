/*
 * Responsibility
 * - Per-request lifecycle: authenticate → dispatch → normalize → finalize → release
 * - context: RequestContext / SessionHandle / Identity
 * - normalizer: Failure → ErrorRecord (the only thing clients ever see on failure)
 */
pub mod context;
pub mod normalizer;
mod stages;

pub use context::{Identity, RequestContext, SessionHandle};
pub use normalizer::{ErrorKind, ErrorRecord, normalize};
pub use stages::Pipeline;
