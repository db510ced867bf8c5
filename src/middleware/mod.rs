/*
 * Responsibility
 * - Router-level middleware that is not part of the request pipeline itself
 * - debug_headers is consumed by the pipeline's finalization stage
 */
pub mod debug_headers;
pub mod http;
pub mod preflight;
