//! Request pipeline for HTTP services: authenticate, dispatch, normalize
//! failures, release per-request resources.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod repos;
pub mod services;
pub mod state;
