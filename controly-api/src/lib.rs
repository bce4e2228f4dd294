//! # Controly API Server Library
//!
//! HTTP surface of Controly: authentication, the plan catalog, per-module
//! permission verdicts and the tenant CRM resources, all gated by the
//! entitlement service from `controly-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
