//! # Reelforge API Server Library
//!
//! HTTP surface of Reelforge: credentials auth, video requests, the CRM
//! contact list, the public contact form, and the integrations proxy.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder, middleware stack
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validating request extractors
//! - `middleware`: Request id, security headers, panic boundary, body limit, auth context
//! - `registry`: File-based route registry
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod registry;
pub mod routes;
