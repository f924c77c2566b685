//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the seed/query/mutation use-cases.
//! - Keep UI/FFI layers decoupled from storage details.
//! - Convert every storage failure into a logged, safe default.

pub mod mutation_service;
pub mod query_service;
pub mod seed_service;
