//! # strata_core
//!
//! Core auth domain logic for Strata: token issuance and verification,
//! refresh-token rotation, API key verification, and the in-process
//! rate-limit and user-status state shared by the HTTP layer.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod uuid;
