//! Benefit eligibility and document readiness over admin-configured profile
//! fields, credential mappings and catalog criteria.

pub mod benefits;
pub mod catalog;
pub mod config;
pub mod documents;
pub mod eligibility;
pub mod error;
pub mod fields;
pub mod mapping;
pub mod masking;
pub mod telemetry;
