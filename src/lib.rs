//! Mathhammer combat-resolution engine: library entry point.
//!
//! Exposes dice, ability parsing, weapon eligibility, the damage calculator,
//! wound allocation, scenario loading, advisories and reports for use by the
//! CLI and tests.

pub mod ability;
pub mod advisory;
pub mod allocator;
pub mod calculator;
pub mod config;
pub mod dice;
pub mod eligibility;
pub mod error;
pub mod model;
pub mod report;
pub mod scenario;
pub mod util;
