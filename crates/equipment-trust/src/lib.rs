//! Trust and reputation scoring for the equipment marketplace.
//!
//! The engine derives owner trust scores, listing quality scores and trust
//! badges from lead, review, listing and verification signals, and governs the
//! review-eligibility window that follows a lead.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod trust;
