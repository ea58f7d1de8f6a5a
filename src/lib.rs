//! ordersentry — rule-based fraud scoring for e-commerce order submissions.
//!
//! One order submission plus a [`FraudSettings`] configuration goes in; a
//! [`FraudVerdict`] with a 0-100 score, triggered reasons, a risk tier and
//! a block decision comes out. Historical lookups (duplicate phones,
//! order velocity, device reuse) run through the injected [`OrderStore`];
//! a degraded store lowers detection fidelity instead of failing checkout.

pub mod config;
pub mod db;
pub mod fingerprint;
pub mod notifications;
pub mod rules;
pub mod types;

pub use config::FraudSettings;
pub use db::{OrderFilter, OrderStore, SqliteOrderStore, StoreError};
pub use notifications::{FraudAlert, FraudNotifier};
pub use rules::FraudDetector;
pub use types::{FraudVerdict, OrderSubmission, RiskLevel, RuleOutcome};
