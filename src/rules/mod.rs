pub mod checks;
pub mod text;

use chrono::Utc;

use crate::config::FraudSettings;
use crate::db::OrderStore;
use crate::types::{FraudVerdict, OrderSubmission, RiskLevel};

/// Reported scores are clamped to this ceiling.
pub const MAX_SCORE: u32 = 100;

/// The fraud engine: maps one order submission plus settings to a verdict,
/// consulting order history through the injected store.
pub struct FraudDetector<S> {
    store: S,
}

impl<S: OrderStore> FraudDetector<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Score one submission. Never fails: degraded history lookups lower
    /// detection fidelity instead of blocking checkout.
    pub fn detect(&self, order: &OrderSubmission, settings: &FraudSettings) -> FraudVerdict {
        if !settings.detection.enabled {
            // No history lookups happen on this path.
            return FraudVerdict {
                score: 0,
                reasons: Vec::new(),
                is_blocked: false,
                risk_level: RiskLevel::Low,
            };
        }

        // Whitelist wins over everything, blacklist included.
        if is_whitelisted(order, settings) {
            return FraudVerdict {
                score: 0,
                reasons: vec!["Whitelisted user".to_string()],
                is_blocked: false,
                risk_level: RiskLevel::Low,
            };
        }

        // Absolute deny: ignores auto_block and skips scoring entirely.
        if is_blacklisted(order, settings) {
            return FraudVerdict {
                score: MAX_SCORE,
                reasons: vec!["Blacklisted user/IP/keyword detected".to_string()],
                is_blocked: true,
                risk_level: RiskLevel::Critical,
            };
        }

        let now = Utc::now();
        let mut total: u32 = 0;
        let mut reasons = Vec::new();
        for kind in checks::EVALUATION_ORDER {
            if let Some(outcome) = checks::evaluate(kind, order, settings, &self.store, now) {
                tracing::debug!(rule = kind.name(), score = outcome.score, "rule fired");
                total = total.saturating_add(outcome.score);
                reasons.push(outcome.reason);
            }
        }

        // Clamp first, then compare against the threshold.
        let score = total.min(MAX_SCORE);
        let is_blocked =
            settings.detection.auto_block && score >= settings.detection.score_threshold;
        FraudVerdict {
            score,
            reasons,
            is_blocked,
            risk_level: RiskLevel::from_score(score),
        }
    }
}

fn is_whitelisted(order: &OrderSubmission, settings: &FraudSettings) -> bool {
    let whitelist = &settings.whitelist;
    whitelist.phones.contains(&order.mobile_number)
        || order
            .ip_address
            .as_ref()
            .is_some_and(|ip| whitelist.ips.contains(ip))
        || order
            .device_fingerprint
            .as_ref()
            .is_some_and(|fp| whitelist.devices.contains(fp))
}

fn is_blacklisted(order: &OrderSubmission, settings: &FraudSettings) -> bool {
    let blacklist = &settings.blacklist;
    if blacklist.phones.contains(&order.mobile_number) {
        return true;
    }
    if order
        .ip_address
        .as_ref()
        .is_some_and(|ip| blacklist.ips.contains(ip))
    {
        return true;
    }
    let haystack = format!("{}{}", order.full_name, order.full_address).to_lowercase();
    blacklist
        .keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && haystack.contains(&keyword.to_lowercase()))
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{DateTime, Utc};

    use crate::db::{OrderFilter, OrderStore, StoreError};
    use crate::types::OrderSubmission;

    /// One remembered order row for the in-memory store.
    pub struct StoredOrder {
        pub mobile: String,
        pub ip: Option<String>,
        pub fingerprint: Option<String>,
        pub address: String,
        pub created_at: DateTime<Utc>,
    }

    impl StoredOrder {
        pub fn new(mobile: &str, created_at: DateTime<Utc>) -> Self {
            Self {
                mobile: mobile.to_string(),
                ip: None,
                fingerprint: None,
                address: String::new(),
                created_at,
            }
        }
    }

    /// In-memory OrderStore with per-method failure switches.
    #[derive(Default)]
    pub struct MockStore {
        pub orders: Vec<StoredOrder>,
        pub fail_counts: bool,
        pub fail_addresses: bool,
        pub fail_devices: bool,
    }

    impl MockStore {
        pub fn with_orders(orders: Vec<StoredOrder>) -> Self {
            Self {
                orders,
                ..Self::default()
            }
        }
    }

    impl OrderStore for MockStore {
        fn count_orders(
            &self,
            filter: &OrderFilter<'_>,
            since: DateTime<Utc>,
        ) -> Result<u64, StoreError> {
            if self.fail_counts {
                return Err("simulated count failure".into());
            }
            if filter.is_empty() {
                return Ok(0);
            }
            let count = self
                .orders
                .iter()
                .filter(|o| o.created_at >= since)
                .filter(|o| {
                    filter.mobile_number.is_some_and(|m| o.mobile == m)
                        || filter.ip_address.is_some_and(|ip| o.ip.as_deref() == Some(ip))
                        || filter
                            .device_fingerprint
                            .is_some_and(|fp| o.fingerprint.as_deref() == Some(fp))
                })
                .count();
            Ok(count as u64)
        }

        fn addresses_since(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
            if self.fail_addresses {
                return Err("simulated address failure".into());
            }
            Ok(self
                .orders
                .iter()
                .filter(|o| o.created_at >= since)
                .map(|o| o.address.clone())
                .collect())
        }

        fn distinct_phones_for_device(
            &self,
            fingerprint: &str,
            since: DateTime<Utc>,
        ) -> Result<u64, StoreError> {
            if self.fail_devices {
                return Err("simulated device failure".into());
            }
            let mut phones: Vec<&str> = self
                .orders
                .iter()
                .filter(|o| o.created_at >= since)
                .filter(|o| o.fingerprint.as_deref() == Some(fingerprint))
                .map(|o| o.mobile.as_str())
                .collect();
            phones.sort_unstable();
            phones.dedup();
            Ok(phones.len() as u64)
        }
    }

    pub fn order_with_mobile(mobile: &str) -> OrderSubmission {
        OrderSubmission {
            full_name: "রহিম উদ্দিন".to_string(),
            mobile_number: mobile.to_string(),
            full_address: "বাড়ি ১২, রোড ৫, ধানমন্ডি, ঢাকা".to_string(),
            product_id: "prod-1".to_string(),
            quantity: 1,
            ip_address: None,
            user_agent: None,
            device_fingerprint: None,
        }
    }
}
