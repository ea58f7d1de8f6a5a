use chrono::{DateTime, Duration, Utc};

use super::text;
use crate::config::{FraudSettings, RuleConfig};
use crate::db::{OrderFilter, OrderStore};
use crate::types::{OrderSubmission, RuleOutcome};

/// The seven weighted rules, modeled as a flat tagged set so evaluation
/// order is explicit data rather than dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    DuplicatePhone,
    DuplicateAddress,
    RapidOrders,
    SuspiciousPatterns,
    InvalidPhone,
    VpnDetection,
    DeviceFingerprint,
}

/// Order in which rules evaluate and in which their reasons appear in the
/// verdict.
pub const EVALUATION_ORDER: [RuleKind; 7] = [
    RuleKind::DuplicatePhone,
    RuleKind::DuplicateAddress,
    RuleKind::RapidOrders,
    RuleKind::SuspiciousPatterns,
    RuleKind::InvalidPhone,
    RuleKind::VpnDetection,
    RuleKind::DeviceFingerprint,
];

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::DuplicatePhone => "duplicate_phone",
            RuleKind::DuplicateAddress => "duplicate_address",
            RuleKind::RapidOrders => "rapid_orders",
            RuleKind::SuspiciousPatterns => "suspicious_patterns",
            RuleKind::InvalidPhone => "invalid_phone",
            RuleKind::VpnDetection => "vpn_detection",
            RuleKind::DeviceFingerprint => "device_fingerprint",
        }
    }

    fn config<'a>(&self, settings: &'a FraudSettings) -> &'a RuleConfig {
        let rules = &settings.rules;
        match self {
            RuleKind::DuplicatePhone => &rules.duplicate_phone,
            RuleKind::DuplicateAddress => &rules.duplicate_address,
            RuleKind::RapidOrders => &rules.rapid_orders,
            RuleKind::SuspiciousPatterns => &rules.suspicious_patterns,
            RuleKind::InvalidPhone => &rules.invalid_phone,
            RuleKind::VpnDetection => &rules.vpn_detection,
            RuleKind::DeviceFingerprint => &rules.device_fingerprint,
        }
    }
}

/// Run one rule. `None` means the rule did not fire: disabled, a required
/// field is absent, nothing matched, or its lookup degraded.
pub fn evaluate<S: OrderStore>(
    kind: RuleKind,
    order: &OrderSubmission,
    settings: &FraudSettings,
    store: &S,
    now: DateTime<Utc>,
) -> Option<RuleOutcome> {
    let cfg = kind.config(settings);
    if !cfg.enabled {
        return None;
    }
    match kind {
        RuleKind::DuplicatePhone => duplicate_phone(order, settings, cfg, store, now),
        RuleKind::DuplicateAddress => duplicate_address(order, settings, cfg, store, now),
        RuleKind::RapidOrders => rapid_orders(order, settings, cfg, store, now),
        RuleKind::SuspiciousPatterns => suspicious_patterns(order, cfg),
        RuleKind::InvalidPhone => invalid_phone(order, cfg),
        RuleKind::VpnDetection => vpn_detection(order, cfg),
        RuleKind::DeviceFingerprint => device_fingerprint(order, cfg, store, now),
    }
}

fn duplicate_phone<S: OrderStore>(
    order: &OrderSubmission,
    settings: &FraudSettings,
    cfg: &RuleConfig,
    store: &S,
    now: DateTime<Utc>,
) -> Option<RuleOutcome> {
    let since = now - Duration::minutes(settings.detection.duplicate_order_window_minutes);
    let count = count_or_zero(
        store,
        "duplicate_phone",
        &OrderFilter::by_mobile(&order.mobile_number),
        since,
    );
    if count == 0 {
        return None;
    }
    Some(RuleOutcome {
        score: cfg.weight.saturating_add(saturating_u32(count).saturating_mul(10)),
        reason: format!("Duplicate phone number ({count} recent orders)"),
    })
}

fn duplicate_address<S: OrderStore>(
    order: &OrderSubmission,
    settings: &FraudSettings,
    cfg: &RuleConfig,
    store: &S,
    now: DateTime<Utc>,
) -> Option<RuleOutcome> {
    let since = now - Duration::minutes(settings.detection.duplicate_order_window_minutes);
    let addresses = match store.addresses_since(since) {
        Ok(addresses) => addresses,
        Err(e) => {
            tracing::warn!("duplicate_address: history lookup failed, treating as no matches: {e}");
            return None;
        }
    };
    let matches = addresses
        .iter()
        .filter(|address| text::similarity(&order.full_address, address) > 0.8)
        .count();
    if matches == 0 {
        return None;
    }
    // Flat weight; the match count only feeds the reason string.
    Some(RuleOutcome {
        score: cfg.weight,
        reason: format!("Similar address found ({matches} matches)"),
    })
}

fn rapid_orders<S: OrderStore>(
    order: &OrderSubmission,
    settings: &FraudSettings,
    cfg: &RuleConfig,
    store: &S,
    now: DateTime<Utc>,
) -> Option<RuleOutcome> {
    let filter = OrderFilter {
        mobile_number: Some(&order.mobile_number),
        ip_address: order.ip_address.as_deref(),
        device_fingerprint: None,
    };
    let hourly = count_or_zero(store, "rapid_orders", &filter, now - Duration::hours(1));
    if hourly >= settings.detection.max_orders_per_hour {
        return Some(RuleOutcome {
            score: cfg.weight.saturating_add(saturating_u32(hourly).saturating_mul(5)),
            reason: format!("Too many orders per hour ({hourly})"),
        });
    }
    // Daily sub-check only when the hourly threshold was not met.
    let daily = count_or_zero(store, "rapid_orders", &filter, now - Duration::hours(24));
    if daily >= settings.detection.max_orders_per_day {
        return Some(RuleOutcome {
            score: cfg.weight,
            reason: format!("Too many orders per day ({daily})"),
        });
    }
    None
}

fn suspicious_patterns(order: &OrderSubmission, cfg: &RuleConfig) -> Option<RuleOutcome> {
    let text = format!("{}{}", order.full_name, order.full_address);
    let matches = text::suspicious_pattern_count(&text);
    if matches == 0 {
        return None;
    }
    Some(RuleOutcome {
        score: cfg.weight.saturating_mul(matches as u32),
        reason: format!("Suspicious patterns detected ({matches} patterns)"),
    })
}

fn invalid_phone(order: &OrderSubmission, cfg: &RuleConfig) -> Option<RuleOutcome> {
    if text::is_valid_bd_mobile(&order.mobile_number) {
        return None;
    }
    Some(RuleOutcome {
        score: cfg.weight,
        reason: "Invalid phone number format".to_string(),
    })
}

fn vpn_detection(order: &OrderSubmission, cfg: &RuleConfig) -> Option<RuleOutcome> {
    let ip = order.ip_address.as_deref()?;
    if !text::is_private_or_loopback(ip) {
        return None;
    }
    Some(RuleOutcome {
        score: cfg.weight,
        reason: "Suspicious IP address detected".to_string(),
    })
}

fn device_fingerprint<S: OrderStore>(
    order: &OrderSubmission,
    cfg: &RuleConfig,
    store: &S,
    now: DateTime<Utc>,
) -> Option<RuleOutcome> {
    let fingerprint = order.device_fingerprint.as_deref()?;
    let distinct = match store.distinct_phones_for_device(fingerprint, now - Duration::hours(24)) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(
                "device_fingerprint: history lookup failed, treating as no matches: {e}"
            );
            return None;
        }
    };
    if distinct <= 3 {
        return None;
    }
    Some(RuleOutcome {
        score: cfg.weight,
        reason: format!("Device used with multiple phone numbers ({distinct})"),
    })
}

fn count_or_zero<S: OrderStore>(
    store: &S,
    rule: &str,
    filter: &OrderFilter<'_>,
    since: DateTime<Utc>,
) -> u64 {
    match store.count_orders(filter, since) {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("{rule}: history lookup failed, treating as no matches: {e}");
            0
        }
    }
}

fn saturating_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
