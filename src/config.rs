use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Upper bound applied to rule weights at load time.
pub const MAX_RULE_WEIGHT: u32 = 100;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FraudSettings {
    pub detection: DetectionConfig,
    pub rules: RulesConfig,
    pub blacklist: Blacklist,
    pub whitelist: Whitelist,
    pub notifications: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub enabled: bool,
    pub auto_block: bool,
    /// Clamped score at or above which auto-block triggers.
    pub score_threshold: u32,
    /// "Recent" window for the duplicate phone/address rules.
    pub duplicate_order_window_minutes: i64,
    pub max_orders_per_hour: u64,
    pub max_orders_per_day: u64,
}

/// Per-rule toggles and weights. Unknown rule keys are a config error so
/// that a typoed rule name fails loudly instead of silently using defaults.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub duplicate_phone: RuleConfig,
    pub duplicate_address: RuleConfig,
    pub rapid_orders: RuleConfig,
    pub suspicious_patterns: RuleConfig,
    pub invalid_phone: RuleConfig,
    pub vpn_detection: RuleConfig,
    pub device_fingerprint: RuleConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RuleConfig {
    pub enabled: bool,
    pub weight: u32,
}

impl RuleConfig {
    fn weighted(weight: u32) -> Self {
        Self {
            enabled: true,
            weight,
        }
    }
}

/// Exact-match deny sets plus keyword substrings matched case-insensitively
/// against the submitted name and address.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Blacklist {
    pub phones: HashSet<String>,
    pub ips: HashSet<String>,
    pub keywords: Vec<String>,
}

/// Trusted identities that bypass all scoring, including the blacklist.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Whitelist {
    pub phones: HashSet<String>,
    pub ips: HashSet<String>,
    pub devices: HashSet<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub min_score: u32,
    pub cooldown_seconds: u64,
    pub max_history: usize,
}

impl Default for FraudSettings {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            rules: RulesConfig::default(),
            blacklist: Blacklist::default(),
            whitelist: Whitelist::default(),
            notifications: NotifierConfig::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_block: true,
            score_threshold: 50,
            duplicate_order_window_minutes: 60,
            max_orders_per_hour: 3,
            max_orders_per_day: 10,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            duplicate_phone: RuleConfig::weighted(30),
            duplicate_address: RuleConfig::weighted(20),
            rapid_orders: RuleConfig::weighted(25),
            suspicious_patterns: RuleConfig::weighted(15),
            invalid_phone: RuleConfig::weighted(20),
            vpn_detection: RuleConfig::weighted(10),
            device_fingerprint: RuleConfig::weighted(25),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 10,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_score: 60,
            cooldown_seconds: 30,
            max_history: 100,
        }
    }
}

impl FraudSettings {
    /// Load settings from a TOML file. Falls back to defaults if the file
    /// doesn't exist or doesn't parse.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Settings file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => {
                    tracing::info!("Settings loaded from {}", path.display());
                    settings
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse and validate settings from TOML text.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let mut settings: Self = toml::from_str(contents)?;
        settings.clamp_weights();
        Ok(settings)
    }

    fn clamp_weights(&mut self) {
        for rule in self.rules.iter_mut() {
            if rule.weight > MAX_RULE_WEIGHT {
                tracing::warn!(
                    "Rule weight {} exceeds {MAX_RULE_WEIGHT}, clamping",
                    rule.weight
                );
                rule.weight = MAX_RULE_WEIGHT;
            }
        }
    }
}

impl RulesConfig {
    fn iter_mut(&mut self) -> impl Iterator<Item = &mut RuleConfig> {
        [
            &mut self.duplicate_phone,
            &mut self.duplicate_address,
            &mut self.rapid_orders,
            &mut self.suspicious_patterns,
            &mut self.invalid_phone,
            &mut self.vpn_detection,
            &mut self.device_fingerprint,
        ]
        .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let settings = FraudSettings::parse("").unwrap();
        assert_eq!(settings, FraudSettings::default());
        assert!(settings.detection.enabled);
        assert_eq!(settings.detection.score_threshold, 50);
        assert_eq!(settings.rules.duplicate_phone.weight, 30);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let settings = FraudSettings::parse(
            "[detection]\nscore_threshold = 70\n\n[rules.vpn_detection]\nenabled = false\n",
        )
        .unwrap();
        assert_eq!(settings.detection.score_threshold, 70);
        assert!(settings.detection.auto_block);
        assert!(!settings.rules.vpn_detection.enabled);
        assert_eq!(settings.rules.rapid_orders.weight, 25);
    }

    #[test]
    fn unknown_rule_key_rejected() {
        let result = FraudSettings::parse("[rules.nonexistent_rule]\nweight = 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn oversized_weight_clamped() {
        let settings = FraudSettings::parse("[rules.duplicate_phone]\nweight = 500\n").unwrap();
        assert_eq!(settings.rules.duplicate_phone.weight, MAX_RULE_WEIGHT);
    }

    #[test]
    fn lists_parse() {
        let settings = FraudSettings::parse(
            "[blacklist]\nphones = [\"01712345678\"]\nkeywords = [\"fake\"]\n\n[whitelist]\nips = [\"103.4.5.6\"]\n",
        )
        .unwrap();
        assert!(settings.blacklist.phones.contains("01712345678"));
        assert_eq!(settings.blacklist.keywords, vec!["fake"]);
        assert!(settings.whitelist.ips.contains("103.4.5.6"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = FraudSettings::load("/nonexistent/ordersentry.toml");
        assert_eq!(settings, FraudSettings::default());
    }
}
