use serde::{Deserialize, Serialize};

/// One incoming order as submitted by the storefront. Name, address and
/// phone are attacker-controlled free text; the optional fields are only
/// present when the capture layer could observe them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub full_name: String,
    pub mobile_number: String,
    pub full_address: String,
    pub product_id: String,
    pub quantity: u32,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_fingerprint: Option<String>,
}

/// What one weighted rule contributes when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub score: u32,
    pub reason: String,
}

/// The verdict handed back to the order-creation handler. Lives only for
/// the duration of one request; persisting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudVerdict {
    /// Aggregated rule score, clamped to 0-100.
    pub score: u32,
    /// One human-readable reason per triggered rule, in rule order.
    pub reasons: Vec<String>,
    pub is_blocked: bool,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,      // <30
    Medium,   // ≥30
    High,     // ≥60
    Critical, // ≥80
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            RiskLevel::Critical
        } else if score >= 60 {
            RiskLevel::High
        } else if score >= 30 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}
