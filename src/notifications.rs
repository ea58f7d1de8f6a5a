use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::config::NotifierConfig;
use crate::types::{FraudVerdict, OrderSubmission, RiskLevel};

/// One recorded fraud alert.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudAlert {
    pub mobile_number: String,
    pub score: u32,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Alert sink with cooldown to prevent spam. Holds a bounded ring buffer
/// of recent alerts and pushes to live subscribers over channels; construct
/// one and inject it where alerts are needed.
pub struct FraudNotifier {
    enabled: bool,
    min_score: u32,
    cooldown: Duration,
    max_history: usize,
    last_sent: Mutex<Option<Instant>>,
    history: Mutex<VecDeque<FraudAlert>>,
    subscribers: Mutex<Vec<Sender<FraudAlert>>>,
}

impl FraudNotifier {
    pub fn new(config: &NotifierConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_score: config.min_score,
            cooldown: Duration::from_secs(config.cooldown_seconds),
            max_history: config.max_history,
            last_sent: Mutex::new(None),
            history: Mutex::new(VecDeque::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Record and broadcast an alert for a scored order.
    /// Returns true if an alert was raised, false if skipped.
    pub fn notify(&self, order: &OrderSubmission, verdict: &FraudVerdict) -> bool {
        if !self.enabled {
            return false;
        }
        if verdict.score < self.min_score {
            return false;
        }
        if !self.check_cooldown() {
            return false;
        }

        let alert = FraudAlert {
            mobile_number: order.mobile_number.clone(),
            score: verdict.score,
            risk_level: verdict.risk_level,
            reasons: verdict.reasons.clone(),
            created_at: Utc::now(),
        };
        self.record(alert.clone());
        self.broadcast(alert);
        true
    }

    /// Register a live alert consumer. Disconnected receivers are pruned
    /// on the next broadcast.
    pub fn subscribe(&self) -> Receiver<FraudAlert> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Recent alerts, newest first.
    pub fn recent_alerts(&self) -> Vec<FraudAlert> {
        self.history.lock().unwrap().iter().rev().cloned().collect()
    }

    /// Check and update cooldown. Returns true if enough time has passed.
    fn check_cooldown(&self) -> bool {
        let mut last = self.last_sent.lock().unwrap();
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.cooldown {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    fn record(&self, alert: FraudAlert) {
        let mut history = self.history.lock().unwrap();
        history.push_back(alert);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    fn broadcast(&self, alert: FraudAlert) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|subscriber| subscriber.send(alert.clone()).is_ok());
    }
}
