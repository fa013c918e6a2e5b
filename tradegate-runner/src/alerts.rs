//! Alert payloads for the notification channel. Delivery is up to the sink.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tradegate_core::domain::Direction;

use crate::decision::Decision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Structured alert: what to trade and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub signal: Direction,
    pub entry: Option<f64>,
    pub stop: Option<f64>,
    pub target: Option<f64>,
    pub confidence: f64,
    pub severity: Severity,
    pub message: String,
}

impl Alert {
    /// Executed decisions alert at `Info`, rejections at `Warning`.
    pub fn from_decision(decision: &Decision) -> Self {
        let (severity, message) = match &decision.rejection_reason {
            Some(reason) => (Severity::Warning, format!("rejected: {reason}")),
            None => (Severity::Info, "trade opened".to_string()),
        };
        Self {
            symbol: decision.symbol.clone(),
            signal: decision.signal_direction,
            entry: decision.entry.as_ref().map(|r| r.point),
            stop: decision.stop.as_ref().map(|r| r.point),
            target: decision.target.as_ref().map(|r| r.point),
            confidence: decision.confidence,
            severity,
            message,
        }
    }

    pub fn forced_close(symbol: &str, price: f64, closed: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            signal: Direction::Flat,
            entry: None,
            stop: None,
            target: None,
            confidence: 1.0,
            severity: Severity::Critical,
            message: format!("forced close of {closed} position(s) at {price:.4}"),
        }
    }
}

/// Receiver of alerts.
pub trait AlertSink: Send + Sync {
    fn send(&self, alert: &Alert);
}

/// Emits alerts as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AlertSink for TracingSink {
    fn send(&self, alert: &Alert) {
        match alert.severity {
            Severity::Info => info!(
                symbol = %alert.symbol,
                signal = ?alert.signal,
                entry = ?alert.entry,
                stop = ?alert.stop,
                target = ?alert.target,
                confidence = alert.confidence,
                "{}",
                alert.message
            ),
            Severity::Warning | Severity::Critical => warn!(
                symbol = %alert.symbol,
                severity = ?alert.severity,
                "{}",
                alert.message
            ),
        }
    }
}

/// Collects alerts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    alerts: Mutex<Vec<Alert>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }
}

impl AlertSink for MemorySink {
    fn send(&self, alert: &Alert) {
        self.alerts.lock().push(alert.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.send(&Alert::forced_close("SPY", 101.5, 1));
        sink.send(&Alert::forced_close("QQQ", 402.0, 0));
        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].symbol, "SPY");
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].message, "forced close of 1 position(s) at 101.5000");
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn alert_serializes_signal_as_integer() {
        let json = serde_json::to_value(Alert::forced_close("SPY", 1.0, 1)).unwrap();
        assert_eq!(json["signal"], 0);
        assert_eq!(json["severity"], "CRITICAL");
    }
}
