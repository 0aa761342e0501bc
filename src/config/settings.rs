use serde::Deserialize;

use crate::broker::Broker;

/// Top-level configuration settings for the application.
///
/// Groups the broker tuning, the message history store and logging.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub history: HistorySettings,
    pub log: LogSettings,
}

/// Configuration settings for the broker.
///
/// Queue capacities and the two timeouts that implement backpressure.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    pub input_capacity: usize,
    pub submit_timeout_ms: u64,
    pub delivery_timeout_ms: u64,
    pub session_queue_capacity: usize,
}

/// Configuration settings for the message history store.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HistorySettings {
    pub path: String,
    pub ttl_secs: u64,
    pub max_messages_per_sender: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub history: Option<PartialHistorySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub input_capacity: Option<usize>,
    pub submit_timeout_ms: Option<u64>,
    pub delivery_timeout_ms: Option<u64>,
    pub session_queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHistorySettings {
    pub path: Option<String>,
    pub ttl_secs: Option<u64>,
    pub max_messages_per_sender: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            input_capacity: Broker::DEFAULT_INPUT_CAPACITY,
            submit_timeout_ms: Broker::DEFAULT_SUBMIT_TIMEOUT_MS,
            delivery_timeout_ms: Broker::DEFAULT_DELIVERY_TIMEOUT_MS,
            session_queue_capacity: 16,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            path: "chatcore_history".to_string(),
            ttl_secs: 3600,
            max_messages_per_sender: 1000,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from `Settings::default()`.
    pub fn merge_with_defaults(self) -> Settings {
        let default = Settings::default();
        let broker = self.broker;
        let history = self.history;
        let log = self.log;

        Settings {
            broker: BrokerSettings {
                input_capacity: broker
                    .as_ref()
                    .and_then(|b| b.input_capacity)
                    .unwrap_or(default.broker.input_capacity),
                submit_timeout_ms: broker
                    .as_ref()
                    .and_then(|b| b.submit_timeout_ms)
                    .unwrap_or(default.broker.submit_timeout_ms),
                delivery_timeout_ms: broker
                    .as_ref()
                    .and_then(|b| b.delivery_timeout_ms)
                    .unwrap_or(default.broker.delivery_timeout_ms),
                session_queue_capacity: broker
                    .as_ref()
                    .and_then(|b| b.session_queue_capacity)
                    .unwrap_or(default.broker.session_queue_capacity),
            },
            history: HistorySettings {
                path: history
                    .as_ref()
                    .and_then(|h| h.path.clone())
                    .unwrap_or(default.history.path),
                ttl_secs: history
                    .as_ref()
                    .and_then(|h| h.ttl_secs)
                    .unwrap_or(default.history.ttl_secs),
                max_messages_per_sender: history
                    .as_ref()
                    .and_then(|h| h.max_messages_per_sender)
                    .unwrap_or(default.history.max_messages_per_sender),
            },
            log: LogSettings {
                level: log
                    .and_then(|l| l.level)
                    .unwrap_or(default.log.level),
            },
        }
    }
}
