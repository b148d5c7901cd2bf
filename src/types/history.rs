use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the return after `days` is stored on a record.
pub fn performance_key(days: u32) -> String {
    format!("performance_{}d", days)
}

/// A point-in-time signal as persisted in the history file.
///
/// Backfilled `performance_{N}d` values and any other unknown keys are kept in
/// `extra` so a load/save cycle reproduces the file exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// ISO-8601 local timestamp, e.g. `2024-05-01T09:30:00.123456`.
    pub timestamp: String,
    pub signal: String,
    pub score: f64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl SignalRecord {
    pub fn new(
        recorded_at: NaiveDateTime,
        signal: impl Into<String>,
        score: f64,
        price: f64,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            timestamp: recorded_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            signal: signal.into(),
            score,
            price,
            metadata: Some(metadata),
            extra: Map::new(),
        }
    }

    /// Parsed timestamp. Offsets are dropped and the wall-clock time kept.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        self.timestamp
            .parse::<NaiveDateTime>()
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(&self.timestamp)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    /// Backfilled return (percent) at the given horizon.
    pub fn performance(&self, days: u32) -> Option<f64> {
        self.extra.get(&performance_key(days))?.as_f64()
    }

    pub fn has_performance(&self, days: u32) -> bool {
        self.extra.contains_key(&performance_key(days))
    }

    pub(crate) fn set_performance(&mut self, days: u32, value: f64) {
        self.extra.insert(performance_key(days), Value::from(value));
    }

    /// Keys other than the fixed record fields, including performance values.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Accuracy statistics for one signal type, judged on the 7-day return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalAccuracy {
    pub signal: String,
    pub total: u32,
    pub correct: u32,
    /// Number of non-negative returns.
    pub wins: u32,
    /// Correct / total, 0 when there are no samples.
    pub accuracy: f64,
    /// Mean 7-day return in percent.
    pub avg_return: f64,
    /// Fraction of non-negative returns.
    pub win_rate: f64,
    #[serde(skip)]
    return_sum: f64,
}

impl SignalAccuracy {
    pub fn new(signal: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            ..Default::default()
        }
    }

    /// Add one evaluated record.
    pub fn record_return(&mut self, return_pct: f64, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
        if return_pct >= 0.0 {
            self.wins += 1;
        }
        self.return_sum += return_pct;
        self.recalculate();
    }

    fn recalculate(&mut self) {
        if self.total > 0 {
            let total = self.total as f64;
            self.accuracy = self.correct as f64 / total;
            self.avg_return = self.return_sum / total;
            self.win_rate = self.wins as f64 / total;
        } else {
            self.accuracy = 0.0;
            self.avg_return = 0.0;
            self.win_rate = 0.0;
        }
    }
}

/// A change of signal between two consecutive records of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SignalTransition {
    pub timestamp: String,
    pub from_signal: String,
    pub to_signal: String,
    pub price_change: f64,
    pub score_change: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_record_timestamp_round_trip() {
        let record = SignalRecord::new(at(9), "BUY", 4.0, 10.0, Map::new());
        assert_eq!(record.timestamp, "2024-03-01T09:00:00.000000");
        assert_eq!(record.recorded_at(), Some(at(9)));
    }

    #[test]
    fn test_record_parses_offset_timestamp() {
        let json = r#"{"timestamp":"2024-03-01T09:00:00+00:00","signal":"BUY","score":4.0,"price":10.0}"#;
        let record: SignalRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.recorded_at(), Some(at(9)));
        assert!(record.metadata.is_none());
    }

    #[test]
    fn test_performance_fields_flatten() {
        let mut record = SignalRecord::new(at(9), "HOLD", 3.0, 10.0, Map::new());
        record.set_performance(7, 1.5);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["performance_7d"], 1.5);
        assert!(value.get("performance_1d").is_none());
        assert_eq!(record.performance(7), Some(1.5));
        assert!(!record.has_performance(30));
    }

    #[test]
    fn test_accuracy_accumulates() {
        let mut stats = SignalAccuracy::new("BUY");
        stats.record_return(4.0, true);
        stats.record_return(-2.0, false);
        stats.record_return(0.0, false);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.correct, 1);
        assert!((stats.accuracy - 1.0 / 3.0).abs() < 1e-12);
        assert!((stats.avg_return - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats.win_rate - 2.0 / 3.0).abs() < 1e-12);
    }
}
