//! Signal history tracking with backfilled performance and accuracy stats.
//!
//! Records are kept per ticker, append-only, capped to the most recent
//! `max_records`. Backfill adds `performance_{N}d` fields to records that are
//! old enough and never overwrites one. The on-disk shape is
//! `{ticker: [record, ...]}` and survives a load/save cycle unchanged.

use crate::config::HistoryConfig;
use crate::error::Result;
use crate::types::{
    Recommendation, SignalAccuracy, SignalFamily, SignalRecord, SignalTransition,
};
use chrono::{Local, NaiveDateTime};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-ticker signal history, safe to share across threads.
pub struct SignalHistoryTracker {
    path: PathBuf,
    /// Ticker -> records, oldest first.
    records: DashMap<String, Vec<SignalRecord>>,
    max_records: usize,
    horizons: Vec<u32>,
    accuracy_horizon: u32,
    hold_band_pct: f64,
}

impl SignalHistoryTracker {
    /// Create an empty tracker that saves to `config.path`.
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            path: config.path.clone(),
            records: DashMap::new(),
            max_records: config.max_records.max(1),
            horizons: config.horizons.clone(),
            accuracy_horizon: config.accuracy_horizon,
            hold_band_pct: config.hold_band_pct,
        }
    }

    /// Create a tracker and load `config.path` if it exists.
    pub fn from_config(config: &HistoryConfig) -> Self {
        let tracker = Self::new(config);
        tracker.reload();
        tracker
    }

    /// Load history from `path`, keeping the other settings at their defaults.
    ///
    /// A missing or corrupt file yields an empty history.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let config = HistoryConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        };
        Self::from_config(&config)
    }

    fn reload(&self) {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No signal history at {:?}: {}", self.path, e);
                return;
            }
        };

        let parsed: Map<String, Value> = match serde_json::from_str(&replace_non_finite(&content)) {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    "Failed to parse signal history {:?}, starting empty: {}",
                    self.path, e
                );
                return;
            }
        };

        let mut total = 0;
        for (ticker, entries) in parsed {
            let Value::Array(entries) = entries else {
                warn!("Skipping signal history for {}: not a list", ticker);
                continue;
            };
            let mut records = Vec::with_capacity(entries.len());
            for (i, entry) in entries.into_iter().enumerate() {
                match serde_json::from_value::<SignalRecord>(entry) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Skipping signal record {} #{}: {}", ticker, i, e),
                }
            }
            total += records.len();
            self.records.insert(ticker, records);
        }
        info!(
            "Loaded {} signal records for {} tickers from {:?}",
            total,
            self.records.len(),
            self.path
        );
    }

    /// Write the whole history to disk. Failures are returned, not swallowed.
    pub fn save(&self) -> Result<()> {
        let snapshot: BTreeMap<String, Vec<SignalRecord>> = self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let content = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&self.path, content)?;
        info!(
            "Saved signal history for {} tickers to {:?}",
            snapshot.len(),
            self.path
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a signal stamped with the current local time.
    pub fn record(
        &self,
        ticker: &str,
        signal: &str,
        score: f64,
        price: f64,
        metadata: Option<Map<String, Value>>,
    ) {
        self.record_at(ticker, signal, score, price, metadata, Local::now().naive_local());
    }

    /// Append a signal stamped with `at`, evicting the oldest beyond the cap.
    pub fn record_at(
        &self,
        ticker: &str,
        signal: &str,
        score: f64,
        price: f64,
        metadata: Option<Map<String, Value>>,
        at: NaiveDateTime,
    ) {
        let record = SignalRecord::new(at, signal, score, price, metadata.unwrap_or_default());
        let mut entry = self.records.entry(ticker.to_string()).or_default();
        entry.push(record);

        let overflow = entry.len().saturating_sub(self.max_records);
        if overflow > 0 {
            entry.drain(..overflow);
        }
        debug!("Recorded {} for {} ({} kept)", signal, ticker, entry.len());
    }

    /// Backfill the configured horizons using the current local time.
    pub fn backfill(&self, ticker: &str, current_price: f64) -> usize {
        self.backfill_at(ticker, current_price, &self.horizons, Local::now().naive_local())
    }

    /// Fill missing `performance_{N}d` fields on records at least N days old.
    ///
    /// Returns the number of fields written. Existing fields are left alone.
    pub fn backfill_at(
        &self,
        ticker: &str,
        current_price: f64,
        horizons: &[u32],
        now: NaiveDateTime,
    ) -> usize {
        if !current_price.is_finite() || current_price <= 0.0 {
            warn!("Skipping backfill for {}: bad current price {}", ticker, current_price);
            return 0;
        }

        let Some(mut records) = self.records.get_mut(ticker) else {
            return 0;
        };

        let mut written = 0;
        for record in records.iter_mut() {
            let Some(recorded_at) = record.recorded_at() else {
                warn!("Unparsable timestamp '{}' for {}", record.timestamp, ticker);
                continue;
            };
            if !record.price.is_finite() || record.price <= 0.0 {
                continue;
            }

            let days_passed = (now - recorded_at).num_days();
            for &days in horizons {
                if days_passed >= i64::from(days) && !record.has_performance(days) {
                    let performance = (current_price - record.price) / record.price * 100.0;
                    record.set_performance(days, performance);
                    written += 1;
                }
            }
        }

        if written > 0 {
            debug!("Backfilled {} performance values for {}", written, ticker);
        }
        written
    }

    fn is_correct(&self, signal: &str, return_pct: f64) -> bool {
        match Recommendation::from_str(signal).map(|r| r.family()) {
            Some(SignalFamily::Bullish) => return_pct > 0.0,
            Some(SignalFamily::Bearish) => return_pct < 0.0,
            Some(SignalFamily::Neutral) => return_pct.abs() < self.hold_band_pct,
            None => false,
        }
    }

    /// Accuracy per signal type, using only records with an accuracy-horizon return.
    pub fn accuracy(&self, signal_types: &[&str]) -> Vec<SignalAccuracy> {
        let mut stats: Vec<SignalAccuracy> =
            signal_types.iter().map(|s| SignalAccuracy::new(*s)).collect();

        for entry in self.records.iter() {
            for record in entry.value() {
                let Some(slot) = stats.iter_mut().find(|s| s.signal == record.signal) else {
                    continue;
                };
                if let Some(return_pct) = record.performance(self.accuracy_horizon) {
                    let correct = self.is_correct(&record.signal, return_pct);
                    slot.record_return(return_pct, correct);
                }
            }
        }
        stats
    }

    /// Accuracy for all five recommendation tiers.
    pub fn accuracy_report(&self) -> Vec<SignalAccuracy> {
        let signals: Vec<&str> = Recommendation::ALL.iter().map(|r| r.as_str()).collect();
        self.accuracy(&signals)
    }

    /// Records for a ticker, oldest first; `limit` keeps only the most recent.
    pub fn history(&self, ticker: &str, limit: Option<usize>) -> Vec<SignalRecord> {
        let Some(records) = self.records.get(ticker) else {
            return Vec::new();
        };
        let start = limit
            .filter(|l| *l > 0)
            .map(|l| records.len().saturating_sub(l))
            .unwrap_or(0);
        records[start..].to_vec()
    }

    /// Signal changes between consecutive records of a ticker.
    pub fn transitions(&self, ticker: &str) -> Vec<SignalTransition> {
        let Some(records) = self.records.get(ticker) else {
            return Vec::new();
        };
        records
            .windows(2)
            .filter(|w| w[0].signal != w[1].signal)
            .map(|w| SignalTransition {
                timestamp: w[1].timestamp.clone(),
                from_signal: w[0].signal.clone(),
                to_signal: w[1].signal.clone(),
                price_change: w[1].price - w[0].price,
                score_change: w[1].score - w[0].score,
            })
            .collect()
    }

    /// Tickers with at least one record, sorted.
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        tickers.sort();
        tickers
    }

    pub fn len(&self, ticker: &str) -> usize {
        self.records.get(ticker).map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.records.iter().all(|e| e.value().is_empty())
    }
}

/// Rewrite bare `NaN`, `Infinity` and `-Infinity` literals outside strings as
/// `null`. Some JSON writers emit them although they are not valid JSON.
fn replace_non_finite(content: &str) -> String {
    const LITERALS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    let mut out = String::with_capacity(content.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = content;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(literal) = LITERALS.iter().find(|l| rest.starts_with(**l)) {
            out.push_str("null");
            rest = &rest[literal.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use tempfile::TempDir;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn tracker(dir: &TempDir) -> SignalHistoryTracker {
        SignalHistoryTracker::load(dir.path().join("history.json"))
    }

    #[test]
    fn test_record_and_history_limit() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        for i in 0..5 {
            tracker.record_at("TSLA", "BUY", 4.0, 100.0 + i as f64, None, at(1));
        }
        assert_eq!(tracker.len("TSLA"), 5);
        let recent = tracker.history("TSLA", Some(2));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].price, 104.0);
        assert!(tracker.history("NOPE", None).is_empty());
    }

    #[test]
    fn test_backfill_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.record_at("FSLR", "BUY", 4.0, 100.0, None, at(1));

        assert_eq!(tracker.backfill_at("FSLR", 110.0, &[1, 7, 30], at(9)), 2);
        // later price changes never rewrite an existing value
        assert_eq!(tracker.backfill_at("FSLR", 50.0, &[1, 7, 30], at(10)), 0);

        let record = &tracker.history("FSLR", None)[0];
        assert!((record.performance(1).unwrap() - 10.0).abs() < 1e-9);
        assert!((record.performance(7).unwrap() - 10.0).abs() < 1e-9);
        assert!(!record.has_performance(30));
    }

    #[test]
    fn test_backfill_skips_bad_price() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.record_at("X", "BUY", 4.0, 0.0, None, at(1));
        assert_eq!(tracker.backfill_at("X", 10.0, &[1], at(5)), 0);
        tracker.record_at("Y", "BUY", 4.0, 10.0, None, at(1));
        assert_eq!(tracker.backfill_at("Y", f64::NAN, &[1], at(5)), 0);
    }

    #[test]
    fn test_accuracy_rules() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let start = at(1);
        let later = start + Duration::days(8);

        tracker.record_at("A", "BUY", 4.0, 100.0, None, start);
        tracker.backfill_at("A", 105.0, &[7], later);

        tracker.record_at("B", "SELL", 2.0, 100.0, None, start);
        tracker.backfill_at("B", 105.0, &[7], later);

        tracker.record_at("C", "HOLD", 3.0, 100.0, None, start);
        tracker.backfill_at("C", 101.0, &[7], later);

        // no 7d value yet: ignored
        tracker.record_at("D", "BUY", 4.0, 100.0, None, later);

        let report = tracker.accuracy(&["BUY", "SELL", "HOLD"]);
        assert_eq!(report[0].total, 1);
        assert_eq!(report[0].correct, 1);
        assert_eq!(report[1].correct, 0);
        assert_eq!(report[1].win_rate, 1.0);
        assert_eq!(report[2].correct, 1);
    }

    #[test]
    fn test_transitions() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.record_at("T", "HOLD", 3.0, 10.0, None, at(1));
        tracker.record_at("T", "HOLD", 3.1, 11.0, None, at(2));
        tracker.record_at("T", "BUY", 3.6, 12.5, None, at(3));

        let transitions = tracker.transitions("T");
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].from_signal, "HOLD");
        assert_eq!(transitions[0].to_signal, "BUY");
        assert!((transitions[0].price_change - 1.5).abs() < 1e-9);
        assert!((transitions[0].score_change - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_report_covers_all_tiers() {
        let dir = TempDir::new().unwrap();
        let report = tracker(&dir).accuracy_report();
        let signals: Vec<&str> = report.iter().map(|s| s.signal.as_str()).collect();
        assert_eq!(signals, vec!["STRONG_BUY", "BUY", "HOLD", "SELL", "STRONG_SELL"]);
        assert!(report.iter().all(|s| s.total == 0 && s.accuracy == 0.0));
    }

    #[test]
    fn test_replace_non_finite_leaves_strings_alone() {
        let raw = r#"{"a": NaN, "b": -Infinity, "c": [Infinity], "note": "NaN \" Infinity"}"#;
        let value: Value = serde_json::from_str(&replace_non_finite(raw)).unwrap();
        assert_eq!(value["a"], Value::Null);
        assert_eq!(value["b"], Value::Null);
        assert_eq!(value["c"][0], Value::Null);
        assert_eq!(value["note"], "NaN \" Infinity");
    }
}
