//! Maps the two identity fields a record may carry onto one logical key.
//!
//! The canonical `id` wins over the store-assigned `_id`. Records carrying
//! neither get a synthesized key that stays stable for the whole session.

use crate::{RawSummary, Summary, SummaryKey, SummaryStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

pub const FALLBACK_KEY_PREFIX: &str = "local";

#[derive(Debug, Default)]
pub struct IdentityNormalizer {
    fallback_keys: HashMap<(String, usize), SummaryKey>,
    next_sequence: u64,
}

impl IdentityNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: RawSummary) -> Summary {
        self.normalize_with_ordinal(raw, 0)
    }

    /// Normalizes one poll result. Identical keyless records inside the same
    /// snapshot are told apart by their position among equals. Fallback keys
    /// of keyless records missing from the snapshot are forgotten.
    pub fn normalize_snapshot(&mut self, raws: Vec<RawSummary>) -> Vec<Summary> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let summaries: Vec<Summary> = raws
            .into_iter()
            .map(|raw| {
                let ordinal = if declared_key(&raw).is_some() {
                    0
                } else {
                    let counter = seen.entry(identity_fingerprint(&raw)).or_insert(0);
                    let ordinal = *counter;
                    *counter += 1;
                    ordinal
                };
                self.normalize_with_ordinal(raw, ordinal)
            })
            .collect();

        self.fallback_keys.retain(|(fingerprint, ordinal), _| {
            seen.get(fingerprint).is_some_and(|count| ordinal < count)
        });
        summaries
    }

    pub fn fallback_count(&self) -> usize {
        self.fallback_keys.len()
    }

    fn normalize_with_ordinal(&mut self, raw: RawSummary, ordinal: usize) -> Summary {
        let key = match declared_key(&raw) {
            Some(key) => key,
            None => self.fallback_key(&raw, ordinal),
        };
        let status = parse_status(raw.status.as_deref(), &key);
        let date = parse_date(&raw.date, &key);

        Summary {
            key,
            legacy_id: raw.legacy_id.filter(|value| !value.trim().is_empty()),
            title: raw.title,
            date,
            ambulance_notes: raw.ambulance_notes,
            timeline_events: raw.timeline_events.unwrap_or_default(),
            medical_journal: raw.medical_journal,
            status,
            ai_summary: raw.ai_summary,
            extra: raw.extra,
        }
    }

    fn fallback_key(&mut self, raw: &RawSummary, ordinal: usize) -> SummaryKey {
        let slot = (identity_fingerprint(raw), ordinal);
        if let Some(existing) = self.fallback_keys.get(&slot) {
            return existing.clone();
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let key = SummaryKey(format!(
            "{FALLBACK_KEY_PREFIX}-{}-{sequence}",
            Utc::now().timestamp_millis()
        ));
        debug!(key = %key, title = %raw.title, "summary_fallback_key_assigned");
        self.fallback_keys.insert(slot, key.clone());
        key
    }
}

fn declared_key(raw: &RawSummary) -> Option<SummaryKey> {
    raw.id
        .as_deref()
        .and_then(|id| SummaryKey::new(id).ok())
        .or_else(|| {
            raw.legacy_id
                .as_deref()
                .and_then(|id| SummaryKey::new(id).ok())
        })
}

/// Hash of the fields set when a case is reported. Processing rewrites notes,
/// status and summary, so none of those take part.
fn identity_fingerprint(raw: &RawSummary) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(raw.date.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn parse_status(status: Option<&str>, key: &SummaryKey) -> SummaryStatus {
    let Some(value) = status else {
        debug!(key = %key, "summary_status_missing");
        return SummaryStatus::default();
    };
    match value.parse::<SummaryStatus>() {
        Ok(status) => status,
        Err(err) => {
            debug!(key = %key, "summary_status_invalid: {err}");
            SummaryStatus::default()
        }
    }
}

fn parse_date(value: &str, key: &SummaryKey) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(date.with_timezone(&Utc));
    }
    // naive timestamps from the service are UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    debug!(key = %key, date = trimmed, "summary_date_unparseable");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(id: Option<&str>, legacy: Option<&str>, title: &str) -> RawSummary {
        RawSummary {
            id: id.map(str::to_string),
            legacy_id: legacy.map(str::to_string),
            title: title.to_string(),
            date: "2024-11-30T10:15:00Z".to_string(),
            ambulance_notes: "Found unresponsive".to_string(),
            status: Some("processing".to_string()),
            ..RawSummary::default()
        }
    }

    #[test]
    fn canonical_id_wins_over_legacy_id() {
        let mut normalizer = IdentityNormalizer::new();
        let summary = normalizer.normalize(raw(Some("case-1"), Some("65a1"), "Fall"));
        assert_eq!(summary.key.as_str(), "case-1");
        assert_eq!(summary.legacy_id.as_deref(), Some("65a1"));
    }

    #[test]
    fn blank_canonical_id_falls_through_to_legacy() {
        let mut normalizer = IdentityNormalizer::new();
        let summary = normalizer.normalize(raw(Some("  "), Some("65a1"), "Fall"));
        assert_eq!(summary.key.as_str(), "65a1");
    }

    #[test]
    fn keyless_records_get_distinct_fallback_keys() {
        let mut normalizer = IdentityNormalizer::new();
        let first = normalizer.normalize(raw(None, None, "Fall"));
        let second = normalizer.normalize(raw(None, None, "Stroke"));
        assert!(first.key.as_str().starts_with("local-"));
        assert_ne!(first.key, second.key);
        assert_eq!(normalizer.fallback_count(), 2);
    }

    #[test]
    fn fallback_key_is_stable_while_processing_completes() {
        let mut normalizer = IdentityNormalizer::new();
        let before = normalizer.normalize(raw(None, None, "Fall"));

        let mut completed = raw(None, None, "Fall");
        completed.status = Some("completed".to_string());
        completed.ai_summary = Some("Hip fracture suspected".to_string());
        let after = normalizer.normalize(completed);

        assert_eq!(before.key, after.key);
        assert_eq!(after.status, SummaryStatus::Completed);
    }

    #[test]
    fn fallback_key_survives_notes_rewritten_on_completion() {
        let mut normalizer = IdentityNormalizer::new();
        let mut reported = raw(None, None, "Fall");
        reported.ambulance_notes = String::new();
        let before = normalizer.normalize_snapshot(vec![reported]);

        let mut completed = raw(None, None, "Fall");
        completed.ambulance_notes = "Patient conscious".to_string();
        completed.status = Some("completed".to_string());
        let after = normalizer.normalize_snapshot(vec![completed]);

        assert_eq!(before[0].key, after[0].key);
        assert_eq!(after[0].ambulance_notes, "Patient conscious");
    }

    #[test]
    fn fallback_keys_of_departed_records_are_dropped() {
        let mut normalizer = IdentityNormalizer::new();
        let first = normalizer.normalize_snapshot(vec![
            raw(None, None, "Fall"),
            raw(None, None, "Fall"),
            raw(None, None, "Stroke"),
        ]);
        assert_eq!(normalizer.fallback_count(), 3);

        let second = normalizer.normalize_snapshot(vec![raw(None, None, "Fall")]);
        assert_eq!(normalizer.fallback_count(), 1);
        assert_eq!(second[0].key, first[0].key);

        normalizer.normalize_snapshot(vec![raw(Some("case-1"), None, "Fall")]);
        assert_eq!(normalizer.fallback_count(), 0);
    }

    #[test]
    fn identical_keyless_records_in_one_snapshot_stay_distinct() {
        let mut normalizer = IdentityNormalizer::new();
        let first_pass =
            normalizer.normalize_snapshot(vec![raw(None, None, "Fall"), raw(None, None, "Fall")]);
        assert_ne!(first_pass[0].key, first_pass[1].key);

        let second_pass =
            normalizer.normalize_snapshot(vec![raw(None, None, "Fall"), raw(None, None, "Fall")]);
        assert_eq!(first_pass[0].key, second_pass[0].key);
        assert_eq!(first_pass[1].key, second_pass[1].key);
    }

    #[test]
    fn normalizing_a_normalized_record_keeps_its_key() {
        let mut normalizer = IdentityNormalizer::new();
        let fallback = normalizer.normalize(raw(None, None, "Fall"));
        let again = normalizer.normalize(fallback.to_raw());
        assert_eq!(fallback.key, again.key);
        assert_eq!(fallback, again);

        let legacy = normalizer.normalize(raw(None, Some("65a1"), "Burn"));
        assert_eq!(normalizer.normalize(legacy.to_raw()).key, legacy.key);
    }

    #[test]
    fn malformed_fields_degrade_instead_of_failing() {
        let mut normalizer = IdentityNormalizer::new();
        let mut broken = raw(Some("case-9"), None, "Unknown");
        broken.status = Some("archived".to_string());
        broken.date = "yesterday".to_string();
        let summary = normalizer.normalize(broken);

        assert_eq!(summary.status, SummaryStatus::Processing);
        assert_eq!(summary.date, None);
        assert!(summary.timeline_events.is_empty());
    }

    #[test]
    fn naive_service_dates_are_read_as_utc() {
        let mut normalizer = IdentityNormalizer::new();
        let mut record = raw(Some("case-2"), None, "Fall");
        record.date = "2024-11-30T10:15:00.250".to_string();
        let summary = normalizer.normalize(record);
        let expected = Utc
            .with_ymd_and_hms(2024, 11, 30, 10, 15, 0)
            .single()
            .expect("valid timestamp")
            + chrono::Duration::milliseconds(250);
        assert_eq!(summary.date, Some(expected));
    }
}
