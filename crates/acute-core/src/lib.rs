use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod feed;
pub mod identity;
pub mod layout;
pub mod reconcile;

pub use feed::{Feed, FeedChange, FeedConfig, FeedHealth};
pub use identity::IdentityNormalizer;
pub use layout::{LayoutController, REFERENCE_BREAKPOINT_PX};
pub use reconcile::{reconcile, SelectionUpdate, VanishedPolicy};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryKeyError {
    #[error("summary key cannot be empty")]
    Empty,
}

/// Logical key used to match a case across polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryKey(String);

impl SummaryKey {
    pub fn new(value: impl Into<String>) -> Result<Self, SummaryKeyError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SummaryKeyError::Empty);
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SummaryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SummaryKey {
    type Err = SummaryKeyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Processing,
    Completed,
    Live,
}

impl Default for SummaryStatus {
    fn default() -> Self {
        Self::Processing
    }
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Processing => "processing",
            SummaryStatus::Completed => "completed",
            SummaryStatus::Live => "live",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SummaryStatus::Processing => "Processing",
            SummaryStatus::Completed => "Completed",
            SummaryStatus::Live => "Live",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "processing" | "pending" => Ok(SummaryStatus::Processing),
            "completed" | "complete" | "done" => Ok(SummaryStatus::Completed),
            "live" => Ok(SummaryStatus::Live),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CriticalInformation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub condition: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medication {
    #[serde(default, deserialize_with = "null_as_default")]
    pub medication: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allergy {
    #[serde(default, deserialize_with = "null_as_default")]
    pub allergy_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: String,
}

/// Patient journal; each section is independently optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicalJournal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_information: Option<Vec<CriticalInformation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<Vec<Medication>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergy_information: Option<Vec<Allergy>>,
}

impl MedicalJournal {
    pub fn critical_information(&self) -> &[CriticalInformation] {
        self.critical_information.as_deref().unwrap_or_default()
    }

    pub fn current_medications(&self) -> &[Medication] {
        self.current_medications.as_deref().unwrap_or_default()
    }

    pub fn allergy_information(&self) -> &[Allergy] {
        self.allergy_information.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.critical_information().is_empty()
            && self.current_medications().is_empty()
            && self.allergy_information().is_empty()
    }
}

/// A case summary exactly as the remote collection serves it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSummary {
    #[serde(
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        rename = "_id",
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ambulance_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_events: Option<Vec<TimelineEvent>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub medical_journal: MedicalJournal,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body of a create request: a summary without identity fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewSummary {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub ambulance_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_events: Option<Vec<TimelineEvent>>,
    #[serde(default)]
    pub medical_journal: MedicalJournal,
    #[serde(default)]
    pub status: SummaryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
}

/// Partial update; absent fields are left untouched by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambulance_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_events: Option<Vec<TimelineEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_journal: Option<MedicalJournal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SummaryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
}

impl SummaryPatch {
    pub fn is_empty(&self) -> bool {
        self == &SummaryPatch::default()
    }
}

/// A normalized case summary with exactly one logical key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub key: SummaryKey,
    pub legacy_id: Option<String>,
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub ambulance_notes: String,
    pub timeline_events: Vec<TimelineEvent>,
    pub medical_journal: MedicalJournal,
    pub status: SummaryStatus,
    pub ai_summary: Option<String>,
    pub extra: HashMap<String, Value>,
}

impl Summary {
    pub fn is_live(&self) -> bool {
        self.status == SummaryStatus::Live
    }

    pub fn is_processing(&self) -> bool {
        self.status == SummaryStatus::Processing
    }

    /// Converts back to the wire shape, carrying the logical key as `id`.
    pub fn to_raw(&self) -> RawSummary {
        RawSummary {
            id: Some(self.key.to_string()),
            legacy_id: self.legacy_id.clone(),
            title: self.title.clone(),
            date: self
                .date
                .map(|date| date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .unwrap_or_default(),
            ambulance_notes: self.ambulance_notes.clone(),
            timeline_events: Some(self.timeline_events.clone()),
            medical_journal: self.medical_journal.clone(),
            status: Some(self.status.as_str().to_string()),
            ai_summary: self.ai_summary.clone(),
            extra: self.extra.clone(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize an ID that can be a string, a number or null
fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        _ => Err(serde::de::Error::custom("expected string or number for id")),
    }
}

fn deserialize_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}
