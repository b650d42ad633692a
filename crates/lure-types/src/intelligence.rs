//! Intelligence report and final submission types.
//!
//! `IntelligenceReport` is the validated shape of the extraction model's
//! output. Every list field is always present (possibly empty) so consumers
//! can iterate without null checks. `FinalResult` is the payload posted to
//! the external evaluation sink.

use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::chat::SessionId;

/// Summary used when the extraction output could not be parsed at all.
pub const UNABLE_TO_ANALYZE: &str = "Unable to analyze conversation.";

/// `agentNotes` value submitted when the report carries no summary.
pub const AGENT_NOTES_PLACEHOLDER: &str = "No notes recorded for this session.";

/// Severity of the detected threat, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatLevel::Low => write!(f, "low"),
            ThreatLevel::Medium => write!(f, "medium"),
            ThreatLevel::High => write!(f, "high"),
            ThreatLevel::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for ThreatLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ThreatLevel::Low),
            "medium" => Ok(ThreatLevel::Medium),
            "high" => Ok(ThreatLevel::High),
            "critical" => Ok(ThreatLevel::Critical),
            other => Err(format!("invalid threat level: '{other}'")),
        }
    }
}

/// The evidence categories an extraction fills in.
///
/// The category set is configuration, not protocol: two presets ship, and a
/// deployment may list its own keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet(Vec<String>);

impl CategorySet {
    pub const BANK_ACCOUNTS: &'static str = "bankAccounts";
    pub const UPI_IDS: &'static str = "upiIds";
    pub const PHISHING_LINKS: &'static str = "phishingLinks";
    pub const PHONE_NUMBERS: &'static str = "phoneNumbers";
    pub const SUSPICIOUS_KEYWORDS: &'static str = "suspiciousKeywords";
    pub const EMAILS: &'static str = "emails";
    pub const URLS: &'static str = "urls";
    pub const CRYPTO_WALLETS: &'static str = "cryptoWallets";
    pub const NAMES: &'static str = "names";
    pub const ORGANIZATIONS: &'static str = "organizations";

    /// Build a set from arbitrary keys. Duplicates and blank keys are dropped.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into().trim().to_string();
            if !key.is_empty() && !out.contains(&key) {
                out.push(key);
            }
        }
        Self(out)
    }

    /// Categories expected by the evaluation callback.
    pub fn submission() -> Self {
        Self::new([
            Self::BANK_ACCOUNTS,
            Self::UPI_IDS,
            Self::PHISHING_LINKS,
            Self::PHONE_NUMBERS,
            Self::SUSPICIOUS_KEYWORDS,
        ])
    }

    /// Broader set covering contact details and named entities.
    pub fn extended() -> Self {
        Self::new([
            Self::BANK_ACCOUNTS,
            Self::UPI_IDS,
            Self::PHONE_NUMBERS,
            Self::EMAILS,
            Self::URLS,
            Self::CRYPTO_WALLETS,
            Self::NAMES,
            Self::ORGANIZATIONS,
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::submission()
    }
}

/// Category-keyed evidence lists, in configured category order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedIntelligence(Vec<(String, Vec<String>)>);

impl ExtractedIntelligence {
    /// Every category of `categories` present with an empty list.
    pub fn empty(categories: &CategorySet) -> Self {
        Self(
            categories
                .iter()
                .map(|key| (key.to_string(), Vec::new()))
                .collect(),
        )
    }

    /// Evidence for one category; empty when the category is unknown.
    pub fn get(&self, category: &str) -> &[String] {
        self.0
            .iter()
            .find(|(key, _)| key == category)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the evidence list of a category. A new category goes last.
    pub fn insert(&mut self, category: impl Into<String>, values: Vec<String>) {
        let category = category.into();
        match self.0.iter_mut().find(|(key, _)| *key == category) {
            Some(entry) => entry.1 = values,
            None => self.0.push((category, values)),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of evidence values across all categories.
    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, values)| values.len()).sum()
    }

    /// True when no category holds any evidence.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Serialize for ExtractedIntelligence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, values) in &self.0 {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtractedIntelligence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EvidenceVisitor;

        impl<'de> Visitor<'de> for EvidenceVisitor {
            type Value = ExtractedIntelligence;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category to evidence list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = ExtractedIntelligence::default();
                while let Some((key, values)) = access.next_entry::<String, Vec<String>>()? {
                    out.insert(key, values);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(EvidenceVisitor)
    }
}

/// Validated result of one intelligence extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceReport {
    pub is_scam: bool,
    pub scam_type: Option<String>,
    pub threat_level: ThreatLevel,
    /// 0-100.
    pub confidence: u8,
    pub extracted_data: ExtractedIntelligence,
    pub indicators: Vec<String>,
    pub summary: String,
    /// Brief notes about the tactics observed.
    #[serde(default)]
    pub agent_notes: String,
}

impl IntelligenceReport {
    /// The report used when the model output cannot be parsed.
    pub fn fallback(categories: &CategorySet) -> Self {
        Self {
            is_scam: false,
            scam_type: None,
            threat_level: ThreatLevel::Low,
            confidence: 0,
            extracted_data: ExtractedIntelligence::empty(categories),
            indicators: Vec::new(),
            summary: UNABLE_TO_ANALYZE.to_string(),
            agent_notes: String::new(),
        }
    }
}

/// Payload submitted to the evaluation callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub session_id: SessionId,
    pub scam_detected: bool,
    pub total_messages_exchanged: u32,
    pub extracted_intelligence: ExtractedIntelligence,
    pub agent_notes: String,
}

impl FinalResult {
    /// Derive the payload from the current report and message count.
    pub fn from_report(
        session_id: SessionId,
        total_messages_exchanged: u32,
        report: &IntelligenceReport,
    ) -> Self {
        let agent_notes = if report.summary.trim().is_empty() {
            AGENT_NOTES_PLACEHOLDER.to_string()
        } else {
            report.summary.clone()
        };

        Self {
            session_id,
            scam_detected: report.is_scam,
            total_messages_exchanged,
            extracted_intelligence: report.extracted_data.clone(),
            agent_notes,
        }
    }
}

/// Outcome of a final-result submission, returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub message: String,
    /// Body returned by the sink, when it sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}
