//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One demo-access grant: an email tied to a token, remaining attempts,
/// and an expiry. Created on first access request per email.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessGrant {
    pub guid: String,
    pub email: String,
    pub access_token: String,
    pub attempts_remaining: i64,
    pub expires_at: DateTime<Utc>,
    pub pre_ordered: bool,
    pub accumulated_cost: f64,
}

impl AccessGrant {
    /// True once the grant's expiry has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// A grant is usable while attempts remain and it has not expired
    pub fn can_attempt(&self, now: DateTime<Utc>) -> bool {
        self.attempts_remaining > 0 && !self.is_expired(now)
    }
}

/// Append-only record of one scoring call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PronunciationLog {
    pub guid: String,
    pub email: String,
    pub phrase: String,
    pub score: i64,
    pub estimated_cost: f64,
    pub client_ip: Option<String>,
    pub feedback: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Where a captured lead came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    DemoComplete,
    EmailCapture,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::DemoComplete => "demo_complete",
            LeadSource::EmailCapture => "email_capture",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "demo_complete" => Some(LeadSource::DemoComplete),
            "email_capture" => Some(LeadSource::EmailCapture),
            _ => None,
        }
    }
}

/// Captured marketing lead, upserted by email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoLead {
    pub guid: String,
    pub email: String,
    pub first_name: Option<String>,
    pub source: LeadSource,
    pub demo_score: Option<f64>,
}
