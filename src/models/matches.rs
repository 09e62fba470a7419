use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cv::Cv;
use crate::models::profile::{PostalCodeRange, Profile};

/// Which criteria of a profile contributed to a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    /// The requester domain that satisfied the profile's domain filter.
    pub domain: Option<String>,
    pub years_since_education: bool,
    pub education_or_course: bool,
    pub desired_profession: bool,
    pub profession_experienced: bool,
    pub years_since_work: bool,
    pub drivers_license: bool,
    pub zip_code: Option<PostalCodeRange>,
}

impl MatchDetail {
    /// Human readable list of the reasons behind the match, used in e-mails.
    pub fn describe(&self) -> String {
        let mut reasons = Vec::new();
        if let Some(domain) = &self.domain {
            reasons.push(format!("domain {domain}"));
        }
        if self.years_since_work {
            reasons.push("years since work".to_string());
        }
        if self.years_since_education {
            reasons.push("years since last education".to_string());
        }
        if self.education_or_course {
            reasons.push("education or course".to_string());
        }
        if self.desired_profession {
            reasons.push("desired profession".to_string());
        }
        if self.profession_experienced {
            reasons.push("experienced profession".to_string());
        }
        if self.drivers_license {
            reasons.push("drivers license".to_string());
        }
        if let Some(range) = &self.zip_code {
            reasons.push(format!("postal code in range {} - {}", range.from, range.to));
        }

        match reasons.split_last() {
            None => String::new(),
            Some((last, [])) => last.clone(),
            Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
        }
    }
}

/// A profile that matched, paired with why it matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundMatch {
    pub matches: MatchDetail,
    pub profile: Profile,
}

/// Persisted record that a CV satisfied a profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    pub request_id: Uuid,
    pub profile_id: Uuid,
    /// The scraper key that uploaded the CV.
    pub key_id: Uuid,
    pub when: DateTime<Utc>,
    pub reference_nr: String,
    /// Debug matches come from dashboard test scans and are never dispatched.
    pub debug: bool,
    #[serde(flatten)]
    pub detail: MatchDetail,
}

/// Fields stamped on every record persisted for one batch.
#[derive(Debug, Clone)]
pub struct MatchStamp<'a> {
    pub request_id: Uuid,
    pub key_id: Uuid,
    pub reference_nr: &'a str,
    pub debug: bool,
    pub when: DateTime<Utc>,
}

impl Match {
    pub fn record(found: &FoundMatch, stamp: &MatchStamp<'_>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: stamp.request_id,
            profile_id: found.profile.id,
            key_id: stamp.key_id,
            when: stamp.when,
            reference_nr: stamp.reference_nr.to_string(),
            debug: stamp.debug,
            detail: found.matches.clone(),
        }
    }

    pub fn describe(&self) -> String {
        self.detail.describe()
    }
}

/// Everything the match processor needs for one scanned CV.
#[derive(Debug, Clone)]
pub struct PendingMatchBatch {
    pub matches: Vec<FoundMatch>,
    pub cv: Cv,
    pub key_id: Uuid,
    pub key_name: String,
    pub request_id: Uuid,
    pub debug: bool,
    /// Entered while the batch is processed so background logs keep request context.
    pub span: tracing::Span,
}
