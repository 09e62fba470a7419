use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cv::Cv;
use crate::models::matches::FoundMatch;

/// Request body of the scraper scan endpoint.
#[derive(Debug, Deserialize)]
pub struct ScanCvRequest {
    pub cv: Cv,
    #[serde(default)]
    pub debug: bool,
}

/// Response of the scraper scan endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCvResponse {
    pub success: bool,
    pub has_matches: bool,
    /// Only returned for debug scans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<FoundMatch>>,
}

/// Payload posted to global on-match hooks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookMatchedCvData<'a> {
    pub matched_profiles: &'a [FoundMatch],
    pub cv: &'a Cv,
    pub key_id: Uuid,
    pub key_name: &'a str,
    /// True when the call was triggered manually.
    pub is_test: bool,
}

/// Request body of the scraper CV list endpoint.
#[derive(Debug, Deserialize)]
pub struct ScanCvListRequest {
    pub cvs: Vec<Cv>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCvListResponse {
    pub success: bool,
    /// Number of CVs from the list that fell inside a list profile's area.
    pub matched_cvs: usize,
}

/// CVs from one list that matched list profiles on postal code.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvListMatches {
    /// Matched CVs by reference number.
    pub cvs: BTreeMap<String, Cv>,
    /// Matched reference numbers by profile id.
    pub profiles_match_cvs: BTreeMap<Uuid, Vec<String>>,
}

/// Payload posted to global on-match hooks for a matched CV list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookListedCvData<'a> {
    #[serde(flatten)]
    pub matches: &'a CvListMatches,
    pub key_id: Uuid,
    pub key_name: &'a str,
    pub is_test: bool,
}
