use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::hook::HttpMethod;

/// A client's hiring criteria, evaluated against every incoming CV.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub domains: Vec<String>,

    pub must_desired_profession: bool,
    pub desired_professions: Vec<ProfileProfession>,

    pub years_since_work: Option<i32>,
    pub must_exp_profession: bool,
    pub profession_experienced: Vec<ProfileProfession>,

    pub must_drivers_license: bool,
    pub drivers_licenses: Vec<ProfileDriversLicense>,

    pub must_education_finished: bool,
    pub must_education: bool,
    pub years_since_education: i32,
    pub educations: Vec<ProfileEducation>,

    #[serde(rename = "zipCodes")]
    pub zip_codes: Vec<PostalCodeRange>,

    /// Also receive bulk CV lists matched on postal code alone.
    pub lists_allowed: bool,

    pub on_match: ProfileOnMatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileProfession {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileDriversLicense {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileEducation {
    pub name: String,
}

/// Dutch postal-code range limited to the four digit part.
///
/// Ranges may be stored reversed (`from > to`); both orders cover the same codes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostalCodeRange {
    pub from: u16,
    pub to: u16,
}

impl PostalCodeRange {
    pub fn new(from: u16, to: u16) -> Self {
        Self { from, to }
    }

    /// A `{0, 0}` range is an unfilled form entry and never matches.
    pub fn is_unset(&self) -> bool {
        self.from == 0 && self.to == 0
    }

    pub fn contains(&self, code: u32) -> bool {
        let low = u32::from(self.from.min(self.to));
        let high = u32::from(self.from.max(self.to));
        low <= code && code <= high
    }
}

/// What should happen when this profile matches a CV.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileOnMatch {
    pub send_mail: Vec<ProfileSendEmailData>,
    pub http_call: Vec<ProfileHttpCallData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSendEmailData {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileHttpCallData {
    pub uri: String,
    #[serde(default)]
    pub method: HttpMethod,
}

impl Profile {
    /// Whether the profile can produce a useful match: it is active, declares at
    /// least one education/profession/license criterion and has somewhere to send
    /// the match to.
    pub fn is_matchable(&self) -> bool {
        let has_criteria = !self.desired_professions.is_empty()
            || !self.profession_experienced.is_empty()
            || !self.drivers_licenses.is_empty()
            || !self.educations.is_empty();
        let has_action = !self.on_match.send_mail.is_empty() || !self.on_match.http_call.is_empty();

        self.active && has_criteria && has_action
    }

    /// Whether CV lists are matched against this profile.
    pub fn is_list_profile(&self) -> bool {
        self.active && self.lists_allowed && self.zip_codes.iter().any(|range| !range.is_unset())
    }
}
