use chrono::{DateTime, Duration, Months, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// A scraped curriculum vitae as submitted by a scraper.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Cv {
    #[garde(length(min = 1))]
    pub reference_number: String,

    #[garde(custom(not_after_tomorrow))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[garde(custom(not_after_tomorrow))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<DateTime<Utc>>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub educations: Vec<Education>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<Course>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_experiences: Vec<WorkExperience>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_jobs: Vec<String>,

    #[garde(dive)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<Language>,

    #[garde(dive)]
    #[serde(default)]
    pub personal_details: PersonalDetails,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drivers_licenses: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub name: String,
    pub description: String,
    pub institute: String,
    pub is_completed: bool,
    pub has_diploma: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Course {
    pub name: String,
    pub institute: String,
    pub description: String,
    pub is_completed: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkExperience {
    pub description: String,
    pub profession: String,
    pub employer: String,
    pub still_employed: bool,
    pub weekly_hours_worked: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Spoken/written level: 0 unknown, 1 reasonable, 2 good, 3 excellent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    #[garde(skip)]
    pub name: String,

    #[garde(range(max = 3))]
    #[serde(default)]
    pub level_spoken: u8,

    #[garde(range(max = 3))]
    #[serde(default)]
    pub level_written: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDetails {
    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub initials: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_name: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sur_name_prefix: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sur_name: String,

    #[garde(custom(old_enough_to_work))]
    #[serde(default, rename = "dob", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zip: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone_number: String,
}

/// Minimum age for a CV to be accepted.
const MINIMUM_WORKING_AGE_YEARS: u32 = 13;

fn not_after_tomorrow(value: &Option<DateTime<Utc>>, _ctx: &()) -> garde::Result {
    match value {
        Some(at) if *at > Utc::now() + Duration::days(1) => {
            Err(garde::Error::new("can't be in the future"))
        }
        _ => Ok(()),
    }
}

fn old_enough_to_work(value: &Option<DateTime<Utc>>, _ctx: &()) -> garde::Result {
    let Some(dob) = value else {
        return Ok(());
    };
    let youngest_allowed = Utc::now()
        .checked_sub_months(Months::new(MINIMUM_WORKING_AGE_YEARS * 12))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    if *dob > youngest_allowed {
        return Err(garde::Error::new(format!(
            "you need to be at least {MINIMUM_WORKING_AGE_YEARS} years old to work"
        )));
    }
    Ok(())
}

impl Cv {
    /// First name, optional surname prefix and surname joined by spaces.
    pub fn full_name(&self) -> String {
        let details = &self.personal_details;
        [
            details.first_name.as_str(),
            details.sur_name_prefix.as_str(),
            details.sur_name.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Leading digits of a Dutch postal code, naming the city and area.
const POSTAL_CODE_DIGITS: usize = 4;

impl PersonalDetails {
    /// City and area part of the postal code, `4100` for `"4100AB"`.
    pub fn postal_code_number(&self) -> Option<u32> {
        self.zip.get(..POSTAL_CODE_DIGITS)?.parse().ok()
    }
}
