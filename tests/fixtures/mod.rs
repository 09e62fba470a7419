//! Sample CVs and profiles shared by the integration and E2E suites

use cv_matcher::models::cv::{Cv, Education, WorkExperience};
use cv_matcher::models::profile::{
    PostalCodeRange, Profile, ProfileDriversLicense, ProfileEducation, ProfileProfession,
    ProfileSendEmailData,
};
use serde_json::json;
use uuid::Uuid;

/// A CV together with the profiles it is expected to match
#[derive(Debug, Clone)]
pub struct ScanFixture {
    pub reference_number: &'static str,
    pub zip: &'static str,
    pub education: Option<(&'static str, bool)>,
    pub preferred_job: Option<&'static str>,
    pub drivers_license: Option<&'static str>,
    /// Names of the profiles in [`sample_profiles`] this CV must match
    pub expected_profiles: &'static [&'static str],
    pub description: &'static str,
}

pub const SCAN_FIXTURES: &[ScanFixture] = &[
    ScanFixture {
        reference_number: "fixture-cook-rotterdam",
        zip: "3011AB",
        education: Some(("MBO Koken", true)),
        preferred_job: Some("Kok"),
        drivers_license: None,
        expected_profiles: &["Koks Rotterdam"],
        description: "Diplomaed cook inside the Rotterdam range",
    },
    ScanFixture {
        reference_number: "fixture-cook-typo",
        zip: "3050",
        education: Some(("MBO Kokem", true)),
        preferred_job: None,
        drivers_license: None,
        expected_profiles: &["Koks Rotterdam"],
        description: "Education name with a single typo still matches",
    },
    ScanFixture {
        reference_number: "fixture-cook-unfinished",
        zip: "3011AB",
        education: Some(("MBO Koken", false)),
        preferred_job: None,
        drivers_license: None,
        expected_profiles: &[],
        description: "Unfinished education does not satisfy a must-finish profile",
    },
    ScanFixture {
        reference_number: "fixture-driver-utrecht",
        zip: "3511XX",
        education: None,
        preferred_job: Some("Chauffeur"),
        drivers_license: Some("C"),
        expected_profiles: &["Chauffeurs Midden", "Heftruck Landelijk"],
        description: "Driver matching a ranged profile and a nationwide profile",
    },
    ScanFixture {
        reference_number: "fixture-driver-no-license",
        zip: "3511XX",
        education: None,
        preferred_job: Some("Chauffeur"),
        drivers_license: None,
        expected_profiles: &[],
        description: "Required license missing",
    },
    ScanFixture {
        reference_number: "fixture-bad-zip",
        zip: "AAAAAA",
        education: None,
        preferred_job: Some("Chauffeur"),
        drivers_license: Some("C"),
        expected_profiles: &["Heftruck Landelijk"],
        description: "Unparseable postal code only fails ranged profiles",
    },
];

impl ScanFixture {
    pub fn cv(&self) -> Cv {
        let mut cv = Cv {
            reference_number: self.reference_number.to_string(),
            ..Default::default()
        };
        cv.personal_details.zip = self.zip.to_string();
        if let Some((name, has_diploma)) = self.education {
            cv.educations.push(Education {
                name: name.to_string(),
                has_diploma,
                ..Default::default()
            });
        }
        if let Some(job) = self.preferred_job {
            cv.preferred_jobs.push(job.to_string());
            cv.work_experiences.push(WorkExperience {
                profession: job.to_string(),
                ..Default::default()
            });
        }
        if let Some(license) = self.drivers_license {
            cv.drivers_licenses.push(license.to_string());
        }
        cv
    }

    /// Request body for the scan endpoint
    pub fn scan_body(&self, debug: bool) -> serde_json::Value {
        json!({ "cv": self.cv(), "debug": debug })
    }
}

fn mail(email: &str) -> ProfileSendEmailData {
    ProfileSendEmailData {
        email: email.to_string(),
    }
}

/// Matchable profiles covering education, profession, license and postal code criteria
pub fn sample_profiles() -> Vec<Profile> {
    let mut cooks = Profile {
        id: Uuid::new_v4(),
        name: "Koks Rotterdam".to_string(),
        active: true,
        must_education: true,
        must_education_finished: true,
        educations: vec![ProfileEducation {
            name: "MBO Koken".to_string(),
        }],
        zip_codes: vec![PostalCodeRange::new(3000, 3099)],
        ..Default::default()
    };
    cooks.on_match.send_mail.push(mail("hr@restaurant.example"));

    let mut drivers = Profile {
        id: Uuid::new_v4(),
        name: "Chauffeurs Midden".to_string(),
        active: true,
        must_drivers_license: true,
        drivers_licenses: vec![ProfileDriversLicense {
            name: "C".to_string(),
        }],
        desired_professions: vec![ProfileProfession {
            name: "Chauffeur".to_string(),
        }],
        zip_codes: vec![PostalCodeRange::new(3599, 3500)],
        ..Default::default()
    };
    drivers.on_match.send_mail.push(mail("planning@transport.example"));

    let mut forklift = Profile {
        id: Uuid::new_v4(),
        name: "Heftruck Landelijk".to_string(),
        active: true,
        drivers_licenses: vec![ProfileDriversLicense {
            name: "C".to_string(),
        }],
        ..Default::default()
    };
    forklift.on_match.send_mail.push(mail("jobs@warehouse.example"));

    let mut retired = cooks.clone();
    retired.id = Uuid::new_v4();
    retired.name = "Koks Archief".to_string();
    retired.active = false;

    vec![cooks, drivers, forklift, retired]
}
