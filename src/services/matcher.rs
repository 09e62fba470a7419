//! Decides which profiles a CV satisfies.
//!
//! Every profile runs through [`CHECKS`] in order. A check only constrains the
//! profile when the profile declares criteria for that category; a configured
//! check that fails rejects the profile and the remaining checks are skipped.
//! Evaluation is pure: no I/O, and "now" is passed in by the caller.

use chrono::{DateTime, Datelike, Months, Utc};

use crate::models::cv::Cv;
use crate::models::matches::{FoundMatch, MatchDetail};
use crate::models::profile::Profile;
use crate::services::text_equivalence::{is_same, normalize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    Reject,
}

/// State shared by the checks while one profile is evaluated.
struct Evaluation<'a> {
    profile: &'a Profile,
    cv: &'a Cv,
    domains: &'a [String],
    domain_parts: &'a [Vec<String>],
    now: DateTime<Utc>,
    detail: MatchDetail,
}

type Check = fn(&mut Evaluation<'_>) -> Outcome;

/// Evaluation order matters: later checks rely on the flags earlier ones set.
const CHECKS: &[(&str, Check)] = &[
    ("active", check_active),
    ("domain", check_domain),
    ("years_since_education", check_years_since_education),
    ("education_or_course", check_education_or_course),
    ("desired_profession", check_desired_profession),
    ("profession_experienced", check_profession_experienced),
    ("years_since_work", check_years_since_work),
    ("drivers_license", check_drivers_license),
    ("at_least_one_optional", check_at_least_one_optional),
    ("postal_code", check_postal_code),
];

/// Match `cv` against `profiles`, returning every active profile it satisfies.
///
/// `domains` are the domains of the scraper key that submitted the CV.
pub fn match_profiles(
    domains: &[String],
    profiles: &[Profile],
    cv: &Cv,
    now: DateTime<Utc>,
) -> Vec<FoundMatch> {
    let domain_parts: Vec<Vec<String>> = domains.iter().map(|d| split_domain(d)).collect();

    profiles
        .iter()
        .filter_map(|profile| {
            let mut evaluation = Evaluation {
                profile,
                cv,
                domains,
                domain_parts: &domain_parts,
                now,
                detail: MatchDetail::default(),
            };

            for (name, check) in CHECKS {
                if check(&mut evaluation) == Outcome::Reject {
                    tracing::trace!(profile_id = %profile.id, check = *name, "profile rejected");
                    return None;
                }
            }

            Some(FoundMatch {
                matches: evaluation.detail,
                profile: profile.clone(),
            })
        })
        .collect()
}

fn split_domain(domain: &str) -> Vec<String> {
    normalize(domain).split('.').map(str::to_string).collect()
}

fn reject_unless(found: bool) -> Outcome {
    if found {
        Outcome::Continue
    } else {
        Outcome::Reject
    }
}

fn check_active(eval: &mut Evaluation<'_>) -> Outcome {
    reject_unless(eval.profile.active)
}

fn check_domain(eval: &mut Evaluation<'_>) -> Outcome {
    if eval.profile.domains.is_empty() || eval.domains.is_empty() {
        return Outcome::Continue;
    }

    for profile_domain in &eval.profile.domains {
        let profile_parts = split_domain(profile_domain);
        if is_wildcard(&profile_parts) {
            eval.detail.domain = Some(eval.domains[0].clone());
            return Outcome::Continue;
        }

        let matched = eval
            .domain_parts
            .iter()
            .position(|requester_parts| domain_parts_match(&profile_parts, requester_parts));
        if let Some(idx) = matched {
            eval.detail.domain = Some(eval.domains[idx].clone());
            return Outcome::Continue;
        }
    }

    Outcome::Reject
}

fn is_wildcard(parts: &[String]) -> bool {
    parts.len() == 1 && parts[0] == "*"
}

fn domain_parts_match(profile_parts: &[String], requester_parts: &[String]) -> bool {
    if is_wildcard(requester_parts) {
        return true;
    }
    profile_parts.len() == requester_parts.len()
        && profile_parts
            .iter()
            .zip(requester_parts)
            .all(|(p, r)| p == "*" || r == "*" || p == r)
}

fn check_years_since_education(eval: &mut Evaluation<'_>) -> Outcome {
    let years = eval.profile.years_since_education;
    if years <= 0 {
        return Outcome::Continue;
    }
    let window = Months::new(u32::try_from(years).map_or(u32::MAX, |y| y.saturating_mul(12)));

    // A window reaching past the calendar keeps every dated entry recent.
    let still_recent = |name: &str, end_date: Option<DateTime<Utc>>| {
        if name.is_empty() {
            return false;
        }
        end_date.is_some_and(|end| {
            end.checked_add_months(window)
                .map_or(true, |expires| expires > eval.now)
        })
    };

    let found = eval
        .cv
        .educations
        .iter()
        .any(|education| still_recent(&education.name, education.end_date))
        || eval
            .cv
            .courses
            .iter()
            .any(|course| still_recent(&course.name, course.end_date));

    eval.detail.years_since_education = found;
    reject_unless(found)
}

fn check_education_or_course(eval: &mut Evaluation<'_>) -> Outcome {
    let profile = eval.profile;
    if profile.educations.is_empty() {
        return Outcome::Continue;
    }

    let wanted: Vec<&str> = profile
        .educations
        .iter()
        .map(|e| e.name.as_str())
        .filter(|name| !name.is_empty())
        .collect();

    let education_found = eval
        .cv
        .educations
        .iter()
        .filter(|education| !education.name.is_empty())
        .filter(|education| education.has_diploma || !profile.must_education_finished)
        .any(|education| wanted.iter().any(|name| is_same(&education.name, name)));

    let found = education_found
        || eval
            .cv
            .courses
            .iter()
            .filter(|course| !course.name.is_empty())
            .any(|course| wanted.iter().any(|name| is_same(&course.name, name)));

    eval.detail.education_or_course = found;
    reject_unless(found || !profile.must_education)
}

/// Whether any non-empty wanted name equals any non-empty candidate after normalizing.
fn any_exact<'a>(
    wanted: impl Iterator<Item = &'a str>,
    candidates: impl Iterator<Item = &'a str>,
) -> bool {
    let candidates: Vec<String> = candidates
        .map(normalize)
        .filter(|name| !name.is_empty())
        .collect();
    wanted
        .map(normalize)
        .filter(|name| !name.is_empty())
        .any(|name| candidates.contains(&name))
}

fn check_desired_profession(eval: &mut Evaluation<'_>) -> Outcome {
    let profile = eval.profile;
    if profile.desired_professions.is_empty() {
        return Outcome::Continue;
    }

    let found = any_exact(
        profile.desired_professions.iter().map(|p| p.name.as_str()),
        eval.cv.preferred_jobs.iter().map(String::as_str),
    );

    eval.detail.desired_profession = found;
    reject_unless(found || !profile.must_desired_profession)
}

fn check_profession_experienced(eval: &mut Evaluation<'_>) -> Outcome {
    let profile = eval.profile;
    if profile.profession_experienced.is_empty() {
        return Outcome::Continue;
    }

    let found = any_exact(
        profile.profession_experienced.iter().map(|p| p.name.as_str()),
        eval.cv.work_experiences.iter().map(|w| w.profession.as_str()),
    );

    eval.detail.profession_experienced = found;
    reject_unless(found || !profile.must_exp_profession)
}

fn check_years_since_work(eval: &mut Evaluation<'_>) -> Outcome {
    let Some(years) = eval.profile.years_since_work.filter(|years| *years > 0) else {
        return Outcome::Continue;
    };

    let last_work_year = eval
        .cv
        .work_experiences
        .iter()
        .filter_map(|work| work.end_date)
        .map(|end| end.year())
        .max()
        .unwrap_or(0);

    if eval.now.year() - years > last_work_year {
        return Outcome::Reject;
    }

    eval.detail.years_since_work = true;
    Outcome::Continue
}

fn check_drivers_license(eval: &mut Evaluation<'_>) -> Outcome {
    let profile = eval.profile;
    if profile.drivers_licenses.is_empty() {
        return Outcome::Continue;
    }

    let found = any_exact(
        profile.drivers_licenses.iter().map(|l| l.name.as_str()),
        eval.cv.drivers_licenses.iter().map(String::as_str),
    );

    eval.detail.drivers_license = found;
    reject_unless(found || !profile.must_drivers_license)
}

/// A profile that declares optional criteria must satisfy at least one of them.
/// Years since work is not part of this rule.
fn check_at_least_one_optional(eval: &mut Evaluation<'_>) -> Outcome {
    let profile = eval.profile;
    let declared = !profile.educations.is_empty()
        || !profile.desired_professions.is_empty()
        || !profile.profession_experienced.is_empty()
        || !profile.drivers_licenses.is_empty();
    if !declared {
        return Outcome::Continue;
    }

    let detail = &eval.detail;
    reject_unless(
        detail.education_or_course
            || detail.desired_profession
            || detail.profession_experienced
            || detail.drivers_license,
    )
}

fn check_postal_code(eval: &mut Evaluation<'_>) -> Outcome {
    let profile = eval.profile;
    if profile.zip_codes.is_empty() {
        return Outcome::Continue;
    }

    let Some(code) = eval.cv.personal_details.postal_code_number() else {
        return Outcome::Reject;
    };

    let matched = profile
        .zip_codes
        .iter()
        .find(|range| !range.is_unset() && range.contains(code));

    eval.detail.zip_code = matched.copied();
    reject_unless(matched.is_some())
}
