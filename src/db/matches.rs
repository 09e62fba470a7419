use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::db::{queries, StoreError};
use crate::models::hook::OnMatchHook;
use crate::models::matches::{Match, MatchDetail};
use crate::models::profile::PostalCodeRange;
use crate::services::processor::{HookRegistry, MatchStore};

/// Postgres caps a statement at 65535 bind parameters.
const INSERT_CHUNK: usize = 2000;

pub async fn find_by_reference_nr(
    pool: &PgPool,
    reference_nr: &str,
    key_id: Uuid,
) -> Result<Vec<Match>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, request_id, profile_id, key_id, matched_at, reference_nr, debug,
               domain, years_since_education, education_or_course, desired_profession,
               profession_experienced, years_since_work, drivers_license, zip_from, zip_to
        FROM matches
        WHERE reference_nr = $1 AND key_id = $2
        ORDER BY matched_at
        "#,
    )
    .bind(reference_nr)
    .bind(key_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(match_from_row).collect()
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    let zip_from: Option<i32> = row.try_get("zip_from")?;
    let zip_to: Option<i32> = row.try_get("zip_to")?;
    let zip_code = match (zip_from, zip_to) {
        (Some(from), Some(to)) => Some(PostalCodeRange::new(
            u16::try_from(from).map_err(|e| StoreError::Decode(e.to_string()))?,
            u16::try_from(to).map_err(|e| StoreError::Decode(e.to_string()))?,
        )),
        _ => None,
    };

    Ok(Match {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        profile_id: row.try_get("profile_id")?,
        key_id: row.try_get("key_id")?,
        when: row.try_get("matched_at")?,
        reference_nr: row.try_get("reference_nr")?,
        debug: row.try_get("debug")?,
        detail: MatchDetail {
            domain: row.try_get("domain")?,
            years_since_education: row.try_get("years_since_education")?,
            education_or_course: row.try_get("education_or_course")?,
            desired_profession: row.try_get("desired_profession")?,
            profession_experienced: row.try_get("profession_experienced")?,
            years_since_work: row.try_get("years_since_work")?,
            drivers_license: row.try_get("drivers_license")?,
            zip_code,
        },
    })
}

/// Insert all matches of one batch in a single transaction.
pub async fn insert_matches(pool: &PgPool, matches: &[Match]) -> Result<(), StoreError> {
    if matches.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for chunk in matches.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO matches (id, request_id, profile_id, key_id, matched_at, reference_nr, debug, \
             domain, years_since_education, education_or_course, desired_profession, \
             profession_experienced, years_since_work, drivers_license, zip_from, zip_to) ",
        );
        builder.push_values(chunk, |mut b, m| {
            let zip = m.detail.zip_code;
            b.push_bind(m.id)
                .push_bind(m.request_id)
                .push_bind(m.profile_id)
                .push_bind(m.key_id)
                .push_bind(m.when)
                .push_bind(m.reference_nr.as_str())
                .push_bind(m.debug)
                .push_bind(m.detail.domain.as_deref())
                .push_bind(m.detail.years_since_education)
                .push_bind(m.detail.education_or_course)
                .push_bind(m.detail.desired_profession)
                .push_bind(m.detail.profession_experienced)
                .push_bind(m.detail.years_since_work)
                .push_bind(m.detail.drivers_license)
                .push_bind(zip.map(|z| i32::from(z.from)))
                .push_bind(zip.map(|z| i32::from(z.to)));
        });
        builder.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Postgres backed match persistence and hook registry.
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn find_matches_by_reference_nr(
        &self,
        reference_nr: &str,
        key_id: Uuid,
    ) -> Result<Vec<Match>, StoreError> {
        find_by_reference_nr(&self.pool, reference_nr, key_id).await
    }

    async fn insert_matches(&self, matches: &[Match]) -> Result<(), StoreError> {
        insert_matches(&self.pool, matches).await
    }
}

#[async_trait]
impl HookRegistry for PgMatchStore {
    async fn enabled_hooks(&self) -> Result<Vec<OnMatchHook>, StoreError> {
        queries::list_enabled_hooks(&self.pool).await
    }
}
