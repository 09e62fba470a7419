use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Row};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::api_key::{KeyRole, ScraperKey};
use crate::models::hook::{Header, HttpMethod, OnMatchHook};
use crate::models::profile::Profile;
use crate::services::profile_cache::ProfileSource;

/// Resolve an enabled API key by id.
pub async fn find_scraper_key(pool: &PgPool, key_id: Uuid) -> Result<Option<ScraperKey>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT id, name, domains, roles
        FROM api_keys
        WHERE id = $1 AND enabled
        "#,
    )
    .bind(key_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let roles: Vec<String> = row.try_get("roles")?;
    let roles = roles
        .iter()
        .filter_map(|role| match KeyRole::from_str(role) {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!(key_id = %key_id, role = %role, "Ignoring unknown key role");
                None
            }
        })
        .collect();

    Ok(Some(ScraperKey {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        domains: row.try_get("domains")?,
        roles,
    }))
}

/// Load every active profile that has criteria and an on-match action.
pub async fn list_matchable_profiles(pool: &PgPool) -> Result<Vec<Profile>, StoreError> {
    let mut profiles = list_active_profiles(pool).await?;
    profiles.retain(Profile::is_matchable);
    Ok(profiles)
}

/// Load every active profile that accepts CV lists.
pub async fn list_cv_list_profiles(pool: &PgPool) -> Result<Vec<Profile>, StoreError> {
    let mut profiles = list_active_profiles(pool).await?;
    profiles.retain(Profile::is_list_profile);
    Ok(profiles)
}

/// Documents that no longer deserialize are skipped so one bad profile cannot
/// stop matching for everyone else.
async fn list_active_profiles(pool: &PgPool) -> Result<Vec<Profile>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, active, document
        FROM profiles
        WHERE active
        ORDER BY name, id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut profiles = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.try_get("id")?;
        let document: serde_json::Value = row.try_get("document")?;
        let mut profile: Profile = match serde_json::from_value(document) {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(profile_id = %id, error = %e, "Skipping undecodable profile");
                continue;
            }
        };
        profile.id = id;
        profile.name = row.try_get("name")?;
        profile.active = row.try_get("active")?;
        profiles.push(profile);
    }

    Ok(profiles)
}

/// Hooks that are not disabled.
pub async fn list_enabled_hooks(pool: &PgPool) -> Result<Vec<OnMatchHook>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, key_id, disabled, url, method, add_headers
        FROM on_match_hooks
        WHERE NOT disabled
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<OnMatchHook, StoreError> {
            let method: String = row.try_get("method")?;
            let method = HttpMethod::from_str(&method)
                .map_err(|_| StoreError::Decode(format!("unknown hook method {method}")))?;
            let Json(add_headers): Json<Vec<Header>> = row.try_get("add_headers")?;

            Ok(OnMatchHook {
                id: row.try_get("id")?,
                key_id: row.try_get("key_id")?,
                disabled: row.try_get("disabled")?,
                url: row.try_get("url")?,
                method,
                add_headers,
            })
        })
        .collect()
}

/// A match notification waiting to be rendered and delivered.
#[derive(Debug)]
pub struct OutgoingEmail<'a> {
    pub recipient: &'a str,
    pub subject: String,
    pub body: String,
    pub attachment: Option<&'a [u8]>,
}

pub async fn insert_outgoing_email(pool: &PgPool, email: &OutgoingEmail<'_>) -> Result<Uuid, StoreError> {
    let row = sqlx::query(
        r#"
        INSERT INTO email_outbox (recipient, subject, body, attachment)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(email.recipient)
    .bind(&email.subject)
    .bind(&email.body)
    .bind(email.attachment)
    .fetch_one(pool)
    .await?;

    Ok(row.try_get("id")?)
}

/// Connectivity check for the health endpoint.
pub async fn ping(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileSet {
    Matchable,
    CvLists,
}

/// Postgres backed [`ProfileSource`].
#[derive(Clone)]
pub struct PgProfileSource {
    pool: PgPool,
    set: ProfileSet,
}

impl PgProfileSource {
    /// Profiles individual scans are matched against.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            set: ProfileSet::Matchable,
        }
    }

    /// Profiles CV lists are matched against.
    pub fn cv_lists(pool: PgPool) -> Self {
        Self {
            pool,
            set: ProfileSet::CvLists,
        }
    }
}

#[async_trait]
impl ProfileSource for PgProfileSource {
    async fn load_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        match self.set {
            ProfileSet::Matchable => list_matchable_profiles(&self.pool).await,
            ProfileSet::CvLists => list_cv_list_profiles(&self.pool).await,
        }
    }
}
