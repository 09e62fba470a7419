use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyRole {
    /// Can submit scraped CVs.
    Scraper,
    /// Can read match information.
    InformationObtainer,
    /// Used by the dashboard; may run debug scans.
    Dashboard,
    /// May run control operations such as reloading profiles.
    Controller,
    Admin,
}

/// The API key a scraper submits CVs with, resolved from the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperKey {
    pub id: Uuid,
    pub name: String,
    /// Domains the scraper collects from, matched against profile domains.
    pub domains: Vec<String>,
    pub roles: Vec<KeyRole>,
}

impl ScraperKey {
    pub fn has_role(&self, role: KeyRole) -> bool {
        self.roles.contains(&role)
    }
}
