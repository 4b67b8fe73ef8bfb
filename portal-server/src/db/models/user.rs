//! User (Customer) Model

use serde::{Deserialize, Serialize};

/// Customer entity, read-only to this core.
///
/// `company` participates in report display-name resolution; retail
/// accounts leave it unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub phone: String,
}
