//! Profile and household record types
//!
//! A [`Profile`] row exists 1:1 for every registered identity. It is created
//! by a backend trigger at registration time, never by this library; whisker
//! only reads it. Field names match the backing table columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a profile within its household
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages the household and approves members
    Admin,
    /// Standard household member
    User,
    /// Registered but awaiting approval
    Pending,
}

/// Application-level user record, keyed 1:1 by identity id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Foreign key to the identity provider's account id
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    /// Household this profile belongs to
    pub household_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tenancy group scoping profiles and (future) care events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
