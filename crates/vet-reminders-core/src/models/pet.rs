//! Pet registry models. Owned by the clinic's registry; read-only here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A pet as seen by the reminder engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    /// Species (e.g., "dog", "cat")
    pub species: String,
    /// Date of birth; pets without one are never evaluated
    pub date_of_birth: Option<NaiveDate>,
    pub owner_id: i64,
}

impl Pet {
    /// Get the canonical species name (lowercase).
    pub fn canonical_species(&self) -> String {
        self.species.trim().to_lowercase()
    }
}

/// A pet owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    pub id: i64,
    /// Display name used in the greeting
    pub name: String,
    pub email: Option<String>,
}

impl Owner {
    /// The address to notify, if the owner has a usable one.
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
