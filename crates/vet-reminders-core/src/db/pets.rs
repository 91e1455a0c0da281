//! Pet registry queries.
//!
//! The registry is owned by the clinic's records system; the engine only
//! reads it. Inserts exist for seeding and tests.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_date, parse_date, Database, DbResult};
use crate::models::{Owner, Pet};

impl Database {
    /// Insert an owner.
    pub fn insert_owner(&self, owner: &Owner) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO owners (id, name, email) VALUES (?1, ?2, ?3)",
            params![owner.id, owner.name, owner.email],
        )?;
        Ok(())
    }

    /// Insert a pet.
    pub fn insert_pet(&self, pet: &Pet) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO pets (id, name, species, date_of_birth, owner_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                pet.id,
                pet.name,
                pet.canonical_species(),
                pet.date_of_birth.as_ref().map(format_date),
                pet.owner_id,
            ],
        )?;
        Ok(())
    }

    /// Get a pet by ID.
    pub fn get_pet(&self, pet_id: i64) -> DbResult<Option<Pet>> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, species, date_of_birth, owner_id
                FROM pets
                WHERE id = ?
                "#,
                [pet_id],
                pet_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List pets of a species with a known date of birth, ordered by ID.
    pub fn list_pets_with_dob(&self, species: &str) -> DbResult<Vec<Pet>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, species, date_of_birth, owner_id
            FROM pets
            WHERE species = ? AND date_of_birth IS NOT NULL
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([species.trim().to_lowercase()], pet_row)?;

        let mut pets = Vec::new();
        for row in rows {
            pets.push(row?.try_into()?);
        }
        Ok(pets)
    }

    /// Get an owner by ID.
    pub fn get_owner(&self, owner_id: i64) -> DbResult<Option<Owner>> {
        self.conn
            .query_row(
                "SELECT id, name, email FROM owners WHERE id = ?",
                [owner_id],
                owner_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all owners.
    pub fn list_owners(&self) -> DbResult<Vec<Owner>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email FROM owners ORDER BY id")?;
        let rows = stmt.query_map([], owner_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Intermediate row struct for database mapping.
struct PetRow {
    id: i64,
    name: String,
    species: String,
    date_of_birth: Option<String>,
    owner_id: i64,
}

fn pet_row(row: &Row<'_>) -> rusqlite::Result<PetRow> {
    Ok(PetRow {
        id: row.get(0)?,
        name: row.get(1)?,
        species: row.get(2)?,
        date_of_birth: row.get(3)?,
        owner_id: row.get(4)?,
    })
}

impl TryFrom<PetRow> for Pet {
    type Error = super::DbError;

    fn try_from(row: PetRow) -> Result<Self, Self::Error> {
        Ok(Pet {
            id: row.id,
            name: row.name,
            species: row.species,
            date_of_birth: row.date_of_birth.as_deref().map(parse_date).transpose()?,
            owner_id: row.owner_id,
        })
    }
}

fn owner_row(row: &Row<'_>) -> rusqlite::Result<Owner> {
    Ok(Owner {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}
