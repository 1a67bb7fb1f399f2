//! Pet and ownership records.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Pet;

impl Database {
    /// Insert or replace a pet together with its owner links.
    pub fn upsert_pet(&self, pet: &Pet) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO pets (pet_id, name, species)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(pet_id) DO UPDATE SET
                name = excluded.name,
                species = excluded.species
            "#,
            params![pet.id, pet.name, pet.species],
        )?;

        self.conn
            .execute("DELETE FROM pet_owners WHERE pet_id = ?", [&pet.id])?;
        for owner in &pet.owner_ids {
            self.conn.execute(
                "INSERT OR IGNORE INTO pet_owners (pet_id, client_id) VALUES (?1, ?2)",
                params![pet.id, owner],
            )?;
        }
        Ok(())
    }

    /// Get a pet with its owners.
    pub fn get_pet(&self, pet_id: &str) -> DbResult<Option<Pet>> {
        let pet = self
            .conn
            .query_row(
                "SELECT pet_id, name, species FROM pets WHERE pet_id = ?",
                [pet_id],
                |row| {
                    Ok(Pet {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        species: row.get(2)?,
                        owner_ids: Vec::new(),
                    })
                },
            )
            .optional()?;

        match pet {
            Some(mut pet) => {
                pet.owner_ids = self.pet_owner_ids(&pet.id)?;
                Ok(Some(pet))
            }
            None => Ok(None),
        }
    }

    /// Client IDs owning a pet.
    pub fn pet_owner_ids(&self, pet_id: &str) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id FROM pet_owners WHERE pet_id = ? ORDER BY client_id",
        )?;
        let rows = stmt.query_map([pet_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Pets owned by a client.
    pub fn list_pets_for_client(&self, client_id: &str) -> DbResult<Vec<Pet>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.pet_id
            FROM pets p
            JOIN pet_owners o ON o.pet_id = p.pet_id
            WHERE o.client_id = ?
            ORDER BY p.name
            "#,
        )?;
        let ids = stmt
            .query_map([client_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut pets = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(pet) = self.get_pet(&id)? {
                pets.push(pet);
            }
        }
        Ok(pets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup_db();

        let mut pet = Pet::new("Max".into(), "canine".into());
        pet.owner_ids = vec!["client-1".into(), "client-2".into()];
        db.upsert_pet(&pet).unwrap();

        let retrieved = db.get_pet(&pet.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Max");
        assert_eq!(retrieved.owner_ids, vec!["client-1", "client-2"]);
        assert!(retrieved.is_owned_by("client-2"));
    }

    #[test]
    fn test_upsert_replaces_owners() {
        let db = setup_db();

        let mut pet = Pet::new("Luna".into(), "feline".into());
        pet.owner_ids = vec!["client-1".into()];
        db.upsert_pet(&pet).unwrap();

        pet.owner_ids = vec!["client-3".into()];
        pet.name = "Luna II".into();
        db.upsert_pet(&pet).unwrap();

        let retrieved = db.get_pet(&pet.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Luna II");
        assert_eq!(retrieved.owner_ids, vec!["client-3"]);
    }

    #[test]
    fn test_missing_pet() {
        let db = setup_db();
        assert!(db.get_pet("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_pets_for_client() {
        let db = setup_db();

        let mut max = Pet::new("Max".into(), "canine".into());
        max.owner_ids = vec!["client-1".into()];
        let mut luna = Pet::new("Luna".into(), "feline".into());
        luna.owner_ids = vec!["client-1".into()];
        let mut rex = Pet::new("Rex".into(), "canine".into());
        rex.owner_ids = vec!["client-2".into()];

        db.upsert_pet(&max).unwrap();
        db.upsert_pet(&luna).unwrap();
        db.upsert_pet(&rex).unwrap();

        let pets = db.list_pets_for_client("client-1").unwrap();
        let names: Vec<_> = pets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Luna", "Max"]);
    }
}
