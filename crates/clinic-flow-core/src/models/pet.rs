//! Pet models.

use serde::{Deserialize, Serialize};

/// A pet as known to the waiting room, with its owners by ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    /// Pet ID
    pub id: String,
    /// Pet name
    pub name: String,
    /// Species (e.g., "canine", "feline")
    pub species: String,
    /// Client IDs of the owners
    pub owner_ids: Vec<String>,
}

impl Pet {
    /// Create a new pet with no owners.
    pub fn new(name: String, species: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            species,
            owner_ids: Vec::new(),
        }
    }

    /// Check whether the client is one of the owners.
    pub fn is_owned_by(&self, client_id: &str) -> bool {
        self.owner_ids.iter().any(|owner| owner == client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership() {
        let mut pet = Pet::new("Max".into(), "canine".into());
        assert!(!pet.is_owned_by("client-1"));

        pet.owner_ids.push("client-1".into());
        assert!(pet.is_owned_by("client-1"));
        assert!(!pet.is_owned_by("client-2"));
    }
}
