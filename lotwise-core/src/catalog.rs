use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// What the listing catalog knows about a space: the labels a host assigned
/// to its spots and the hourly rate used for pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceListing {
    pub id: Uuid,
    pub host_id: String,
    pub name: String,
    /// Minor units (cents) per hour.
    pub rate_per_hour: i64,
    pub spot_labels: Vec<String>,
}

/// Read-only seam to the listing catalog. The catalog itself (CRUD, search,
/// media) is an external collaborator; the engine only validates claims and
/// prices bookings against it.
#[async_trait]
pub trait ListingCatalog: Send + Sync {
    async fn get_space(
        &self,
        space_id: Uuid,
    ) -> Result<Option<SpaceListing>, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory catalog used by tests and the API demo seeding path.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    spaces: RwLock<HashMap<Uuid, SpaceListing>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, listing: SpaceListing) {
        let mut spaces = self.spaces.write().expect("catalog lock poisoned");
        spaces.insert(listing.id, listing);
    }

    pub fn remove(&self, space_id: Uuid) -> Option<SpaceListing> {
        let mut spaces = self.spaces.write().expect("catalog lock poisoned");
        spaces.remove(&space_id)
    }
}

#[async_trait]
impl ListingCatalog for InMemoryCatalog {
    async fn get_space(
        &self,
        space_id: Uuid,
    ) -> Result<Option<SpaceListing>, Box<dyn std::error::Error + Send + Sync>> {
        let spaces = self.spaces.read().expect("catalog lock poisoned");
        Ok(spaces.get(&space_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_catalog_roundtrip() {
        let catalog = InMemoryCatalog::new();
        let id = Uuid::new_v4();
        catalog.insert(SpaceListing {
            id,
            host_id: "host-1".to_string(),
            name: "CBD rooftop".to_string(),
            rate_per_hour: 500,
            spot_labels: vec!["A1".to_string(), "A2".to_string()],
        });

        let listing = catalog.get_space(id).await.unwrap().unwrap();
        assert_eq!(listing.spot_labels.len(), 2);
        assert!(catalog.get_space(Uuid::new_v4()).await.unwrap().is_none());
    }
}
