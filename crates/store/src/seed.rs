//! Startup fixtures for the collections owned by external collaborators.

use std::path::Path;

use domain::{Product, User};
use serde::Deserialize;

use crate::{Result, store::Store};

/// Users and products to load before serving.
///
/// Principals are issued elsewhere; the backend only needs their records
/// to resolve customer numbers and roles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Seed {
    /// Reads a seed file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Upserts every record into `store`.
    pub async fn apply<S: Store + ?Sized>(&self, store: &S) -> Result<()> {
        for user in &self.users {
            store.upsert_user(user).await?;
        }
        for product in &self.products {
            store.upsert_product(product).await?;
        }
        tracing::info!(
            users = self.users.len(),
            products = self.products.len(),
            "seed data applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use common::{ProductId, UserId};

    #[tokio::test]
    async fn test_apply_seed() {
        let seed: Seed = serde_json::from_value(serde_json::json!({
            "users": [{"id": "u1", "userId": 1, "role": "admin"}],
            "products": [{
                "id": "P1",
                "name": "Helmet",
                "price": 100,
                "stock": [{"color": "red", "size": "M", "quantity": 5}]
            }]
        }))
        .unwrap();

        let store = InMemoryStore::new();
        seed.apply(&store).await.unwrap();

        assert!(store.get_user(&UserId::new("u1")).await.unwrap().is_some());
        let product = store.get_product(&ProductId::new("P1")).await.unwrap().unwrap();
        assert_eq!(product.variant("red", "M").unwrap().quantity, 5);
    }
}
