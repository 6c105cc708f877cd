//! Product listing and administration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::ProductId;
use domain::{NewProduct, Product, ProductPatch, next_product_id};
use serde::Serialize;
use store::{Cache, CacheExt, Store};

use crate::{Principal, Result, ServiceError};

/// Cache key holding the full product listing.
pub const PRODUCTS_CACHE_KEY: &str = "products:all";

/// How long the product listing stays cached.
pub const PRODUCTS_CACHE_TTL: Duration = Duration::from_secs(60);

/// Where a listing was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    Cache,
    Db,
}

/// All products with their availability resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub source: ListingSource,
    #[serde(rename = "data")]
    pub products: Vec<Product>,
}

pub struct CatalogService<S: Store> {
    store: Arc<S>,
    cache: Arc<dyn Cache>,
}

impl<S: Store> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: Arc<S>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Lists every product with `inStock` filled in.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<ProductListing> {
        let cached: Option<Vec<Product>> = self.cache.get_json(PRODUCTS_CACHE_KEY).await;
        if let Some(products) = cached {
            return Ok(ProductListing {
                source: ListingSource::Cache,
                products,
            });
        }

        let products: Vec<Product> = self
            .store
            .list_products()
            .await?
            .into_iter()
            .map(|mut p| {
                p.in_stock = Some(p.available());
                p
            })
            .collect();
        self.cache
            .set_json(PRODUCTS_CACHE_KEY, &products, PRODUCTS_CACHE_TTL)
            .await;

        Ok(ProductListing {
            source: ListingSource::Db,
            products,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    /// Creates a product under the next sequential id. Administrators only.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id))]
    pub async fn create(&self, principal: &Principal, payload: NewProduct) -> Result<Product> {
        principal.require_admin()?;

        let existing = self.store.list_products().await?;
        let id = next_product_id(existing.iter().map(|p| &p.id));
        let product = payload.into_product(id, Utc::now());

        self.store.upsert_product(&product).await?;
        self.cache.invalidate(PRODUCTS_CACHE_KEY).await;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Overlays `patch` on an existing product. Administrators only.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id, product_id = %id))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Product> {
        principal.require_admin()?;

        let product = self
            .store
            .update_product(id, &patch, Utc::now())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
        self.cache.invalidate(PRODUCTS_CACHE_KEY).await;
        tracing::info!("product updated");
        Ok(product)
    }

    /// Deletes a product. Administrators only.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id, product_id = %id))]
    pub async fn delete(&self, principal: &Principal, id: &ProductId) -> Result<()> {
        principal.require_admin()?;

        if !self.store.delete_product(id).await? {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        self.cache.invalidate(PRODUCTS_CACHE_KEY).await;
        tracing::info!("product deleted");
        Ok(())
    }
}
