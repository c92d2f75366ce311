use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    DeleteAck, Fields, InsertAck, NewProduct, Product, ProductId, ReportEntry, UpdateAck,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a product named `{0}` already exists")]
    DuplicateName(String),

    #[error("document store error: {0}")]
    Backend(#[from] mongodb::error::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("failed to decode stored document: {0}")]
    Decode(String),

    #[error("report aggregation failed: {0}")]
    Aggregation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything the HTTP layer needs from the `products` collection.
///
/// Each method is a single store round-trip; nothing here retries or
/// coordinates across calls.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products whose fields equal every entry of `filter`, ascending by `sort_by`.
    async fn list(&self, filter: &Fields, sort_by: &str) -> StoreResult<Vec<Product>>;

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>>;

    /// Fails with [`StoreError::DuplicateName`] only when the backend enforces
    /// unique names itself.
    async fn insert(&self, product: NewProduct) -> StoreResult<InsertAck>;

    /// `$set`-style merge into the product with `id`. Unknown ids match nothing.
    async fn update(&self, id: ProductId, changes: Fields) -> StoreResult<UpdateAck>;

    async fn delete(&self, id: ProductId) -> StoreResult<DeleteAck>;

    /// One entry per product named exactly `name`.
    async fn report(&self, name: &str) -> StoreResult<Vec<ReportEntry>>;

    async fn ping(&self) -> StoreResult<()>;
}
