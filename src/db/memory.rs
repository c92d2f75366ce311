use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ProductStore, StoreError, StoreResult};
use crate::models::{
    DeleteAck, Fields, InsertAck, NewProduct, Product, ProductId, ReportEntry, UpdateAck,
    NAME_FIELD,
};

/// In-process product collection with the same query semantics as the
/// MongoDB backend for top-level fields. Products are kept in insertion order,
/// which is also the tie-break order when sorting.
///
/// Not modelled: dotted keys are literal field names here, not nested paths,
/// in filters, sorts and updates; arrays sort element by element rather than
/// by their smallest element.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: RwLock<Vec<Product>>,
    unique_names: bool,
}

impl MemoryStore {
    pub fn new(unique_names: bool) -> Self {
        Self {
            products: RwLock::new(Vec::new()),
            unique_names,
        }
    }

    fn name_taken(products: &[Product], name: &str, except: Option<ProductId>) -> bool {
        products
            .iter()
            .any(|p| p.name() == Some(name) && Some(p.id) != except)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self, filter: &Fields, sort_by: &str) -> StoreResult<Vec<Product>> {
        let products = self.products.read().await;
        let mut matching: Vec<Product> = products
            .iter()
            .filter(|p| matches_filter(p, filter))
            .cloned()
            .collect();
        drop(products);

        matching.sort_by(|a, b| compare_values(a.get(sort_by).as_ref(), b.get(sort_by).as_ref()));
        Ok(matching)
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.name() == Some(name)).cloned())
    }

    async fn insert(&self, product: NewProduct) -> StoreResult<InsertAck> {
        let mut products = self.products.write().await;
        if self.unique_names && Self::name_taken(&products, &product.name, None) {
            return Err(StoreError::DuplicateName(product.name));
        }

        let id = ProductId::new();
        products.push(Product {
            id,
            fields: product.into_fields(),
        });
        Ok(InsertAck::new(id))
    }

    async fn update(&self, id: ProductId, changes: Fields) -> StoreResult<UpdateAck> {
        let mut products = self.products.write().await;
        let Some(index) = products.iter().position(|p| p.id == id) else {
            return Ok(UpdateAck::new(0, 0));
        };

        if self.unique_names {
            if let Some(name) = changes.get(NAME_FIELD).and_then(Value::as_str) {
                if Self::name_taken(&products, name, Some(id)) {
                    return Err(StoreError::DuplicateName(name.to_string()));
                }
            }
        }

        let product = &mut products[index];
        let mut modified = false;
        for (key, value) in changes {
            if product.fields.get(&key) != Some(&value) {
                product.fields.insert(key, value);
                modified = true;
            }
        }
        Ok(UpdateAck::new(1, u64::from(modified)))
    }

    async fn delete(&self, id: ProductId) -> StoreResult<DeleteAck> {
        let mut products = self.products.write().await;
        match products.iter().position(|p| p.id == id) {
            Some(index) => {
                products.remove(index);
                Ok(DeleteAck::new(1))
            }
            None => Ok(DeleteAck::new(0)),
        }
    }

    async fn report(&self, name: &str) -> StoreResult<Vec<ReportEntry>> {
        let products = self.products.read().await;
        products
            .iter()
            .filter(|p| p.name() == Some(name))
            .map(|p| ReportEntry::from_product(p).map_err(StoreError::Aggregation))
            .collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn matches_filter(product: &Product, filter: &Fields) -> bool {
    filter
        .iter()
        .all(|(key, expected)| field_matches(product.get(key).as_ref(), expected))
}

/// Equality as a document store applies it: `null` also matches a missing
/// field, numbers compare by value, and arrays match any of their elements.
fn field_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None | Some(Value::Null), Value::Null) => true,
        (None, _) => false,
        (Some(actual), expected) if values_equal(actual, expected) => true,
        (Some(Value::Array(items)), expected) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Canonical cross-type sort rank: null < numbers < strings < objects < arrays < booleans.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_values(Some(x), Some(y)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Some(Value::Object(x)), Some(Value::Object(y))) => x
            .iter()
            .zip(y)
            .map(|((kx, vx), (ky, vy))| {
                kx.cmp(ky).then_with(|| compare_values(Some(vx), Some(vy)))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}
