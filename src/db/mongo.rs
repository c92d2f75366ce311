use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson, Document},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use serde_json::Value;
use tracing::info;

use super::{ProductStore, StoreError, StoreResult};
use crate::models::{
    DeleteAck, Fields, InsertAck, NewProduct, Product, ProductId, ReportEntry, UpdateAck, ID_FIELD,
    NAME_FIELD,
};

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

const UNIQUE_NAME_INDEX: &str = "name_unique";

/// MongoDB-backed product collection. Cloning shares the driver's connection pool.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    products: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> StoreResult<Self> {
        info!(uri = %uri, "Connecting to MongoDB");
        let client = Client::with_uri_str(uri).await?;
        let products = client.database(database).collection::<Document>(collection);
        info!(database = %database, collection = %collection, "MongoDB client ready");
        Ok(Self { client, products })
    }

    /// Builds a unique index on `name` so concurrent creates with the same
    /// name cannot both land.
    pub async fn ensure_unique_names(&self) -> StoreResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { NAME_FIELD: 1 })
            .options(
                IndexOptions::builder()
                    .name(UNIQUE_NAME_INDEX.to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.products.create_index(index, None).await?;
        info!(index = UNIQUE_NAME_INDEX, "Unique product name index in place");
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MongoStore {
    async fn list(&self, filter: &Fields, sort_by: &str) -> StoreResult<Vec<Product>> {
        let mut sort = Document::new();
        sort.insert(sort_by, 1);
        let options = FindOptions::builder().sort(sort).build();

        let cursor = self.products.find(query_document(filter)?, options).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        documents.into_iter().map(product_from_document).collect()
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        self.products
            .find_one(doc! { NAME_FIELD: name }, None)
            .await?
            .map(product_from_document)
            .transpose()
    }

    async fn insert(&self, product: NewProduct) -> StoreResult<InsertAck> {
        let name = product.name.clone();
        let document = bson::to_document(&product.into_fields())?;

        let result = self
            .products
            .insert_one(document, None)
            .await
            .map_err(|err| classify_write_error(err, Some(name)))?;

        let inserted_id = result.inserted_id.as_object_id().ok_or_else(|| {
            StoreError::Decode(format!("inserted id {} is not an ObjectId", result.inserted_id))
        })?;
        Ok(InsertAck::new(inserted_id.into()))
    }

    async fn update(&self, id: ProductId, changes: Fields) -> StoreResult<UpdateAck> {
        let filter = doc! { ID_FIELD: id.object_id() };

        // An empty `$set` is rejected by the server; nothing to modify anyway.
        if changes.is_empty() {
            let matched = self.products.count_documents(filter, None).await?;
            return Ok(UpdateAck::new(matched.min(1), 0));
        }

        let name = changes
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned);
        let update = doc! { "$set": bson::to_document(&changes)? };

        let result = self
            .products
            .update_one(filter, update, None)
            .await
            .map_err(|err| classify_write_error(err, name))?;

        Ok(UpdateAck::new(result.matched_count, result.modified_count))
    }

    async fn delete(&self, id: ProductId) -> StoreResult<DeleteAck> {
        let result = self
            .products
            .delete_one(doc! { ID_FIELD: id.object_id() }, None)
            .await?;
        Ok(DeleteAck::new(result.deleted_count))
    }

    async fn report(&self, name: &str) -> StoreResult<Vec<ReportEntry>> {
        let pipeline = vec![
            doc! { "$match": { NAME_FIELD: name } },
            doc! {
                "$project": {
                    "_id": 0,
                    "productName": "$name",
                    "quantity": "$quantity",
                    "totalValue": { "$multiply": ["$price", "$quantity"] },
                }
            },
        ];

        let cursor = self.products.aggregate(pipeline, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        documents.into_iter().map(report_entry_from_document).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }
}

/// Exact-match query from a JSON filter. Every value goes through `$eq`, so
/// operator-shaped values are compared literally. A hex string under `_id` is
/// matched as an ObjectId, since that is how identifiers are stored.
fn query_document(filter: &Fields) -> StoreResult<Document> {
    let mut query = Document::new();
    for (key, value) in filter {
        let mut value = bson::to_bson(value)?;
        if key == ID_FIELD {
            if let Some(oid) = value.as_str().and_then(|hex| ObjectId::parse_str(hex).ok()) {
                value = Bson::ObjectId(oid);
            }
        }
        query.insert(key.as_str(), doc! { "$eq": value });
    }
    Ok(query)
}

fn product_from_document(mut document: Document) -> StoreResult<Product> {
    let id = document
        .get_object_id(ID_FIELD)
        .map_err(|e| StoreError::Decode(format!("{ID_FIELD}: {e}")))?;
    document.remove(ID_FIELD);

    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Product {
            id: id.into(),
            fields,
        }),
        other => Err(StoreError::Decode(format!("expected a document, found {other}"))),
    }
}

fn report_entry_from_document(document: Document) -> StoreResult<ReportEntry> {
    serde_json::from_value(Bson::Document(document).into_relaxed_extjson())
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn classify_write_error(err: MongoError, name: Option<String>) -> StoreError {
    match (is_duplicate_key(&err), name) {
        (true, Some(name)) => StoreError::DuplicateName(name),
        _ => StoreError::Backend(err),
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn query_document_matches_hex_id_as_object_id() {
        let hex = "64b7f0c2a1b2c3d4e5f60718";
        let query = query_document(&fields(json!({ "_id": hex, "name": "Widget" }))).unwrap();
        assert_eq!(
            query,
            doc! {
                "_id": { "$eq": ObjectId::parse_str(hex).unwrap() },
                "name": { "$eq": "Widget" },
            }
        );
    }

    #[test]
    fn query_document_leaves_other_ids_alone() {
        let query = query_document(&fields(json!({ "_id": "sku-1" }))).unwrap();
        assert_eq!(query, doc! { "_id": { "$eq": "sku-1" } });
    }

    #[test]
    fn query_document_compares_operator_values_literally() {
        let query = query_document(&fields(json!({ "price": { "$gt": 5 } }))).unwrap();
        assert_eq!(query, doc! { "price": { "$eq": { "$gt": 5_i64 } } });
    }

    #[test]
    fn product_from_document_splits_id_from_fields() {
        let oid = ObjectId::new();
        let product = product_from_document(doc! {
            "_id": oid,
            "name": "Widget",
            "price": 10_i64,
            "quantity": 3_i32,
        })
        .unwrap();

        assert_eq!(product.id, ProductId::from(oid));
        assert_eq!(
            Value::Object(product.fields),
            json!({ "name": "Widget", "price": 10, "quantity": 3 })
        );
    }

    #[test]
    fn report_entry_keeps_projected_null_quantity() {
        let entry = report_entry_from_document(doc! {
            "productName": "Widget",
            "quantity": Bson::Null,
            "totalValue": Bson::Null,
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(entry).unwrap(),
            json!({ "productName": "Widget", "quantity": null, "totalValue": null })
        );
    }

    #[test]
    fn report_entry_omits_unprojected_quantity() {
        let entry = report_entry_from_document(doc! {
            "productName": "Widget",
            "totalValue": Bson::Null,
        })
        .unwrap();
        assert_eq!(entry.quantity, None);
    }

    #[test]
    fn product_from_document_requires_object_id() {
        let err = product_from_document(doc! { "_id": "sku-1", "name": "Widget" }).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
