use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::{self, ObjectId};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Open set of document fields keyed by field name.
pub type Fields = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const NAME_FIELD: &str = "name";

/// Store-generated product identifier. Travels over HTTP as 24 hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(ObjectId);

impl ProductId {
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for ProductId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl FromStr for ProductId {
    type Err = oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s).map(Self)
    }
}

impl Serialize for ProductId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(de::Error::custom)
    }
}

/// A stored product: the identifier plus whatever fields the document carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Product {
    pub fn name(&self) -> Option<&str> {
        self.fields.get(NAME_FIELD).and_then(Value::as_str)
    }

    /// Field lookup by name. `_id` resolves to the hex identifier.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key == ID_FIELD {
            return Some(Value::String(self.id.to_string()));
        }
        self.fields.get(key).cloned()
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Body of `POST /products`. Only `name` is required; everything else is kept as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(flatten)]
    pub extra: Fields,
}

impl NewProduct {
    /// Flattens into the field set to store. Identifiers are always store-generated.
    pub fn into_fields(self) -> Fields {
        let mut fields = self.extra;
        fields.remove(ID_FIELD);
        fields.insert(NAME_FIELD.to_string(), Value::String(self.name));
        fields
    }
}

/// Drops any identifier from a partial update; `_id` is immutable.
pub fn strip_identifier(changes: &mut Fields) -> bool {
    changes.remove(ID_FIELD).is_some()
}

/// Body of `GET /products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub filter: Option<Fields>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl ListQuery {
    /// Filter entries are plain field/value pairs. Keys naming query
    /// operators (`$or`, `$where`, ...) are refused.
    pub fn validated_filter(&self) -> Result<Fields, String> {
        let filter = self.filter.clone().unwrap_or_default();
        match filter.keys().find(|key| key.starts_with('$')) {
            Some(key) => Err(format!("filter key `{key}` is not a field name")),
            None => Ok(filter),
        }
    }

    pub fn sort_field(&self) -> &str {
        self.sort_by
            .as_deref()
            .filter(|field| !field.is_empty())
            .unwrap_or(NAME_FIELD)
    }
}
