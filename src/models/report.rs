use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use super::Product;

/// One row of `GET /products/raport/:name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub product_name: String,
    /// Omitted when the document has no `quantity`; a stored `null` is kept.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<Value>,
    /// `price × quantity`, or `null` when either side is missing.
    #[serde(default)]
    pub total_value: Value,
}

impl ReportEntry {
    pub fn from_product(product: &Product) -> Result<Self, String> {
        let quantity = product.fields.get("quantity");
        let price = product.fields.get("price");
        Ok(Self {
            product_name: product.name().unwrap_or_default().to_string(),
            quantity: quantity.cloned(),
            total_value: multiply(price, quantity)?,
        })
    }
}

/// Any present value, `null` included, is `Some`. Absence is left to `#[serde(default)]`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Multiplies two document values the way the aggregation `$multiply`
/// operator does: null or missing operands give `null`, integer products stay
/// integral until they overflow, anything non-numeric is an error.
pub fn multiply(lhs: Option<&Value>, rhs: Option<&Value>) -> Result<Value, String> {
    let (lhs, rhs) = match (lhs, rhs) {
        (None, _) | (_, None) | (Some(Value::Null), _) | (_, Some(Value::Null)) => {
            return Ok(Value::Null)
        }
        (Some(Value::Number(lhs)), Some(Value::Number(rhs))) => (lhs, rhs),
        (Some(lhs), Some(rhs)) => {
            let offender = if lhs.is_number() { rhs } else { lhs };
            return Err(format!(
                "$multiply only supports numeric types, not {}",
                type_name(offender)
            ));
        }
    };

    if let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) {
        if let Some(product) = a.checked_mul(b) {
            return Ok(Value::Number(product.into()));
        }
    }

    let product = lhs.as_f64().unwrap_or(f64::NAN) * rhs.as_f64().unwrap_or(f64::NAN);
    Ok(Number::from_f64(product).map_or(Value::Null, Value::Number))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
