use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Numeric product identifier
pub type ProductId = u64;

/// Caller-supplied product fields, kept in insertion order
pub type ProductPayload = Map<String, Value>;

const ID_FIELD: &str = "id";
const STATUS_FIELD: &str = "status";

/// Product record as stored in the products collection file
///
/// Only `id` and `status` are typed. Everything else the caller sends is kept
/// verbatim in `attributes` and serialized between the two.
///
/// A stored record whose `id` is not a non-negative integer makes the whole
/// collection unreadable. Requests then fail with a storage error and the file
/// is never rewritten, so the damaged record stays on disk until repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub attributes: ProductPayload,
    #[serde(default = "default_status")]
    pub status: bool,
}

/// Confirmation returned by a product deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteProductResponse {
    pub message: String,
}

fn default_status() -> bool {
    true
}

impl Product {
    /// Create a new active product from a creation payload.
    ///
    /// `id` and `status` supplied in the payload are discarded.
    pub fn new(id: ProductId, mut payload: ProductPayload) -> Self {
        payload.remove(ID_FIELD);
        payload.remove(STATUS_FIELD);

        Self {
            id,
            attributes: payload,
            status: true,
        }
    }

    /// Shallow-merge an update payload into this product.
    ///
    /// Existing keys keep their position, new keys are appended. The `id`
    /// never changes and `status` only accepts a boolean.
    pub fn merge(&mut self, payload: ProductPayload) {
        for (key, value) in payload {
            match key.as_str() {
                ID_FIELD => {}
                STATUS_FIELD => {
                    if let Value::Bool(status) = value {
                        self.status = status;
                    }
                }
                _ => {
                    self.attributes.insert(key, value);
                }
            }
        }
    }
}

/// Parse a raw path id the way a lenient integer parser would.
///
/// Leading whitespace and a `+` sign are accepted, parsing stops at the first
/// non-digit. Inputs without leading digits, negative numbers and values that
/// overflow yield `None`, which never matches a stored product.
pub fn parse_product_id(raw: &str) -> Option<ProductId> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let digits_len = unsigned
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();

    if digits_len == 0 {
        return None;
    }

    unsigned[..digits_len].parse().ok()
}
