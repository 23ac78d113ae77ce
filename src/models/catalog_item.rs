use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One product as published by the external catalog feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    #[serde(deserialize_with = "required_text")]
    pub id: String,
    #[serde(flatten)]
    pub attributes: CatalogAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogAttributes {
    #[serde(default, deserialize_with = "optional_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub price: Option<String>,
    #[serde(default, alias = "cupom", deserialize_with = "optional_text")]
    pub coupon: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub link: Option<String>,
    #[serde(default, alias = "image_url", deserialize_with = "optional_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub installment: Option<String>,
    #[serde(default, deserialize_with = "optional_flag")]
    pub free_shipping: Option<bool>,
}

/// The feed has been seen to return both a bare array and a wrapped list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FeedResponse {
    Items(Vec<CatalogItem>),
    Wrapped {
        #[serde(alias = "data", alias = "items", alias = "results")]
        products: Vec<CatalogItem>,
    },
}

impl FeedResponse {
    pub fn into_items(self) -> Vec<CatalogItem> {
        match self {
            FeedResponse::Items(items) => items,
            FeedResponse::Wrapped { products } => products,
        }
    }
}

fn value_to_text(value: Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_text))
}

fn required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_text(value).ok_or_else(|| serde::de::Error::custom("catalog item id must be a non-empty string or number"))
}

fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "sim" => Some(true),
            "false" | "0" | "no" | "nao" | "não" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
