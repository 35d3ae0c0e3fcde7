//! Registry response envelope.
//!
//! The registry wraps results as `response.body.items.item`, where `item` is a
//! list, a bare object when there is exactly one result, or missing entirely
//! (`items` then becomes `""`). Everything here folds those shapes into a
//! plain list.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::animal::{RawAnimal, lenient_string};

/// A value the API returns either alone or in a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegistryResponse {
    #[serde(default)]
    pub response: Option<ResponseEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub header: Option<ResponseHeader>,
    #[serde(default)]
    pub body: Option<ResponseBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeader {
    #[serde(default, deserialize_with = "lenient_string")]
    pub result_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result_msg: String,
}

impl ResponseHeader {
    pub fn is_success(&self) -> bool {
        matches!(self.result_code.trim(), "" | "0" | "00")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_count: u64,
    #[serde(default)]
    pub items: Option<Items>,
}

/// `items` as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Wrapped { item: OneOrMany<Value> },
    Other(Value),
}

impl Items {
    /// Flatten into raw item values.
    pub fn into_values(self) -> Vec<Value> {
        let values = match self {
            Items::Wrapped { item } => item.into_vec(),
            Items::Other(Value::Array(values)) => values,
            Items::Other(_) => Vec::new(),
        };
        values.into_iter().filter(|v| v.is_object()).collect()
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// One decoded page of registry results.
#[derive(Debug, Default)]
pub struct RegistryPage {
    pub items: Vec<RawAnimal>,
    pub total_count: u64,
}

impl RegistryPage {
    /// Parse a response body, yielding an empty page on any malformed shape.
    pub fn parse(text: &str) -> Self {
        let response: RegistryResponse = match serde_json::from_str(text) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Registry returned a non-JSON or malformed body: {}", e);
                return Self::default();
            }
        };

        let Some(envelope) = response.response else {
            log::warn!("Registry response has no 'response' envelope");
            return Self::default();
        };

        if let Some(header) = &envelope.header {
            if !header.is_success() {
                log::warn!(
                    "Registry rejected the query: {} ({})",
                    header.result_msg,
                    header.result_code
                );
                return Self::default();
            }
        }

        let Some(body) = envelope.body else {
            log::warn!("Registry response has no 'body'");
            return Self::default();
        };

        let items = body
            .items
            .map(Items::into_values)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawAnimal>(value) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    log::warn!("Skipping undecodable registry item: {}", e);
                    None
                }
            })
            .collect();

        Self {
            items,
            total_count: body.total_count,
        }
    }
}
