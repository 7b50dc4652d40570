use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::CountryCode;

/// Server-assigned pin identifier
pub type PinId = u64;

/// A persisted pin as returned by the persistence service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    pub user_id: u64,
    #[serde(deserialize_with = "de_latitude")]
    pub latitude: f64,
    #[serde(deserialize_with = "de_longitude")]
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<CountryCode>,
}

/// Body of `POST /api/v1/pinned_locations`. A pin has no id until the
/// service has stored it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPin {
    pub user_id: u64,
    pub longitude: f64,
    pub latitude: f64,
    pub country: CountryCode,
}

/// Bearer token for the persistence service
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

fn de_latitude<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    de_coordinate(deserializer, "latitude", 90.0)
}

fn de_longitude<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    de_coordinate(deserializer, "longitude", 180.0)
}

/// Decimal columns come back as strings ("48.8566"); accept both forms.
/// Values must be finite and within `±limit` degrees.
fn de_coordinate<'de, D>(deserializer: D, axis: &str, limit: f64) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Number(f64),
        Text(String),
    }

    let value = match Coordinate::deserialize(deserializer)? {
        Coordinate::Number(value) => value,
        Coordinate::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid {axis}: {text:?}"))
        })?,
    };

    if !value.is_finite() || value.abs() > limit {
        return Err(serde::de::Error::custom(format!(
            "{axis} out of range: {value}"
        )));
    }
    Ok(value)
}
