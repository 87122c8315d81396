//! Lenient field decoders.
//!
//! The PHP backend is loose about JSON types: ids and counters can arrive as
//! numbers or numeric strings, flags as `0`/`1`, `"1"` or booleans, and optional
//! strings as `null`.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Loose {
    fn into_i64(self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(n),
            Self::Float(f) if f.is_finite() => Some(f as i64),
            Self::Float(_) => None,
            Self::Bool(b) => Some(i64::from(b)),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn into_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(n) => n != 0,
            Self::Float(f) => f != 0.0,
            Self::Text(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        }
    }

    fn into_string(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Required integer.
pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Loose::deserialize(deserializer)?
        .into_i64()
        .ok_or_else(|| de::Error::custom("expected an integer"))
}

/// Integer that may be absent, null or garbage.
pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?.and_then(Loose::into_i64))
}

/// Counter that treats null or garbage as zero.
pub fn count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_int(deserializer)?.unwrap_or(0))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?.is_some_and(Loose::into_bool))
}

/// String where null means empty.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(Loose::into_string)
        .unwrap_or_default())
}

/// Optional string where null and `""` both mean absent.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(Loose::into_string)
        .filter(|s| !s.is_empty()))
}

/// List of ids, skipping entries that are not integers.
pub fn int_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Loose>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .filter_map(Loose::into_i64)
        .collect())
}
