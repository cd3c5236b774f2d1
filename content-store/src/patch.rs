//! Three-state field wrapper for partial updates
//!
//! A partial update must distinguish "field supplied as null" (a real NULL
//! write) from "field absent" (leave untouched), which `Option<T>` cannot
//! express on its own. `Patch<T>` makes the not-set state explicit.

use serde::{Deserialize, Deserializer};

/// A field in a partial update
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    /// Field was not supplied; leave the stored value untouched
    #[default]
    Missing,
    /// Field was supplied as null; write NULL
    Null,
    /// Field was supplied with a value
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }

    /// Map the supplied value, preserving Missing and Null
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Missing => Patch::Missing,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    /// The supplied value, if any
    pub fn value(self) -> Option<T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }
}

// Deserializes a *present* field: null becomes Null, a value becomes Value.
// Absent fields never reach this impl; `#[serde(default)]` fills in Missing.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Update {
        #[serde(default)]
        title: Patch<String>,
        #[serde(default)]
        video_url: Patch<String>,
    }

    #[test]
    fn test_absent_field_is_missing() {
        let update: Update = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(update.title, Patch::Missing);
        assert_eq!(update.video_url, Patch::Missing);
    }

    #[test]
    fn test_null_field_is_null_not_missing() {
        let update: Update = serde_json::from_str(r#"{"video_url": null}"#).unwrap();
        assert_eq!(update.title, Patch::Missing);
        assert_eq!(update.video_url, Patch::Null);
    }

    #[test]
    fn test_present_field_is_value() {
        let update: Update = serde_json::from_str(r#"{"title": "Terms"}"#).unwrap();
        assert_eq!(update.title, Patch::Value("Terms".to_string()));
    }

    #[test]
    fn test_map_preserves_states() {
        assert_eq!(
            Patch::Value("x".to_string()).map(|v| v.len()),
            Patch::Value(1)
        );
        assert_eq!(Patch::<String>::Null.map(|v| v.len()), Patch::Null);
        assert_eq!(Patch::<String>::Missing.map(|v| v.len()), Patch::Missing);
    }
}
