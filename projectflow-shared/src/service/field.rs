/// Three-state field updates

use serde::{Deserialize, Deserializer};

/// Change to an optional field
///
/// Deserializes from JSON so that an absent field is `Keep` (with
/// `#[serde(default)]` on the containing struct field), `null` is `Clear`,
/// and any value is `Set`.
///
/// ```
/// use projectflow_shared::service::field::FieldUpdate;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Changes {
///     #[serde(default)]
///     executor_id: FieldUpdate<u32>,
/// }
///
/// let keep: Changes = serde_json::from_str("{}").unwrap();
/// let clear: Changes = serde_json::from_str(r#"{"executor_id":null}"#).unwrap();
/// let set: Changes = serde_json::from_str(r#"{"executor_id":7}"#).unwrap();
///
/// assert_eq!(keep.executor_id, FieldUpdate::Keep);
/// assert_eq!(clear.executor_id, FieldUpdate::Clear);
/// assert_eq!(set.executor_id, FieldUpdate::Set(7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Keep
    }
}

impl<T> FieldUpdate<T> {
    /// Applies the update to the current value
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            FieldUpdate::Keep => current,
            FieldUpdate::Clear => None,
            FieldUpdate::Set(value) => Some(value),
        }
    }

    /// The value being set, if any
    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::Set(value) => Some(value),
            _ => None,
        }
    }
}

impl<'de, T> Deserialize<'de> for FieldUpdate<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            None => FieldUpdate::Clear,
            Some(value) => FieldUpdate::Set(value),
        })
    }
}
