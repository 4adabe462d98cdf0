//! Hub resource models

use serde::{Deserialize, Deserializer};

pub mod configuration;
pub mod twin;

/// Decode an explicit `null` the same way as a missing key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
