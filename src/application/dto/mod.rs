//! Data Transfer Objects - For API boundaries
//!
//! Request bodies and response views for the HTTP layer. Requests convert
//! into service requests; responses add numbers derived from the entities.

pub mod character;
pub mod combat;
pub mod item;
pub mod realm;
pub mod room;
pub mod warfare;

pub use character::*;
pub use combat::*;
pub use item::*;
pub use realm::*;
pub use room::*;
pub use warfare::*;

/// Distinguish an explicit `null` from a missing field in partial updates
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    <Option<T> as serde::Deserialize>::deserialize(deserializer).map(Some)
}
