//! Domain type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` so the HTTP wire
//! format matches the admin console's JSON. Timestamps are RFC 3339
//! strings, server-assigned at write time.

mod audit;
mod control;
mod event;
mod preference;
mod rule;
mod settings;

pub use audit::*;
pub use control::*;
pub use event::*;
pub use preference::*;
pub use rule::*;
pub use settings::*;
