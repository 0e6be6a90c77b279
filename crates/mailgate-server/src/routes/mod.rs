//! Admin API route handlers, one module per resource.

pub mod audit;
pub mod events;
pub mod preferences;
pub mod rules;
pub mod settings;
pub mod system;
pub mod usage;
