// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod ping;
mod root;
mod shared_types;
mod telemetry;
mod update;
mod value;

// Core handlers
pub use ping::ping;
pub use root::root_handler;
pub use telemetry::telemetry_handler;

// Metric write handlers
pub use update::{update_batch, update_from_path, update_json};

// Metric read handlers
pub use value::{value_as_json, value_as_text};
