// Gateway module - request/response layers shared by every route

mod compression;
mod signing;
mod tracking;

pub use compression::{gzip_bodies, MAX_BODY_BYTES};
pub use signing::signatures;
pub use tracking::track_requests;
