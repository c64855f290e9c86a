//! Port traits at the seams between domain logic and the outside world.

pub mod loader_port;
pub mod store_port;
