pub mod handler;

pub use handler::{create_health_router, health_check};
