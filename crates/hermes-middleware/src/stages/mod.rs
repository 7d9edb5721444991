//! Built-in middleware units.
//!
//! Both run in the pre-authentication phase:
//!
//! 1. [`cors`] at the lowest priority, so later units can override its headers
//! 2. [`request_id`] at the highest priority

pub mod cors;
pub mod request_id;

pub use cors::CorsAnywhereMiddleware;
pub use request_id::RequestIdMiddleware;
