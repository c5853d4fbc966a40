//! Leafpress event bus.
//!
//! The engine publishes a [`DomainEvent`] for every notable content,
//! sync, and change-request lifecycle step. Delivery is in-process
//! fan-out over `tokio::sync::broadcast`; subscribers that need durable
//! or external delivery layer that on top.

pub mod bus;

pub use bus::{DomainEvent, EventBus};
