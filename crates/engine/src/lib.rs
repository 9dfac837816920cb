//! Subscription registry and scheduled fan-out of weather updates.

pub mod commands;
pub mod dispatch;
pub mod formatter;
pub mod registry;
pub mod scheduler;

pub use commands::{CommandRouter, Request};
pub use dispatch::Dispatcher;
pub use registry::SubscriptionRegistry;
pub use scheduler::Scheduler;
