//! Service implementations
//!
//! Production implementations of the planner's service traits.

pub mod notifier;
pub mod rest_client;

pub use notifier::{ChannelNotifier, LogNotifier};
pub use rest_client::RealScheduleApi;
