//! Lighting contexts
//!
//! A context is one integration (an application or game) with its own
//! folder of profiles, a settings record, and observers.

mod config;
mod events;
mod lighting;

pub use config::{default_root, ContextConfig};
pub use events::{ContextEvent, EventBus};
pub use lighting::{LightingContext, LoadReport, SharedContext};
