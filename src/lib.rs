//! Lumen - Lighting Profile Persistence
//!
//! Lumen keeps the profiles of a lighting context on disk: documents built
//! from ordered, polymorphic layers that are resolved by type tag when read.
//!
//! # Architecture
//!
//! - `layers`: layer handlers, collections, profiles and the type registry
//! - `state`: document codec, migration, storage, settings and autosave
//! - `context`: the profile set of one context and its events
//! - `cli`: the `lumen-cli` front end
//!
//! Damaged documents never stop a context from loading: a layer that cannot
//! be restored is kept inert, an unreadable profile is skipped, and a
//! corrupt default profile is moved aside and recreated.

pub mod cli;
pub mod context;
pub mod error;
pub mod layers;
pub mod state;

pub use context::{ContextConfig, ContextEvent, LightingContext, SharedContext};
pub use error::{DecodeErrorKind, LumenError, Result};
pub use layers::{LayerHandler, Profile, ProfileId, Region, TypeRegistry};
