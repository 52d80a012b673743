//! Layer Model Module
//!
//! Profiles are built from two ordered collections of layers:
//! - Main: the layers rendered every frame
//! - Overlay: layers drawn on top of every other context
//!
//! Each layer is an entry around a polymorphic handler resolved by type tag
//! through the [`TypeRegistry`].

mod collection;
mod color;
mod entry;
mod gradient;
mod handler;
mod key_sequence;
mod keyed_background;
mod percent;
mod profile;
mod registry;
mod solid_color;

pub use collection::{LayerChange, LayerChangeKind, LayerCollection};
pub use color::Color;
pub use entry::{LayerEntry, LayerId};
pub use gradient::{GradientLayer, GradientProperties, GradientStop};
pub use handler::LayerHandler;
pub use key_sequence::{FreeFormRegion, KeySequence, KeySequenceKind};
pub use keyed_background::{KeyedBackgroundLayer, KeyedBackgroundProperties};
pub use percent::{PercentEffectType, PercentLayer, PercentProperties};
pub use profile::{Profile, ProfileChanges, ProfileId, Region};
pub use registry::{
    HandlerCatalog, HandlerFactory, ProfileDefaults, ProfileTemplate, TypeRegistry,
    APPLICATION_PROFILE, GLOBAL_HANDLERS,
};
pub use solid_color::{SolidColorLayer, SolidColorProperties};
