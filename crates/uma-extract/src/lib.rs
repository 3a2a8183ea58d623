//! Field-group extractors for character detail and support screenshots.
//!
//! Each extractor owns an `Arc<ExtractContext>` and turns one decoded upload into one
//! record. A screen whose anchor cannot be found yields the record's default value;
//! only resource loading can fail, and that happens once in [`ExtractContext::load`].

pub mod ability;
pub mod character;
pub mod context;
pub mod error;
pub mod layout;
pub mod resources;
pub mod skill;
pub mod status;
pub mod support;

use image::RgbaImage;

pub use ability::AbilityExtractor;
pub use character::CharacterExtractor;
pub use context::{normalize, ExtractContext};
pub use error::ExtractError;
pub use layout::Layouts;
pub use resources::{
    DebugSink, DirDebugSink, LocalResourceStore, MemoryResourceStore, NoopDebugSink,
    ResourceStore,
};
pub use skill::SkillExtractor;
pub use status::StatusExtractor;
pub use support::SupportExtractor;

/// One field group of one screen.
pub trait Extractor: Send + Sync {
    type Record: Send + 'static;

    fn extract(&self, image: &RgbaImage) -> Self::Record;
}
