//! Placeholder registry, template rendering and refresh delay derivation.

mod builtin;
mod delay;
mod registry;
mod template;

pub use builtin::{FPS_MINIMUM_DELAY, FrameCounter, NOT_AVAILABLE, register_builtins};
pub use delay::DelayResolver;
pub use registry::{Placeholder, PlaceholderBuilder, PlaceholderRegistry, Resolver};
pub use template::TemplateEngine;
