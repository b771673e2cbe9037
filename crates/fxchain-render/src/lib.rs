//! # fxchain-render
//!
//! The pipeline composer. Holds an ordered list of stages and folds a source
//! image through the enabled ones once per frame, on the calling thread.

pub mod composer;
pub mod effect;
pub mod effects;
pub mod image_loader;
pub mod registry;
pub mod stage;

pub use composer::{Composer, FrameReport};
pub use effect::Effect;
pub use registry::{EffectInfo, EffectRegistry};
pub use stage::Stage;
