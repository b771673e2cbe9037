//! Built-in effects.

pub mod color;
pub mod expr;
pub mod stylize;
pub mod temporal;

pub use color::{
    BrightnessEffect, GrayscaleEffect, InvertEffect, SepiaEffect, ThresholdEffect, TintEffect,
};
pub use expr::ExprEffect;
pub use stylize::{BlendEffect, VignetteEffect};
pub use temporal::AfterimageEffect;
