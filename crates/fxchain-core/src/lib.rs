//! # fxchain-core
//!
//! Core types shared across the fxchain crates: frame buffers, colors,
//! frame timing, parameter schemas, presets, content hashing and the
//! error type.

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod param;
pub mod time;

pub use config::{PresetConfig, StageConfig};

pub use color::Color;
pub use error::{FxError, FxResult};
pub use frame::{Frame, FrameBuffer, FrameContext};
pub use param::{ParamDef, ParamSet, ParamType, ParamValue, Signal, TextureRef};
pub use time::{Duration, FrameClock, Timestamp};
