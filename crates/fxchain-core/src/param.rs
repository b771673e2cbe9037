//! Stage parameter schemas and validated parameter storage.
//!
//! Every stage declares its parameters up front as [`ParamDef`]s. Values are
//! checked against the declaration whenever they are written, so a stage
//! never observes a value of the wrong type or outside its range.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::color::Color;
use crate::error::{FxError, FxResult};
use crate::frame::FrameBuffer;

/// Declared type (and valid range) of a stage parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamType {
    Float { min: f64, max: f64 },
    Int { min: i64, max: i64 },
    Bool,
    Vec2,
    Vec3,
    Color,
    Texture,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Float { min, max } => write!(f, "float [{}, {}]", min, max),
            ParamType::Int { min, max } => write!(f, "int [{}, {}]", min, max),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Vec2 => write!(f, "vec2"),
            ParamType::Vec3 => write!(f, "vec3"),
            ParamType::Color => write!(f, "color"),
            ParamType::Texture => write!(f, "texture"),
        }
    }
}

/// A float that varies with frame time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    /// `start + rate * t`, clamped to the parameter range when resolved.
    Linear { start: f64, rate: f64 },
    /// `center + amplitude * sin(2π * frequency * t)`.
    Sine {
        center: f64,
        amplitude: f64,
        frequency: f64,
    },
}

impl Signal {
    /// Value at `seconds`.
    pub fn at(&self, seconds: f64) -> f64 {
        match *self {
            Signal::Linear { start, rate } => start + rate * seconds,
            Signal::Sine {
                center,
                amplitude,
                frequency,
            } => center + amplitude * (std::f64::consts::TAU * frequency * seconds).sin(),
        }
    }

    /// All fields are finite numbers.
    pub fn is_finite(&self) -> bool {
        match *self {
            Signal::Linear { start, rate } => start.is_finite() && rate.is_finite(),
            Signal::Sine {
                center,
                amplitude,
                frequency,
            } => center.is_finite() && amplitude.is_finite() && frequency.is_finite(),
        }
    }

    /// Closed range the signal stays within, if bounded.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match *self {
            Signal::Linear { rate, start } if rate == 0.0 => Some((start, start)),
            Signal::Linear { .. } => None,
            Signal::Sine {
                center, amplitude, ..
            } => Some((center - amplitude.abs(), center + amplitude.abs())),
        }
    }
}

/// A named, shared, read-only image handed to a stage as a parameter.
#[derive(Debug, Clone)]
pub struct TextureRef {
    name: String,
    image: Arc<FrameBuffer>,
}

impl TextureRef {
    pub fn new(name: impl Into<String>, image: FrameBuffer) -> Self {
        Self {
            name: name.into(),
            image: Arc::new(image),
        }
    }

    /// Zero-sized texture; samples as transparent black.
    pub fn empty() -> Self {
        Self::new("none", FrameBuffer::new(0, 0))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &FrameBuffer {
        &self.image
    }
}

impl PartialEq for TextureRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.image, &other.image)
    }
}

impl Serialize for TextureRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// Current value of a stage parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Vec2([f64; 2]),
    Vec3([f64; 3]),
    Color(Color),
    Texture(TextureRef),
    Signal(Signal),
}

impl ParamValue {
    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Float(_) => "float",
            ParamValue::Int(_) => "int",
            ParamValue::Bool(_) => "bool",
            ParamValue::Vec2(_) => "vec2",
            ParamValue::Vec3(_) => "vec3",
            ParamValue::Color(_) => "color",
            ParamValue::Texture(_) => "texture",
            ParamValue::Signal(_) => "signal",
        }
    }

    pub fn is_time_varying(&self) -> bool {
        matches!(self, ParamValue::Signal(_))
    }
}

/// Declaration of one parameter: name, type/range, default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDef {
    pub name: String,
    pub description: String,
    pub param_type: ParamType,
    pub default: ParamValue,
}

impl ParamDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        param_type: ParamType,
        default: ParamValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type,
            default,
        }
    }

    /// Float parameter in `[min, max]`.
    pub fn float(name: impl Into<String>, min: f64, max: f64, default: f64) -> Self {
        Self::new(
            name,
            String::new(),
            ParamType::Float { min, max },
            ParamValue::Float(default),
        )
    }

    pub fn color(name: impl Into<String>, default: Color) -> Self {
        Self::new(name, String::new(), ParamType::Color, ParamValue::Color(default))
    }

    pub fn vec2(name: impl Into<String>, default: [f64; 2]) -> Self {
        Self::new(name, String::new(), ParamType::Vec2, ParamValue::Vec2(default))
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, String::new(), ParamType::Bool, ParamValue::Bool(default))
    }

    pub fn texture(name: impl Into<String>) -> Self {
        Self::new(
            name,
            String::new(),
            ParamType::Texture,
            ParamValue::Texture(TextureRef::empty()),
        )
    }

    /// Attach a human-readable description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check `value` against this declaration.
    pub fn validate(&self, value: &ParamValue) -> FxResult<()> {
        match (&self.param_type, value) {
            (ParamType::Float { min, max }, ParamValue::Float(v)) => {
                if !v.is_finite() || v < min || v > max {
                    return Err(self.out_of_range(*v, *min, *max));
                }
            }
            (ParamType::Float { .. }, ParamValue::Signal(signal)) if !signal.is_finite() => {
                return Err(FxError::invalid_param(&self.name, "signal fields must be finite"));
            }
            (ParamType::Float { min, max }, ParamValue::Signal(signal)) => {
                if let Some((lo, hi)) = signal.bounds() {
                    if lo < *min || hi > *max {
                        return Err(FxError::invalid_param(
                            &self.name,
                            format!(
                                "signal spans [{}, {}], outside [{}, {}]",
                                lo, hi, min, max
                            ),
                        ));
                    }
                }
            }
            (ParamType::Int { min, max }, ParamValue::Int(v)) => {
                if v < min || v > max {
                    return Err(FxError::invalid_param(
                        &self.name,
                        format!("{} is outside [{}, {}]", v, min, max),
                    ));
                }
            }
            (ParamType::Vec2, ParamValue::Vec2(v)) => self.require_finite(v)?,
            (ParamType::Vec3, ParamValue::Vec3(v)) => self.require_finite(v)?,
            (ParamType::Color, ParamValue::Color(c)) => {
                let channels = c.to_array().map(f64::from);
                self.require_finite(&channels)?;
            }
            (ParamType::Bool, ParamValue::Bool(_))
            | (ParamType::Texture, ParamValue::Texture(_)) => {}
            _ => {
                return Err(FxError::invalid_param(
                    &self.name,
                    format!("expected {}, got {}", self.param_type, value.kind()),
                ));
            }
        }
        Ok(())
    }

    fn require_finite(&self, components: &[f64]) -> FxResult<()> {
        if components.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(FxError::invalid_param(
                &self.name,
                format!("components must be finite, got {:?}", components),
            ))
        }
    }

    fn out_of_range(&self, v: f64, min: f64, max: f64) -> FxError {
        FxError::invalid_param(&self.name, format!("{} is outside [{}, {}]", v, min, max))
    }
}

/// Ordered parameter values bound to their schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSet {
    defs: Vec<ParamDef>,
    values: Vec<ParamValue>,
}

impl ParamSet {
    /// Build from a schema, starting every parameter at its default.
    /// Fails if a default violates its own declaration or a name repeats.
    pub fn from_schema(defs: Vec<ParamDef>) -> FxResult<Self> {
        for (i, def) in defs.iter().enumerate() {
            if defs[..i].iter().any(|d| d.name == def.name) {
                return Err(FxError::invalid_param(&def.name, "declared twice"));
            }
            def.validate(&def.default)?;
        }
        let values = defs.iter().map(|d| d.default.clone()).collect();
        Ok(Self { defs, values })
    }

    /// An empty set, for stages without parameters.
    pub fn empty() -> Self {
        Self {
            defs: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn schema(&self) -> &[ParamDef] {
        &self.defs
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Write a value after validating it. The previous value is kept on error.
    pub fn set(&mut self, name: &str, value: ParamValue) -> FxResult<()> {
        let idx = self.index_of(name)?;
        self.defs[idx].validate(&value)?;
        self.values[idx] = value;
        Ok(())
    }

    /// Restore a parameter to its declared default.
    pub fn reset(&mut self, name: &str) -> FxResult<()> {
        let idx = self.index_of(name)?;
        self.values[idx] = self.defs[idx].default.clone();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.defs
            .iter()
            .position(|d| d.name == name)
            .map(|i| &self.values[i])
    }

    /// `(definition, current value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamDef, &ParamValue)> {
        self.defs.iter().zip(self.values.iter())
    }

    /// True when any current value varies with time.
    pub fn is_time_dependent(&self) -> bool {
        self.values.iter().any(ParamValue::is_time_varying)
    }

    /// Float value at `seconds`; signals are evaluated and clamped to range.
    /// Unknown or non-float names read as 0.
    pub fn float(&self, name: &str, seconds: f64) -> f64 {
        let Some(idx) = self.defs.iter().position(|d| d.name == name) else {
            return 0.0;
        };
        let raw = match &self.values[idx] {
            ParamValue::Float(v) => *v,
            ParamValue::Int(v) => *v as f64,
            ParamValue::Signal(signal) => signal.at(seconds),
            _ => return 0.0,
        };
        match self.defs[idx].param_type {
            ParamType::Float { min, max } => raw.clamp(min, max),
            _ => raw,
        }
    }

    pub fn boolean(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ParamValue::Bool(true)))
    }

    pub fn vec2(&self, name: &str) -> [f64; 2] {
        match self.get(name) {
            Some(ParamValue::Vec2(v)) => *v,
            _ => [0.0, 0.0],
        }
    }

    pub fn color(&self, name: &str) -> Color {
        match self.get(name) {
            Some(ParamValue::Color(c)) => *c,
            _ => Color::BLACK,
        }
    }

    pub fn texture(&self, name: &str) -> Option<&TextureRef> {
        match self.get(name) {
            Some(ParamValue::Texture(t)) => Some(t),
            _ => None,
        }
    }

    fn index_of(&self, name: &str) -> FxResult<usize> {
        self.defs
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| FxError::invalid_param(name, "no such parameter"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ParamSet {
        ParamSet::from_schema(vec![
            ParamDef::float("amount", -1.0, 1.0, 0.0),
            ParamDef::boolean("invert", false),
            ParamDef::color("tint", Color::WHITE),
        ])
        .unwrap()
    }

    #[test]
    fn test_non_finite_components_rejected() {
        let mut set = sample_set();
        let nan_tint = Color::rgba(f32::NAN, 0.0, 0.0, 1.0);
        assert!(set.set("tint", ParamValue::Color(nan_tint)).is_err());
        let wobble = Signal::Linear {
            start: 0.0,
            rate: f64::INFINITY,
        };
        assert!(set.set("amount", ParamValue::Signal(wobble)).is_err());
        assert_eq!(set.get("tint"), Some(&ParamValue::Color(Color::WHITE)));
        assert_eq!(set.get("amount"), Some(&ParamValue::Float(0.0)));
    }

    #[test]
    fn test_starts_at_defaults() {
        let set = sample_set();
        assert_eq!(set.float("amount", 0.0), 0.0);
        assert!(!set.boolean("invert"));
        assert_eq!(set.color("tint"), Color::WHITE);
    }

    #[test]
    fn test_set_valid_value() {
        let mut set = sample_set();
        set.set("amount", ParamValue::Float(0.5)).unwrap();
        assert_eq!(set.float("amount", 0.0), 0.5);
    }

    #[test]
    fn test_out_of_range_keeps_previous_value() {
        let mut set = sample_set();
        set.set("amount", ParamValue::Float(0.25)).unwrap();
        let err = set.set("amount", ParamValue::Float(2.0)).unwrap_err();
        assert!(matches!(err, FxError::InvalidParameter { .. }));
        assert_eq!(set.float("amount", 0.0), 0.25);
    }

    #[test]
    fn test_nan_is_rejected() {
        let mut set = sample_set();
        assert!(set.set("amount", ParamValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut set = sample_set();
        let err = set.set("invert", ParamValue::Float(1.0)).unwrap_err();
        assert!(err.to_string().contains("expected bool, got float"));
    }

    #[test]
    fn test_unknown_param_is_rejected() {
        let mut set = sample_set();
        let err = set.set("radius", ParamValue::Float(1.0)).unwrap_err();
        assert!(matches!(err, FxError::InvalidParameter { ref param, .. } if param == "radius"));
    }

    #[test]
    fn test_bad_default_fails_schema() {
        let err = ParamSet::from_schema(vec![ParamDef::float("k", 0.0, 1.0, 3.0)]).unwrap_err();
        assert!(matches!(err, FxError::InvalidParameter { .. }));
    }

    #[test]
    fn test_duplicate_name_fails_schema() {
        let result = ParamSet::from_schema(vec![
            ParamDef::float("k", 0.0, 1.0, 0.0),
            ParamDef::float("k", 0.0, 1.0, 0.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sine_signal_must_fit_range() {
        let mut set = sample_set();
        let wide = Signal::Sine {
            center: 0.5,
            amplitude: 1.0,
            frequency: 1.0,
        };
        assert!(set.set("amount", ParamValue::Signal(wide)).is_err());

        let narrow = Signal::Sine {
            center: 0.0,
            amplitude: 0.5,
            frequency: 1.0,
        };
        set.set("amount", ParamValue::Signal(narrow)).unwrap();
        assert!(set.is_time_dependent());
        assert!((set.float("amount", 0.25) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_linear_signal_is_clamped_when_resolved() {
        let mut set = sample_set();
        set.set(
            "amount",
            ParamValue::Signal(Signal::Linear {
                start: 0.0,
                rate: 1.0,
            }),
        )
        .unwrap();
        assert!((set.float("amount", 0.5) - 0.5).abs() < 1e-9);
        assert_eq!(set.float("amount", 10.0), 1.0);
    }

    #[test]
    fn test_reset_restores_default() {
        let mut set = sample_set();
        set.set("invert", ParamValue::Bool(true)).unwrap();
        set.reset("invert").unwrap();
        assert!(!set.boolean("invert"));
    }

    #[test]
    fn test_texture_refs_compare_by_identity() {
        let t = TextureRef::new("overlay", FrameBuffer::solid(1, 1, &Color::RED));
        let same = t.clone();
        let other = TextureRef::new("overlay", FrameBuffer::solid(1, 1, &Color::RED));
        assert_eq!(t, same);
        assert_ne!(t, other);
    }
}
