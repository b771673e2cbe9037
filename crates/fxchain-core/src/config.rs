//! Pipeline presets stored as TOML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{FxError, FxResult};
use crate::frame::FrameBuffer;
use crate::param::{ParamDef, ParamType, ParamValue, Signal, TextureRef};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: f64,
}

fn default_fps() -> f64 {
    30.0
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: default_fps(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// One `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub id: String,
    pub kind: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Expression-language program, for `kind = "expr"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PresetConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "stage")]
    pub stages: Vec<StageConfig>,
}

impl PresetConfig {
    pub fn from_toml_str(contents: &str) -> FxResult<Self> {
        toml::from_str(contents).map_err(|e| FxError::Config(e.to_string()))
    }

    pub fn load_from_file(path: &Path) -> FxResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> FxResult<String> {
        toml::to_string_pretty(self).map_err(|e| FxError::Config(e.to_string()))
    }

    pub fn save_to_file(&self, path: &Path) -> FxResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

/// Convert a TOML value into a [`ParamValue`] of the shape `def` expects.
///
/// Textures are written as `{ texture = "path" }` and resolved through
/// `load_texture`, which keeps image decoding out of this crate. The result
/// is not range-checked here; the stage does that when the value is set.
pub fn param_value_from_toml(
    def: &ParamDef,
    value: &toml::Value,
    load_texture: &mut dyn FnMut(&Path) -> FxResult<FrameBuffer>,
) -> FxResult<ParamValue> {
    let mismatch = || {
        FxError::invalid_param(
            &def.name,
            format!("expected {}, got TOML {}", def.param_type, value.type_str()),
        )
    };

    match (&def.param_type, value) {
        (ParamType::Float { .. }, toml::Value::Table(table)) => {
            signal_from_table(&def.name, table).map(ParamValue::Signal)
        }
        (ParamType::Float { .. }, v) => number(v).map(ParamValue::Float).ok_or_else(mismatch),
        (ParamType::Int { .. }, toml::Value::Integer(i)) => Ok(ParamValue::Int(*i)),
        (ParamType::Bool, toml::Value::Boolean(b)) => Ok(ParamValue::Bool(*b)),
        (ParamType::Vec2, toml::Value::Array(items)) => {
            let v = numbers::<2>(items).ok_or_else(mismatch)?;
            Ok(ParamValue::Vec2(v))
        }
        (ParamType::Vec3, toml::Value::Array(items)) => {
            let v = numbers::<3>(items).ok_or_else(mismatch)?;
            Ok(ParamValue::Vec3(v))
        }
        (ParamType::Color, toml::Value::String(hex)) => Color::from_hex(hex)
            .map(ParamValue::Color)
            .map_err(|e| FxError::invalid_param(&def.name, format!("'{}': {}", hex, e))),
        (ParamType::Texture, toml::Value::Table(table)) => {
            let path = table
                .get("texture")
                .and_then(toml::Value::as_str)
                .ok_or_else(mismatch)?;
            let path = PathBuf::from(path);
            let image = load_texture(&path)?;
            Ok(ParamValue::Texture(TextureRef::new(
                path.display().to_string(),
                image,
            )))
        }
        _ => Err(mismatch()),
    }
}

fn signal_from_table(name: &str, table: &toml::Table) -> FxResult<Signal> {
    let field = |key: &str, fallback: Option<f64>| -> FxResult<f64> {
        match table.get(key) {
            Some(v) => number(v).ok_or_else(|| {
                FxError::invalid_param(name, format!("signal field '{}' must be a number", key))
            }),
            None => fallback
                .ok_or_else(|| FxError::invalid_param(name, format!("signal needs '{}'", key))),
        }
    };

    match table.get("signal").and_then(toml::Value::as_str) {
        Some("linear") => Ok(Signal::Linear {
            start: field("start", Some(0.0))?,
            rate: field("rate", None)?,
        }),
        Some("sine") => Ok(Signal::Sine {
            center: field("center", Some(0.0))?,
            amplitude: field("amplitude", None)?,
            frequency: field("frequency", Some(1.0))?,
        }),
        Some(other) => Err(FxError::invalid_param(
            name,
            format!("unknown signal '{}'", other),
        )),
        None => Err(FxError::invalid_param(name, "table value needs a 'signal' key")),
    }
}

fn number(v: &toml::Value) -> Option<f64> {
    match v {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

fn numbers<const N: usize>(items: &[toml::Value]) -> Option<[f64; N]> {
    if items.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = number(item)?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESET: &str = r##"
[output]
width = 64
height = 32

[[stage]]
id = "trail"
kind = "afterimage"
[stage.params]
damp = 0.9

[[stage]]
id = "glow"
kind = "expr"
enabled = false
source = "@effect glow(k: 0.5) { source() -> brightness(k) }"
"##;

    fn no_textures(_: &Path) -> FxResult<FrameBuffer> {
        Err(FxError::Config("textures not expected".into()))
    }

    #[test]
    fn test_parses_stages_in_order() {
        let preset = PresetConfig::from_toml_str(PRESET).unwrap();
        assert_eq!(preset.output.width, 64);
        assert_eq!(preset.output.fps, 30.0);
        let ids: Vec<_> = preset.stages.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["trail", "glow"]);
        assert!(preset.stages[0].enabled);
        assert!(!preset.stages[1].enabled);
        assert!(preset.stages[1].source.as_deref().unwrap().contains("@effect"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let preset = PresetConfig::from_toml_str(PRESET).unwrap();
        let text = preset.to_toml_string().unwrap();
        let again = PresetConfig::from_toml_str(&text).unwrap();
        assert_eq!(again.stages.len(), 2);
        assert_eq!(again.stages[0].params.get("damp"), preset.stages[0].params.get("damp"));
    }

    #[test]
    fn test_malformed_preset_is_config_error() {
        let err = PresetConfig::from_toml_str("[[stage]]\nkind = 3").unwrap_err();
        assert!(matches!(err, FxError::Config(_)));
    }

    #[test]
    fn test_converts_scalar_shapes() {
        let def = ParamDef::float("k", 0.0, 1.0, 0.0);
        let v = param_value_from_toml(&def, &toml::Value::Integer(1), &mut no_textures).unwrap();
        assert_eq!(v, ParamValue::Float(1.0));

        let def = ParamDef::vec2("center", [0.5, 0.5]);
        let arr = toml::Value::Array(vec![toml::Value::Float(0.25), toml::Value::Integer(1)]);
        let v = param_value_from_toml(&def, &arr, &mut no_textures).unwrap();
        assert_eq!(v, ParamValue::Vec2([0.25, 1.0]));

        let def = ParamDef::color("tint", Color::WHITE);
        let v = param_value_from_toml(&def, &toml::Value::String("#FF0000".into()), &mut no_textures)
            .unwrap();
        assert_eq!(v, ParamValue::Color(Color::RED));
    }

    #[test]
    fn test_converts_signal_tables() {
        let def = ParamDef::float("k", -1.0, 1.0, 0.0);
        let table: toml::Table =
            toml::from_str("signal = \"sine\"\namplitude = 0.5\nfrequency = 2.0").unwrap();
        let v = param_value_from_toml(&def, &toml::Value::Table(table), &mut no_textures).unwrap();
        assert_eq!(
            v,
            ParamValue::Signal(Signal::Sine {
                center: 0.0,
                amplitude: 0.5,
                frequency: 2.0
            })
        );
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let def = ParamDef::boolean("on", false);
        let err =
            param_value_from_toml(&def, &toml::Value::Float(1.0), &mut no_textures).unwrap_err();
        assert!(matches!(err, FxError::InvalidParameter { .. }));
    }

    #[test]
    fn test_resolves_textures_through_loader() {
        let def = ParamDef::texture("overlay");
        let table: toml::Table = toml::from_str("texture = \"overlay.png\"").unwrap();
        let mut loader = |p: &Path| -> FxResult<FrameBuffer> {
            assert_eq!(p, Path::new("overlay.png"));
            Ok(FrameBuffer::solid(2, 2, &Color::BLUE))
        };
        let v = param_value_from_toml(&def, &toml::Value::Table(table), &mut loader).unwrap();
        match v {
            ParamValue::Texture(t) => assert_eq!(t.image().dimensions(), (2, 2)),
            other => panic!("expected texture, got {:?}", other),
        }
    }
}
