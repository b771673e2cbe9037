//! Effect registry: by-name construction of stage effects.

use std::collections::BTreeMap;

use fxchain_core::{FxError, FxResult, ParamDef};
use serde::Serialize;
use tracing::info;

use crate::effect::Effect;
use crate::effects::{
    AfterimageEffect, BlendEffect, BrightnessEffect, ExprEffect, GrayscaleEffect, InvertEffect,
    SepiaEffect, ThresholdEffect, TintEffect, VignetteEffect,
};

/// Builds a fresh effect instance. The argument is the program source for
/// kinds that take one.
pub type EffectConstructor = fn(Option<&str>) -> FxResult<Box<dyn Effect>>;

struct Entry {
    description: &'static str,
    construct: EffectConstructor,
}

/// Summary of a registered kind, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct EffectInfo {
    pub kind: String,
    pub description: String,
    /// Empty for kinds whose parameters come from their source.
    pub params: Vec<ParamDef>,
}

/// Every stage gets its own instance, so registered kinds are constructors
/// rather than shared effect objects.
pub struct EffectRegistry {
    entries: BTreeMap<String, Entry>,
}

fn simple<E: Effect + Default + 'static>(_: Option<&str>) -> FxResult<Box<dyn Effect>> {
    Ok(Box::new(E::default()))
}

fn expr(source: Option<&str>) -> FxResult<Box<dyn Effect>> {
    let source = source.ok_or_else(|| FxError::Config("expr stage needs a 'source' program".into()))?;
    Ok(Box::new(ExprEffect::new(source)))
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in effect kind.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // Color
        registry.register("invert", "mix toward the complementary color", simple::<InvertEffect>);
        registry.register("threshold", "black or white by luminance", simple::<ThresholdEffect>);
        registry.register("grayscale", "mix toward luminance", simple::<GrayscaleEffect>);
        registry.register("sepia", "warm monochrome tone", simple::<SepiaEffect>);
        registry.register("brightness", "additive brightness offset", simple::<BrightnessEffect>);
        registry.register("tint", "multiply by a color", simple::<TintEffect>);

        // Stylize
        registry.register("vignette", "radial edge darkening", simple::<VignetteEffect>);
        registry.register("blend", "overlay a texture", simple::<BlendEffect>);

        // Temporal
        registry.register("afterimage", "exponential motion trail", simple::<AfterimageEffect>);

        registry.register("expr", "per-pixel expression program", expr);

        info!(count = registry.entries.len(), "registered built-in effects");
        registry
    }

    /// Register a kind, replacing any previous one with the same name.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        description: &'static str,
        construct: EffectConstructor,
    ) {
        self.entries.insert(
            kind.into(),
            Entry {
                description,
                construct,
            },
        );
    }

    /// Register a kind, failing if the name is taken.
    pub fn try_register(
        &mut self,
        kind: impl Into<String>,
        description: &'static str,
        construct: EffectConstructor,
    ) -> FxResult<()> {
        let kind = kind.into();
        if self.entries.contains_key(&kind) {
            return Err(FxError::Config(format!(
                "effect kind '{}' is already registered",
                kind
            )));
        }
        self.register(kind, description, construct);
        Ok(())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// New effect instance of `kind`.
    pub fn create(&self, kind: &str, source: Option<&str>) -> FxResult<Box<dyn Effect>> {
        let entry = self
            .entries
            .get(kind)
            .ok_or_else(|| FxError::Config(format!("unknown effect kind '{}'", kind)))?;
        (entry.construct)(source)
    }

    /// Registered kinds with their schemas, sorted by name.
    pub fn list(&self) -> Vec<EffectInfo> {
        self.entries
            .iter()
            .map(|(kind, entry)| EffectInfo {
                kind: kind.clone(),
                description: entry.description.to_string(),
                params: (entry.construct)(None)
                    .map(|e| e.schema())
                    .unwrap_or_default(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let reg = EffectRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.create("invert", None).is_err());
        assert!(reg.list().is_empty());
    }

    #[test]
    fn test_with_builtins_has_all_effects() {
        let reg = EffectRegistry::with_builtins();
        assert_eq!(reg.len(), 10);
        for kind in ["invert", "threshold", "afterimage", "expr"] {
            assert!(reg.contains(kind), "missing {}", kind);
        }
    }

    #[test]
    fn test_create_builds_independent_instances() {
        let reg = EffectRegistry::with_builtins();
        let a = reg.create("afterimage", None).unwrap();
        assert_eq!(a.kind(), "afterimage");
        assert!(a.is_stateful());
    }

    #[test]
    fn test_expr_requires_source() {
        let reg = EffectRegistry::with_builtins();
        assert!(matches!(reg.create("expr", None), Err(FxError::Config(_))));
        let fx = reg.create("expr", Some("@effect a { source() }")).unwrap();
        assert_eq!(fx.kind(), "expr");
    }

    #[test]
    fn test_list_is_sorted_with_schemas() {
        let reg = EffectRegistry::with_builtins();
        let list = reg.list();
        let kinds: Vec<_> = list.iter().map(|i| i.kind.as_str()).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);
        let vignette = list.iter().find(|i| i.kind == "vignette").unwrap();
        assert_eq!(vignette.params.len(), 2);
    }

    #[test]
    fn test_try_register_rejects_duplicates() {
        let mut reg = EffectRegistry::with_builtins();
        let err = reg
            .try_register("invert", "again", simple::<InvertEffect>)
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }
}
