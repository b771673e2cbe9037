//! A pipeline stage: an identified, toggleable effect with its parameters.

use fxchain_core::{FrameBuffer, FrameContext, FxError, FxResult, ParamSet, ParamValue};

use crate::effect::Effect;

/// One step of a [`Composer`](crate::Composer) pipeline.
///
/// Parameter values given before the stage joins a pipeline are held back
/// and validated when it is prepared, so a bad initial value surfaces as a
/// `StageInitialization` error from `add_stage`.
pub struct Stage {
    id: String,
    enabled: bool,
    effect: Box<dyn Effect>,
    params: ParamSet,
    initial: Vec<(String, ParamValue)>,
    prepared: bool,
}

impl Stage {
    pub fn new(id: impl Into<String>, effect: impl Effect + 'static) -> Self {
        Self::boxed(id, Box::new(effect))
    }

    pub fn boxed(id: impl Into<String>, effect: Box<dyn Effect>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            effect,
            params: ParamSet::empty(),
            initial: Vec::new(),
            prepared: false,
        }
    }

    /// Initial value for a parameter, checked when the stage is prepared.
    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.initial.push((name.into(), value));
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        self.effect.kind()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Current parameter values. Empty until the stage is prepared.
    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Validated write. Before preparation the value is checked against the
    /// effect's declared schema and queued; effects whose schema only exists
    /// once prepared are checked at [`prepare`](Self::prepare).
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> FxResult<()> {
        if self.prepared {
            return self.params.set(name, value);
        }
        let schema = self.effect.schema();
        if !schema.is_empty() {
            ParamSet::from_schema(schema)?.set(name, value.clone())?;
        }
        self.initial.push((name.to_string(), value));
        Ok(())
    }

    /// Whether the effect carries state from one frame to the next.
    pub fn is_stateful(&self) -> bool {
        self.effect.is_stateful()
    }

    pub fn is_time_dependent(&self) -> bool {
        self.effect.is_time_dependent() || self.params.is_time_dependent()
    }

    pub fn accumulation_size(&self) -> Option<(u32, u32)> {
        self.effect.accumulation_size()
    }

    /// Prepare the effect and bind its schema. Idempotent once it succeeds.
    pub fn prepare(&mut self) -> FxResult<()> {
        if self.prepared {
            return Ok(());
        }
        let id = &self.id;
        self.effect
            .prepare()
            .map_err(|e| FxError::stage_init(id, e))?;
        let mut params =
            ParamSet::from_schema(self.effect.schema()).map_err(|e| FxError::stage_init(id, e))?;
        for (name, value) in &self.initial {
            params
                .set(name, value.clone())
                .map_err(|e| FxError::stage_init(id, e))?;
        }
        self.params = params;
        self.initial.clear();
        self.prepared = true;
        Ok(())
    }

    pub(crate) fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        self.effect.apply(input, output, &self.params, ctx)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.effect.resize(width, height);
    }

    /// Drop accumulation state held by the effect.
    pub fn release(&mut self) {
        self.effect.release();
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("kind", &self.effect.kind())
            .field("enabled", &self.enabled)
            .field("prepared", &self.prepared)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{ExprEffect, InvertEffect};

    #[test]
    fn test_initial_values_apply_on_prepare() {
        let mut stage =
            Stage::new("inv", InvertEffect).with_param("intensity", ParamValue::Float(0.25));
        assert!(stage.params().is_empty());
        stage.prepare().unwrap();
        assert_eq!(stage.param("intensity"), Some(&ParamValue::Float(0.25)));
    }

    #[test]
    fn test_bad_initial_value_is_initialization_error() {
        let mut stage =
            Stage::new("inv", InvertEffect).with_param("intensity", ParamValue::Float(3.0));
        let err = stage.prepare().unwrap_err();
        assert!(matches!(err, FxError::StageInitialization { ref id, .. } if id == "inv"));
        assert!(!stage.is_prepared());
    }

    #[test]
    fn test_bad_program_is_initialization_error() {
        let mut stage = Stage::new("fx", ExprEffect::new("@effect x { nope() }"));
        let err = stage.prepare().unwrap_err();
        assert!(err.to_string().contains("unknown function 'nope'"));
    }

    #[test]
    fn test_unprepared_writes_are_validated() {
        let mut stage = Stage::new("inv", InvertEffect);
        for (name, value) in [
            ("intensity", ParamValue::Bool(true)),
            ("intensity", ParamValue::Float(2.0)),
            ("nonexistent", ParamValue::Float(0.0)),
        ] {
            let err = stage.set_param(name, value).unwrap_err();
            assert!(matches!(err, FxError::InvalidParameter { .. }));
        }
        stage.set_param("intensity", ParamValue::Float(0.5)).unwrap();
        stage.prepare().unwrap();
        assert_eq!(stage.param("intensity"), Some(&ParamValue::Float(0.5)));
    }

    #[test]
    fn test_expr_writes_wait_for_prepare() {
        let fx = ExprEffect::new("@effect dim(k: 0.5) { source() * k }");
        let mut stage = Stage::new("fx", fx);
        stage.set_param("k", ParamValue::Float(0.25)).unwrap();
        stage.prepare().unwrap();
        assert_eq!(stage.param("k"), Some(&ParamValue::Float(0.25)));
    }

    #[test]
    fn test_prepared_writes_are_validated() {
        let mut stage = Stage::new("inv", InvertEffect);
        stage.prepare().unwrap();
        assert!(stage.set_param("intensity", ParamValue::Bool(true)).is_err());
        assert_eq!(stage.param("intensity"), Some(&ParamValue::Float(1.0)));
    }
}
