//! The pipeline composer: ordered stages folded over a source image.

use std::path::Path;

use fxchain_core::config::param_value_from_toml;
use fxchain_core::{FrameBuffer, FrameContext, FxError, FxResult, ParamValue, PresetConfig};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::registry::EffectRegistry;
use crate::stage::Stage;

/// What happened while producing the last frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    /// Ids of the stages that ran, in order.
    pub executed: Vec<String>,
    /// No stateful or time-dependent stage ran, so the same source and
    /// parameters reproduce this frame exactly.
    pub deterministic: bool,
    /// Source dimensions differed from the size set by [`Composer::resize`].
    pub resolution_mismatch: bool,
}

/// Owns an ordered list of stages and runs the enabled ones once per frame.
///
/// Rendering is double-buffered: each stage reads the front buffer and writes
/// the back buffer, then the two swap. All mutation goes through `&mut self`,
/// so parameters cannot change while a frame is in flight.
#[derive(Debug, Default)]
pub struct Composer {
    stages: Vec<Stage>,
    resolution: Option<(u32, u32)>,
    front: FrameBuffer,
    back: FrameBuffer,
    last_report: Option<FrameReport>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty composer with a known output size.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        let mut composer = Self::default();
        composer.resolution = Some((width, height));
        composer
    }

    /// Build from an initial stage list, in order.
    pub fn with_stages(stages: impl IntoIterator<Item = Stage>) -> FxResult<Self> {
        let mut composer = Self::new();
        for stage in stages {
            composer.add_stage(stage, None)?;
        }
        Ok(composer)
    }

    /// Build a pipeline from a preset, creating effects through `registry`.
    /// Texture parameters are decoded with `load_texture`.
    pub fn from_preset(
        preset: &PresetConfig,
        registry: &EffectRegistry,
        load_texture: &mut dyn FnMut(&Path) -> FxResult<FrameBuffer>,
    ) -> FxResult<Self> {
        let mut composer = Self::with_resolution(preset.output.width, preset.output.height);
        for cfg in &preset.stages {
            let effect = registry
                .create(&cfg.kind, cfg.source.as_deref())
                .map_err(|e| FxError::stage_init(&cfg.id, e))?;
            let mut stage = Stage::boxed(&cfg.id, effect).with_enabled(cfg.enabled);
            // The schema is only known once prepared.
            stage.prepare()?;
            for (name, raw) in &cfg.params {
                let def = stage
                    .params()
                    .schema()
                    .iter()
                    .find(|d| &d.name == name)
                    .cloned()
                    .ok_or_else(|| FxError::invalid_param(name, "no such parameter"))?;
                let value = param_value_from_toml(&def, raw, load_texture)?;
                stage.set_param(name, value)?;
            }
            composer.add_stage(stage, None)?;
        }
        Ok(composer)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id() == id)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_ids(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::id).collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.stages.iter().filter(|s| s.is_enabled()).count()
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Insert at `position`, or append when `None`. The pipeline is left
    /// untouched on error.
    pub fn add_stage(&mut self, mut stage: Stage, position: Option<usize>) -> FxResult<()> {
        if self.index_of(stage.id()).is_some() {
            return Err(FxError::InvalidStage {
                id: stage.id().to_string(),
            });
        }
        let len = self.stages.len();
        let position = position.unwrap_or(len);
        if position > len {
            return Err(FxError::InvalidPosition { position, len });
        }
        stage.prepare()?;
        if let Some((w, h)) = self.resolution {
            stage.resize(w, h);
        }
        debug!(stage = stage.id(), kind = stage.kind(), position, "stage added");
        self.stages.insert(position, stage);
        Ok(())
    }

    /// Detach a stage. Its accumulation state goes with it; call
    /// [`Stage::release`] when done.
    pub fn remove_stage(&mut self, id: &str) -> FxResult<Stage> {
        let index = self.require(id)?;
        let stage = self.stages.remove(index);
        debug!(stage = id, "stage removed");
        Ok(stage)
    }

    /// Move a stage so that it ends up at `new_position`.
    pub fn reorder(&mut self, id: &str, new_position: usize) -> FxResult<()> {
        let index = self.require(id)?;
        let len = self.stages.len();
        if new_position >= len {
            return Err(FxError::InvalidPosition {
                position: new_position,
                len,
            });
        }
        let stage = self.stages.remove(index);
        self.stages.insert(new_position, stage);
        debug!(stage = id, from = index, to = new_position, "stage moved");
        Ok(())
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> FxResult<()> {
        let index = self.require(id)?;
        self.stages[index].set_enabled(enabled);
        debug!(stage = id, enabled, "stage toggled");
        Ok(())
    }

    /// Validated parameter write; the stored value is unchanged on error.
    pub fn set_param(&mut self, id: &str, name: &str, value: ParamValue) -> FxResult<()> {
        let index = self.require(id)?;
        self.stages[index].set_param(name, value)
    }

    /// Record the output size and let every stage reallocate.
    pub fn resize(&mut self, width: u32, height: u32) {
        debug!(width, height, "composer resized");
        self.resolution = Some((width, height));
        for stage in &mut self.stages {
            stage.resize(width, height);
        }
    }

    /// Run the enabled stages over `source` in order and return the result.
    ///
    /// With no enabled stage the result is a copy of `source`. A failing stage
    /// drops the frame with [`FxError::FrameDropped`]; the composer remains
    /// usable and the caller may disable the stage and carry on.
    pub fn render(&mut self, source: &FrameBuffer, ctx: &FrameContext) -> FxResult<FrameBuffer> {
        let resolution_mismatch = match self.resolution {
            Some(expected) if expected != source.dimensions() => {
                warn!(
                    expected = ?expected,
                    actual = ?source.dimensions(),
                    "source size differs from composer resolution"
                );
                true
            }
            _ => false,
        };

        self.front.copy_from(source);
        let mut executed = Vec::new();
        let mut deterministic = true;

        for stage in self.stages.iter_mut().filter(|s| s.is_enabled()) {
            trace!(stage = stage.id(), kind = stage.kind(), frame = ctx.frame.index, "running stage");
            self.back.reshape(self.front.width, self.front.height);
            stage
                .apply(&self.front, &mut self.back, ctx)
                .map_err(|e| FxError::FrameDropped {
                    stage: stage.id().to_string(),
                    reason: e.to_string(),
                })?;
            std::mem::swap(&mut self.front, &mut self.back);
            deterministic &= !(stage.is_stateful() || stage.is_time_dependent());
            executed.push(stage.id().to_string());
        }

        self.last_report = Some(FrameReport {
            frame: ctx.frame.index,
            executed,
            deterministic,
            resolution_mismatch,
        });
        Ok(self.front.clone())
    }

    /// Release every stage and empty the pipeline.
    pub fn clear(&mut self) {
        for mut stage in self.stages.drain(..) {
            stage.release();
        }
        self.front = FrameBuffer::default();
        self.back = FrameBuffer::default();
        self.last_report = None;
        debug!("pipeline cleared");
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id() == id)
    }

    fn require(&self, id: &str) -> FxResult<usize> {
        self.index_of(id)
            .ok_or_else(|| FxError::NotFound { id: id.to_string() })
    }
}

impl Drop for Composer {
    fn drop(&mut self) {
        for stage in &mut self.stages {
            stage.release();
        }
    }
}
