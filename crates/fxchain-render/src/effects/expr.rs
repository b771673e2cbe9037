//! Stages written in the fxchain expression language.

use fxchain_core::color::unit_to_u8;
use fxchain_core::frame::BYTES_PER_PIXEL;
use fxchain_core::{FrameBuffer, FrameContext, FxError, FxResult, ParamDef, ParamSet};
use fxchain_fx::{PixelEnv, Program, Value};

use crate::effect::Effect;

/// Range given to every program parameter.
pub const EXPR_PARAM_LIMIT: f64 = 1.0e6;

/// A per-pixel program compiled from source when the stage is prepared.
#[derive(Debug)]
pub struct ExprEffect {
    source: String,
    program: Option<Program>,
    values: Vec<f32>,
    locals: Vec<Value>,
}

impl ExprEffect {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            program: None,
            values: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled program, once prepared.
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }
}

impl Effect for ExprEffect {
    fn kind(&self) -> &str {
        "expr"
    }

    fn schema(&self) -> Vec<ParamDef> {
        let Some(program) = &self.program else {
            return Vec::new();
        };
        program
            .params()
            .iter()
            .map(|p| ParamDef::float(&p.name, -EXPR_PARAM_LIMIT, EXPR_PARAM_LIMIT, p.default))
            .collect()
    }

    fn prepare(&mut self) -> FxResult<()> {
        if self.program.is_none() {
            self.program = Some(fxchain_fx::compile(&self.source)?);
        }
        Ok(())
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let Some(program) = &self.program else {
            return Err(FxError::Config("expression stage used before prepare".into()));
        };
        let seconds = ctx.seconds();
        self.values.clear();
        self.values.extend(
            program
                .params()
                .iter()
                .map(|p| params.float(&p.name, seconds) as f32),
        );

        output.reshape(input.width, input.height);
        let (w, h) = (input.width.max(1) as usize, input.height.max(1) as f32);
        let mut env = PixelEnv {
            source: [0.0; 4],
            u: 0.0,
            v: 0.0,
            time: seconds as f32,
            frame: ctx.frame.index as f32,
        };
        let pixels = input
            .data
            .chunks_exact(BYTES_PER_PIXEL)
            .zip(output.data.chunks_exact_mut(BYTES_PER_PIXEL));
        for (i, (src, dst)) in pixels.enumerate() {
            env.u = ((i % w) as f32 + 0.5) / w as f32;
            env.v = ((i / w) as f32 + 0.5) / h;
            for (c, &b) in env.source.iter_mut().zip(src) {
                *c = b as f32 / 255.0;
            }
            let rgba = program.eval(&env, &self.values, &mut self.locals);
            for (d, c) in dst.iter_mut().zip(rgba) {
                *d = unit_to_u8(c);
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        self.locals = Vec::new();
    }

    fn is_time_dependent(&self) -> bool {
        self.program.as_ref().is_some_and(Program::uses_time)
    }
}
