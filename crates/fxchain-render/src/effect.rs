//! The [`Effect`] trait implemented by every stage transform.

use fxchain_core::frame::BYTES_PER_PIXEL;
use fxchain_core::{Color, FrameBuffer, FrameContext, FxResult, ParamDef, ParamSet};

/// An image-to-image transform with a declared parameter schema.
///
/// An effect instance belongs to exactly one stage, so it may keep state
/// between frames (an accumulation buffer, a compiled program). The composer
/// calls [`prepare`](Effect::prepare) once when the stage joins a pipeline,
/// then [`apply`](Effect::apply) once per frame while the stage is enabled.
pub trait Effect: Send {
    /// Registry name of this effect kind, e.g. `"invert"`.
    fn kind(&self) -> &str;

    /// Parameter declarations. Only meaningful after a successful `prepare`
    /// for effects whose schema is computed (expression programs).
    fn schema(&self) -> Vec<ParamDef>;

    /// Acquire whatever the transform needs before its first frame.
    fn prepare(&mut self) -> FxResult<()> {
        Ok(())
    }

    /// Read `input`, write the result to `output`.
    ///
    /// `output` arrives with the same dimensions as `input` but unspecified
    /// contents; it never aliases `input`.
    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()>;

    /// Output resolution changed; reallocate resolution-dependent buffers.
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Free accumulation state. The effect may be prepared again afterwards.
    fn release(&mut self) {}

    /// Whether output depends on frames seen before the current one.
    fn is_stateful(&self) -> bool {
        false
    }

    /// Whether output depends on `FrameContext` time even with fixed params.
    fn is_time_dependent(&self) -> bool {
        false
    }

    /// Dimensions of the accumulation buffer, if one is allocated.
    fn accumulation_size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Write `f(x, y, color)` for every pixel of `input` into `output`.
pub fn map_pixels(
    input: &FrameBuffer,
    output: &mut FrameBuffer,
    mut f: impl FnMut(u32, u32, Color) -> Color,
) {
    output.reshape(input.width, input.height);
    let width = input.width.max(1) as usize;
    let pixels = input
        .data
        .chunks_exact(BYTES_PER_PIXEL)
        .zip(output.data.chunks_exact_mut(BYTES_PER_PIXEL));
    for (i, (src, dst)) in pixels.enumerate() {
        let x = (i % width) as u32;
        let y = (i / width) as u32;
        let color = Color::from_rgba8([src[0], src[1], src[2], src[3]]);
        dst.copy_from_slice(&f(x, y, color).to_rgba8());
    }
}
