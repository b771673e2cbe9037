//! Effects that accumulate across frames.

use fxchain_core::frame::BYTES_PER_PIXEL;
use fxchain_core::{color::unit_to_u8, FrameBuffer, FrameContext, FxResult, ParamDef, ParamSet};
use tracing::{debug, warn};

use crate::effect::Effect;

/// Previous output at full precision.
#[derive(Debug)]
struct History {
    width: u32,
    height: u32,
    data: Vec<f32>,
    /// False until the first frame at this size has been seen.
    primed: bool,
}

impl History {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; (width as usize) * (height as usize) * BYTES_PER_PIXEL],
            primed: false,
        }
    }

    fn prime(&mut self, input: &FrameBuffer) {
        self.width = input.width;
        self.height = input.height;
        self.data.clear();
        self.data.extend(input.data.iter().map(|&b| b as f32 / 255.0));
        self.primed = true;
    }
}

/// Motion trail: `out = damp * previous + (1 - damp) * input`.
///
/// The history is allocated lazily by the first frame or eagerly by
/// [`Effect::resize`], and starts out as a copy of the first input it sees.
#[derive(Debug, Default)]
pub struct AfterimageEffect {
    history: Option<History>,
}

impl AfterimageEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for AfterimageEffect {
    fn kind(&self) -> &str {
        "afterimage"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![ParamDef::float("damp", 0.0, 1.0, 0.9).describe("share of the previous frame kept")]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let damp = params.float("damp", ctx.seconds()) as f32;
        let history = self
            .history
            .get_or_insert_with(|| History::new(input.width, input.height));

        if history.primed && (history.width, history.height) != input.dimensions() {
            warn!(
                history = ?(history.width, history.height),
                input = ?input.dimensions(),
                "afterimage input size changed; resetting trail"
            );
            history.primed = false;
        }
        if !history.primed {
            history.prime(input);
            output.copy_from(input);
            return Ok(());
        }

        output.reshape(input.width, input.height);
        for ((prev, &src), dst) in history
            .data
            .iter_mut()
            .zip(&input.data)
            .zip(output.data.iter_mut())
        {
            *prev = damp * *prev + (1.0 - damp) * (src as f32 / 255.0);
            *dst = unit_to_u8(*prev);
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.accumulation_size() == Some((width, height)) {
            return;
        }
        debug!(width, height, "afterimage history reallocated");
        self.history = Some(History::new(width, height));
    }

    fn release(&mut self) {
        self.history = None;
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn accumulation_size(&self) -> Option<(u32, u32)> {
        self.history.as_ref().map(|h| (h.width, h.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxchain_core::Color;

    fn params() -> ParamSet {
        ParamSet::from_schema(AfterimageEffect::new().schema()).unwrap()
    }

    fn step(fx: &mut AfterimageEffect, input: &FrameBuffer) -> FrameBuffer {
        let mut out = FrameBuffer::new(0, 0);
        let ctx = FrameContext::at_frame(0, 30.0, input.width, input.height);
        fx.apply(input, &mut out, &params(), &ctx).unwrap();
        out
    }

    #[test]
    fn test_first_frame_passes_through() {
        let mut fx = AfterimageEffect::new();
        let input = FrameBuffer::solid(2, 2, &Color::gray(0.3));
        assert_eq!(step(&mut fx, &input), input);
        assert_eq!(fx.accumulation_size(), Some((2, 2)));
    }

    #[test]
    fn test_trail_decays_toward_new_input() {
        let mut fx = AfterimageEffect::new();
        step(&mut fx, &FrameBuffer::solid(1, 1, &Color::BLACK));
        let white = FrameBuffer::solid(1, 1, &Color::WHITE);
        let first = step(&mut fx, &white).get_pixel(0, 0).unwrap()[0];
        assert_eq!(first, 26); // 0.1 * 255
    }

    #[test]
    fn test_size_change_resets_to_input() {
        let mut fx = AfterimageEffect::new();
        step(&mut fx, &FrameBuffer::solid(2, 2, &Color::BLACK));
        let bigger = FrameBuffer::solid(3, 3, &Color::WHITE);
        assert_eq!(step(&mut fx, &bigger), bigger);
        assert_eq!(fx.accumulation_size(), Some((3, 3)));
    }

    #[test]
    fn test_resize_and_release() {
        let mut fx = AfterimageEffect::new();
        fx.resize(4, 3);
        assert_eq!(fx.accumulation_size(), Some((4, 3)));
        fx.release();
        assert_eq!(fx.accumulation_size(), None);
    }

    #[test]
    fn test_same_size_resize_keeps_trail() {
        let mut fx = AfterimageEffect::new();
        step(&mut fx, &FrameBuffer::solid(1, 1, &Color::BLACK));
        fx.resize(1, 1);
        let white = FrameBuffer::solid(1, 1, &Color::WHITE);
        assert_eq!(step(&mut fx, &white).get_pixel(0, 0).unwrap()[0], 26);
    }
}
