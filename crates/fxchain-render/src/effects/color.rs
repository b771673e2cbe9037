//! Per-pixel color adjustments.

use fxchain_core::{Color, FrameBuffer, FrameContext, FxResult, ParamDef, ParamSet};

use crate::effect::{map_pixels, Effect};

fn mix_rgb(from: Color, to: [f32; 3], t: f32) -> Color {
    Color::rgba(
        from.r + (to[0] - from.r) * t,
        from.g + (to[1] - from.g) * t,
        from.b + (to[2] - from.b) * t,
        from.a,
    )
}

fn intensity_param(description: &str) -> ParamDef {
    ParamDef::float("intensity", 0.0, 1.0, 1.0).describe(description)
}

/// Mix rgb toward its complement; alpha is kept.
#[derive(Debug, Default)]
pub struct InvertEffect;

impl Effect for InvertEffect {
    fn kind(&self) -> &str {
        "invert"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![intensity_param("0 leaves the image, 1 fully inverts")]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let k = params.float("intensity", ctx.seconds()) as f32;
        map_pixels(input, output, |_, _, c| {
            mix_rgb(c, [1.0 - c.r, 1.0 - c.g, 1.0 - c.b], k)
        });
        Ok(())
    }
}

/// Binarize on Rec.601 luminance: at or above the threshold is white.
#[derive(Debug, Default)]
pub struct ThresholdEffect;

impl Effect for ThresholdEffect {
    fn kind(&self) -> &str {
        "threshold"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![ParamDef::float("threshold", 0.0, 1.0, 0.5)]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let threshold = params.float("threshold", ctx.seconds()) as f32;
        map_pixels(input, output, |_, _, c| {
            let v = if c.luminance() >= threshold { 1.0 } else { 0.0 };
            Color::rgba(v, v, v, c.a)
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct GrayscaleEffect;

impl Effect for GrayscaleEffect {
    fn kind(&self) -> &str {
        "grayscale"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![intensity_param("blend toward luminance")]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let k = params.float("intensity", ctx.seconds()) as f32;
        map_pixels(input, output, |_, _, c| {
            let y = c.luminance();
            mix_rgb(c, [y, y, y], k)
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SepiaEffect;

impl Effect for SepiaEffect {
    fn kind(&self) -> &str {
        "sepia"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![intensity_param("blend toward the sepia tone")]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let k = params.float("intensity", ctx.seconds()) as f32;
        map_pixels(input, output, |_, _, c| {
            let toned = [
                0.393 * c.r + 0.769 * c.g + 0.189 * c.b,
                0.349 * c.r + 0.686 * c.g + 0.168 * c.b,
                0.272 * c.r + 0.534 * c.g + 0.131 * c.b,
            ];
            mix_rgb(c, toned, k)
        });
        Ok(())
    }
}

/// Additive brightness offset.
#[derive(Debug, Default)]
pub struct BrightnessEffect;

impl Effect for BrightnessEffect {
    fn kind(&self) -> &str {
        "brightness"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![ParamDef::float("amount", -1.0, 1.0, 0.0).describe("added to every channel")]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let amount = params.float("amount", ctx.seconds()) as f32;
        map_pixels(input, output, |_, _, c| {
            Color::rgba(c.r + amount, c.g + amount, c.b + amount, c.a)
        });
        Ok(())
    }
}

/// Multiply by a color, optionally including alpha.
#[derive(Debug, Default)]
pub struct TintEffect;

impl Effect for TintEffect {
    fn kind(&self) -> &str {
        "tint"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![
            ParamDef::color("color", Color::WHITE),
            ParamDef::boolean("include_alpha", false),
        ]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        _ctx: &FrameContext,
    ) -> FxResult<()> {
        let tint = params.color("color");
        let alpha = if params.boolean("include_alpha") { tint.a } else { 1.0 };
        map_pixels(input, output, |_, _, c| {
            Color::rgba(c.r * tint.r, c.g * tint.g, c.b * tint.b, c.a * alpha)
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(effect: &mut dyn Effect, input: &FrameBuffer, set: &[(&str, f64)]) -> FrameBuffer {
        let mut params = ParamSet::from_schema(effect.schema()).unwrap();
        for (name, v) in set {
            params
                .set(name, fxchain_core::ParamValue::Float(*v))
                .unwrap();
        }
        let mut output = FrameBuffer::new(0, 0);
        let ctx = FrameContext::at_frame(0, 30.0, input.width, input.height);
        effect.apply(input, &mut output, &params, &ctx).unwrap();
        output
    }

    #[test]
    fn test_invert_keeps_alpha() {
        let mut input = FrameBuffer::new(1, 1);
        input.set_pixel(0, 0, [10, 200, 255, 77]);
        let out = run(&mut InvertEffect, &input, &[]);
        assert_eq!(out.get_pixel(0, 0), Some([245, 55, 0, 77]));
    }

    #[test]
    fn test_invert_zero_intensity_is_identity() {
        let input = FrameBuffer::solid(2, 2, &Color::rgb(0.2, 0.4, 0.6));
        let out = run(&mut InvertEffect, &input, &[("intensity", 0.0)]);
        assert_eq!(out, input);
    }

    #[test]
    fn test_threshold_splits_on_luminance() {
        let bright = FrameBuffer::solid(1, 1, &Color::gray(0.8));
        let dark = FrameBuffer::solid(1, 1, &Color::gray(0.2));
        assert_eq!(
            run(&mut ThresholdEffect, &bright, &[]).get_pixel(0, 0),
            Some([255, 255, 255, 255])
        );
        assert_eq!(
            run(&mut ThresholdEffect, &dark, &[]).get_pixel(0, 0),
            Some([0, 0, 0, 255])
        );
    }

    #[test]
    fn test_grayscale_equalizes_channels() {
        let input = FrameBuffer::solid(1, 1, &Color::rgb(1.0, 0.0, 0.0));
        let [r, g, b, _] = run(&mut GrayscaleEffect, &input, &[]).get_pixel(0, 0).unwrap();
        assert_eq!((r, g), (g, b));
        assert_eq!(r, 76); // 0.299 * 255
    }

    #[test]
    fn test_sepia_warms_gray() {
        let input = FrameBuffer::solid(1, 1, &Color::gray(0.5));
        let [r, g, b, _] = run(&mut SepiaEffect, &input, &[]).get_pixel(0, 0).unwrap();
        assert!(r > g && g > b);
    }

    #[test]
    fn test_brightness_adds_and_clamps() {
        let input = FrameBuffer::solid(1, 1, &Color::gray(0.9));
        let out = run(&mut BrightnessEffect, &input, &[("amount", 0.5)]);
        assert_eq!(out.get_pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_tint_multiplies_rgb() {
        let input = FrameBuffer::solid(1, 1, &Color::WHITE);
        let mut params = ParamSet::from_schema(TintEffect.schema()).unwrap();
        params
            .set("color", fxchain_core::ParamValue::Color(Color::RED))
            .unwrap();
        let mut out = FrameBuffer::new(0, 0);
        let ctx = FrameContext::at_frame(0, 30.0, 1, 1);
        TintEffect.apply(&input, &mut out, &params, &ctx).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some([255, 0, 0, 255]));
    }
}
