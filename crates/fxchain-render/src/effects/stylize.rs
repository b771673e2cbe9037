//! Position-dependent effects: vignette and texture overlay.

use fxchain_core::{Color, FrameBuffer, FrameContext, FxResult, ParamDef, ParamSet};

use crate::effect::{map_pixels, Effect};

/// Normalized pixel-center coordinates.
fn uv(x: u32, y: u32, width: u32, height: u32) -> (f32, f32) {
    (
        (x as f32 + 0.5) / width.max(1) as f32,
        (y as f32 + 0.5) / height.max(1) as f32,
    )
}

/// Radial darkening around a center point.
#[derive(Debug, Default)]
pub struct VignetteEffect;

impl Effect for VignetteEffect {
    fn kind(&self) -> &str {
        "vignette"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![
            ParamDef::float("strength", 0.0, 2.0, 0.5),
            ParamDef::vec2("center", [0.5, 0.5]).describe("normalized, origin top-left"),
        ]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let strength = params.float("strength", ctx.seconds()) as f32;
        let [cx, cy] = params.vec2("center");
        let (cx, cy) = (cx as f32, cy as f32);
        let (w, h) = input.dimensions();
        map_pixels(input, output, |x, y, c| {
            let (u, v) = uv(x, y, w, h);
            // Corner distance from the center of the frame is sqrt(0.5).
            let d2 = ((u - cx).powi(2) + (v - cy).powi(2)) * 2.0;
            let k = (1.0 - strength * d2).clamp(0.0, 1.0);
            Color::rgba(c.r * k, c.g * k, c.b * k, c.a)
        });
        Ok(())
    }
}

/// Mix a texture over the input, weighted by opacity and the texture's alpha.
#[derive(Debug, Default)]
pub struct BlendEffect;

impl Effect for BlendEffect {
    fn kind(&self) -> &str {
        "blend"
    }

    fn schema(&self) -> Vec<ParamDef> {
        vec![
            ParamDef::texture("texture").describe("sampled nearest, stretched to the frame"),
            ParamDef::float("opacity", 0.0, 1.0, 0.5),
        ]
    }

    fn apply(
        &mut self,
        input: &FrameBuffer,
        output: &mut FrameBuffer,
        params: &ParamSet,
        ctx: &FrameContext,
    ) -> FxResult<()> {
        let opacity = params.float("opacity", ctx.seconds()) as f32;
        let Some(texture) = params.texture("texture") else {
            output.copy_from(input);
            return Ok(());
        };
        let overlay = texture.image();
        let (w, h) = input.dimensions();
        map_pixels(input, output, |x, y, c| {
            let (u, v) = uv(x, y, w, h);
            let t = overlay.sample(u, v);
            let k = opacity * t.a;
            Color::rgba(
                c.r + (t.r - c.r) * k,
                c.g + (t.g - c.g) * k,
                c.b + (t.b - c.b) * k,
                c.a,
            )
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxchain_core::{ParamValue, TextureRef};

    fn ctx(w: u32, h: u32) -> FrameContext {
        FrameContext::at_frame(0, 30.0, w, h)
    }

    #[test]
    fn test_vignette_darkens_corners_not_center() {
        let input = FrameBuffer::solid(9, 9, &Color::WHITE);
        let mut params = ParamSet::from_schema(VignetteEffect.schema()).unwrap();
        params.set("strength", ParamValue::Float(1.0)).unwrap();
        let mut out = FrameBuffer::new(0, 0);
        VignetteEffect
            .apply(&input, &mut out, &params, &ctx(9, 9))
            .unwrap();
        assert_eq!(out.get_pixel(4, 4), Some([255, 255, 255, 255]));
        let corner = out.get_pixel(0, 0).unwrap();
        assert!(corner[0] < 60, "corner {:?}", corner);
        assert_eq!(corner[3], 255);
    }

    #[test]
    fn test_blend_without_texture_is_identity() {
        let input = FrameBuffer::solid(3, 2, &Color::rgb(0.1, 0.5, 0.9));
        let params = ParamSet::from_schema(BlendEffect.schema()).unwrap();
        let mut out = FrameBuffer::new(0, 0);
        BlendEffect
            .apply(&input, &mut out, &params, &ctx(3, 2))
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_blend_mixes_by_opacity() {
        let input = FrameBuffer::solid(2, 2, &Color::BLACK);
        let mut params = ParamSet::from_schema(BlendEffect.schema()).unwrap();
        let white = TextureRef::new("white", FrameBuffer::solid(1, 1, &Color::WHITE));
        params.set("texture", ParamValue::Texture(white)).unwrap();
        params.set("opacity", ParamValue::Float(1.0)).unwrap();
        let mut out = FrameBuffer::new(0, 0);
        BlendEffect
            .apply(&input, &mut out, &params, &ctx(2, 2))
            .unwrap();
        assert_eq!(out, FrameBuffer::solid(2, 2, &Color::WHITE));
    }
}
