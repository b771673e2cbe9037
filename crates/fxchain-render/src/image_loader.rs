//! Image loading and saving.
//! Decodes PNG, JPEG, WebP, and other formats into FrameBuffers.

use std::path::Path;

use fxchain_core::frame::FrameBuffer;
use fxchain_core::FxError;

/// Load an image file and convert it to a FrameBuffer.
pub fn load_image(path: &Path) -> Result<FrameBuffer, FxError> {
    let img = image::open(path).map_err(|e| {
        FxError::asset(
            format!("failed to load image '{}': {}", path.display(), e),
            path,
        )
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_raw(width, height, rgba.into_raw())
}

/// Load an image from raw bytes (e.g., from an embedded asset).
pub fn load_image_from_bytes(data: &[u8]) -> Result<FrameBuffer, FxError> {
    let img = image::load_from_memory(data)
        .map_err(|e| FxError::asset(format!("failed to decode image: {}", e), "<memory>"))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_raw(width, height, rgba.into_raw())
}

/// Write a FrameBuffer to disk; the format follows the file extension.
pub fn save_image(fb: &FrameBuffer, path: &Path) -> Result<(), FxError> {
    let img = image::RgbaImage::from_raw(fb.width, fb.height, fb.data.clone()).ok_or_else(|| {
        FxError::asset(
            format!("buffer does not match {}x{}", fb.width, fb.height),
            path,
        )
    })?;
    img.save(path).map_err(|e| {
        FxError::asset(
            format!("failed to save image '{}': {}", path.display(), e),
            path,
        )
    })
}

/// Nearest-neighbour resample to exactly `width` x `height`.
pub fn resize_exact(fb: &FrameBuffer, width: u32, height: u32) -> FrameBuffer {
    if fb.dimensions() == (width, height) {
        return fb.clone();
    }
    let mut resized = FrameBuffer::new(width, height);
    if fb.width == 0 || fb.height == 0 {
        return resized;
    }
    for y in 0..height {
        for x in 0..width {
            let src_x = ((x as u64 * fb.width as u64) / width as u64) as u32;
            let src_y = ((y as u64 * fb.height as u64) / height as u64) as u32;
            if let Some(pixel) = fb.get_pixel(src_x, src_y) {
                resized.set_pixel(x, y, pixel);
            }
        }
    }
    resized
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxchain_core::Color;

    #[test]
    fn test_load_image_missing_file() {
        let result = load_image(Path::new("/nonexistent/image.png"));
        assert!(matches!(result, Err(FxError::Asset { .. })));
    }

    #[test]
    fn test_load_garbage_bytes() {
        assert!(load_image_from_bytes(b"not an image").is_err());
    }

    #[test]
    fn test_save_then_load_png() {
        let path = std::env::temp_dir().join(format!("fxchain-loader-{}.png", std::process::id()));
        let mut fb = FrameBuffer::solid(3, 2, &Color::RED);
        fb.set_pixel(2, 1, [1, 2, 3, 4]);
        save_image(&fb, &path).unwrap();
        let loaded = load_image(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, fb);
    }

    #[test]
    fn test_resize_exact() {
        let mut fb = FrameBuffer::new(2, 1);
        fb.set_pixel(0, 0, [255, 0, 0, 255]);
        fb.set_pixel(1, 0, [0, 0, 255, 255]);
        let resized = resize_exact(&fb, 4, 2);
        assert_eq!(resized.dimensions(), (4, 2));
        assert_eq!(resized.get_pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(resized.get_pixel(2, 0), Some([0, 0, 255, 255]));
    }
}
