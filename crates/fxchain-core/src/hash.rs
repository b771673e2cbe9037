//! Content hashing for deterministic output checks.
//!
//! A SHA-256 over dimensions and pixel bytes, so two renders can be
//! compared byte-for-byte without keeping both images around.

use sha2::{Digest, Sha256};

use crate::frame::FrameBuffer;

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the content hash of a single frame buffer.
pub fn hash_frame(frame: &FrameBuffer) -> ContentHash {
    let mut hasher = Sha256::new();
    update_with_frame(&mut hasher, frame);
    finish(hasher)
}

/// Compute the content hash of a sequence of frames.
pub fn hash_frames(frames: &[FrameBuffer]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update((frames.len() as u64).to_le_bytes());
    for frame in frames {
        update_with_frame(&mut hasher, frame);
    }
    finish(hasher)
}

// Dimensions go in first so equal bytes at different sizes hash apart.
fn update_with_frame(hasher: &mut Sha256, frame: &FrameBuffer) {
    hasher.update(frame.width.to_le_bytes());
    hasher.update(frame.height.to_le_bytes());
    hasher.update(&frame.data);
}

fn finish(hasher: Sha256) -> ContentHash {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    ContentHash::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_hash_deterministic() {
        let a = FrameBuffer::solid(10, 10, &Color::RED);
        let b = FrameBuffer::solid(10, 10, &Color::RED);
        assert_eq!(hash_frame(&a), hash_frame(&b));
    }

    #[test]
    fn test_hash_different_content() {
        let a = FrameBuffer::solid(10, 10, &Color::RED);
        let b = FrameBuffer::solid(10, 10, &Color::BLUE);
        assert_ne!(hash_frame(&a), hash_frame(&b));
    }

    #[test]
    fn test_hash_different_shape_same_bytes() {
        let a = FrameBuffer::solid(4, 1, &Color::RED);
        let b = FrameBuffer::solid(1, 4, &Color::RED);
        assert_eq!(a.data, b.data);
        assert_ne!(hash_frame(&a), hash_frame(&b));
    }

    #[test]
    fn test_hash_sequence_order_matters() {
        let red = FrameBuffer::solid(2, 2, &Color::RED);
        let blue = FrameBuffer::solid(2, 2, &Color::BLUE);
        assert_ne!(
            hash_frames(&[red.clone(), blue.clone()]),
            hash_frames(&[blue, red])
        );
    }

    #[test]
    fn test_hash_hex_format() {
        let hash = hash_frame(&FrameBuffer::solid(2, 2, &Color::BLACK));
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(format!("{}", hash), hex);
    }
}
