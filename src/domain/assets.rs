/// Collaborator seams: where images come from and where they are drawn.
///
/// The runtime never decodes pixels. An `AssetSource` hands out opaque
/// `ImageId`s for asset keys, and a `Surface` receives draw calls with those
/// ids plus box geometry.

use super::geom::Rect;
use crate::error::AssetError;

/// Opaque handle to a decoded image owned by the asset source.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ImageId(pub u32);

pub trait AssetSource {
    /// A sheet cut into tile-sized images, indexed by tile token.
    fn sheet(&self, key: &str) -> Result<Vec<ImageId>, AssetError>;

    /// An ordered animation. Never empty on success.
    fn frames(&self, key: &str) -> Result<Vec<ImageId>, AssetError>;

    /// A single image.
    fn image(&self, key: &str) -> Result<ImageId, AssetError>;
}

/// `frames` for `key`, with the non-empty guarantee checked so a source
/// that breaks it fails at build time instead of at draw time.
pub fn require_frames(assets: &dyn AssetSource, key: &str) -> Result<Vec<ImageId>, AssetError> {
    let frames = assets.frames(key)?;
    if frames.is_empty() {
        return Err(AssetError::Empty { key: key.to_string() });
    }
    Ok(frames)
}

pub trait Surface {
    fn draw(&mut self, rect: Rect, image: ImageId, flip_x: bool);

    /// Draw an untextured solid box.
    fn fill(&mut self, rect: Rect);
}

// ── Test doubles ──

#[cfg(test)]
pub mod stub {
    use super::*;

    /// Every key resolves; sheets have `sheet_len` tiles and animations
    /// `frame_count` frames. Keys listed in `missing` fail.
    pub struct StubAssets {
        pub sheet_len: usize,
        pub frame_count: usize,
        pub missing: Vec<&'static str>,
    }

    impl StubAssets {
        pub fn new() -> Self {
            StubAssets { sheet_len: 16, frame_count: 4, missing: vec![] }
        }

        fn check(&self, key: &str) -> Result<(), AssetError> {
            if self.missing.iter().any(|m| *m == key) {
                return Err(AssetError::NotFound { key: key.to_string() });
            }
            Ok(())
        }
    }

    impl AssetSource for StubAssets {
        fn sheet(&self, key: &str) -> Result<Vec<ImageId>, AssetError> {
            self.check(key)?;
            Ok((0..self.sheet_len as u32).map(ImageId).collect())
        }

        fn frames(&self, key: &str) -> Result<Vec<ImageId>, AssetError> {
            self.check(key)?;
            Ok((100..100 + self.frame_count as u32).map(ImageId).collect())
        }

        fn image(&self, key: &str) -> Result<ImageId, AssetError> {
            self.check(key)?;
            Ok(ImageId(999))
        }
    }

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum DrawCall {
        Image { rect: Rect, image: ImageId, flip_x: bool },
        Fill { rect: Rect },
    }

    /// Records every draw call in order.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub calls: Vec<DrawCall>,
    }

    impl Surface for RecordingSurface {
        fn draw(&mut self, rect: Rect, image: ImageId, flip_x: bool) {
            self.calls.push(DrawCall::Image { rect, image, flip_x });
        }

        fn fill(&mut self, rect: Rect) {
            self.calls.push(DrawCall::Fill { rect });
        }
    }
}
