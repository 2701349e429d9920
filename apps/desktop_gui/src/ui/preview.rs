//! Preview textures for the selected image.

use client_core::{ImageUpload, PreviewSurface};
use eframe::egui;
use shared::domain::SelectionId;

const PREVIEW_MAX_DIMENSION: u32 = 800;

pub struct PreviewTexture {
    pub texture: egui::TextureHandle,
    pub size: egui::Vec2,
}

/// Uploads decoded previews to the GPU. Dropping a [`PreviewTexture`] frees
/// its texture, so `release` only has to let go of the handle.
pub struct TexturePreviews {
    ctx: egui::Context,
    live: usize,
}

impl TexturePreviews {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx, live: 0 }
    }

    pub fn live(&self) -> usize {
        self.live
    }
}

impl PreviewSurface for TexturePreviews {
    type Handle = PreviewTexture;

    fn create(&mut self, selection: SelectionId, image: &ImageUpload) -> Option<PreviewTexture> {
        let decoded = match decode_preview(&image.bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(
                    selection = selection.0,
                    file = %image.file_name,
                    "no preview for selected file: {err}"
                );
                return None;
            }
        };
        let size = egui::vec2(decoded.size[0] as f32, decoded.size[1] as f32);
        let texture = self.ctx.load_texture(
            format!("selection-preview:{}", selection.0),
            decoded,
            egui::TextureOptions::LINEAR,
        );
        self.live += 1;
        tracing::debug!(selection = selection.0, live = self.live, "preview texture created");
        Some(PreviewTexture { texture, size })
    }

    fn release(&mut self, handle: PreviewTexture) {
        self.live = self.live.saturating_sub(1);
        tracing::debug!(
            texture = ?handle.texture.id(),
            live = self.live,
            "preview texture released"
        );
        drop(handle);
    }
}

pub fn decode_preview(bytes: &[u8]) -> Result<egui::ColorImage, image::ImageError> {
    let dynamic = image::load_from_memory(bytes)?;
    let rgba = dynamic
        .thumbnail(PREVIEW_MAX_DIMENSION, PREVIEW_MAX_DIMENSION)
        .to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::PreviewSurface;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 120, 90, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).expect("encode png");
        out.into_inner()
    }

    #[test]
    fn decodes_and_shrinks_large_images() {
        let preview = decode_preview(&png_bytes(1600, 400)).expect("decode");
        assert_eq!(preview.size, [800, 200]);
    }

    #[test]
    fn undecodable_bytes_yield_no_preview() {
        assert!(decode_preview(b"definitely not an image").is_err());

        let mut previews = TexturePreviews::new(egui::Context::default());
        let upload = ImageUpload::new("broken.png", b"garbage".to_vec());
        assert!(previews.create(SelectionId(1), &upload).is_none());
        assert_eq!(previews.live(), 0);
    }

    #[test]
    fn tracks_live_textures() {
        let mut previews = TexturePreviews::new(egui::Context::default());
        let upload = ImageUpload::new("lesion.png", png_bytes(4, 4));

        let first = previews.create(SelectionId(1), &upload).expect("first");
        let second = previews.create(SelectionId(2), &upload).expect("second");
        assert_eq!(previews.live(), 2);
        assert_eq!(second.size, egui::vec2(4.0, 4.0));

        previews.release(first);
        previews.release(second);
        assert_eq!(previews.live(), 0);
    }
}
