//! Image decoding for thumbnails and the full-size viewer.

/// Bounding box for decoded previews; larger images are scaled down.
pub const PREVIEW_MAX_SIDE: u32 = 1024;

#[derive(Clone)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl PreviewImage {
    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }
}

pub fn decode_preview_image(bytes: &[u8]) -> Result<PreviewImage, String> {
    let dynamic = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let resized = if dynamic.width() > PREVIEW_MAX_SIDE || dynamic.height() > PREVIEW_MAX_SIDE {
        dynamic.thumbnail(PREVIEW_MAX_SIDE, PREVIEW_MAX_SIDE)
    } else {
        dynamic
    }
    .to_rgba8();
    let width = resized.width() as usize;
    let height = resized.height() as usize;
    Ok(PreviewImage {
        width,
        height,
        rgba: resized.into_raw(),
    })
}
