use crate::error::PreviewError;
use bmp_reduce::BmpRef;
use std::io::Cursor;

/// Encode an 8-bit BMP as a top-down grayscale PNG.
///
/// Pixel indices are mapped through the BMP palette (blue channel, which is
/// equal to the others for a gray palette).
pub fn encode_grayscale_png(bmp: &BmpRef<'_>) -> Result<Vec<u8>, PreviewError> {
    let geometry = bmp.geometry();
    let palette = bmp.palette();

    let mut gray = Vec::with_capacity(geometry.pixel_count());
    for y in (0..geometry.height).rev() {
        gray.extend(bmp.row(y).iter().map(|&i| palette[usize::from(i) * 4]));
    }

    let width = u32::try_from(geometry.width).map_err(|e| PreviewError::PngEncode(e.to_string()))?;
    let height =
        u32::try_from(geometry.height).map_err(|e| PreviewError::PngEncode(e.to_string()))?;

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut writer = encoder
            .write_header()
            .map_err(|e| PreviewError::PngEncode(e.to_string()))?;
        writer
            .write_image_data(&gray)
            .map_err(|e| PreviewError::PngEncode(e.to_string()))?;
    }
    Ok(buf.into_inner())
}
