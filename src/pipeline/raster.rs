//! Raster image transcoding between JPEG, PNG and GIF.
//!
//! Images are decoded fully and re-encoded; no resizing or colour management
//! happens here. JPEG has no alpha channel, so images are flattened to RGB
//! before JPEG encoding. GIF output is palette-quantised by the encoder.

use crate::error::ConvertError;
use crate::format::Format;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Frame, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

fn image_format(format: Format) -> Option<ImageFormat> {
    match format {
        Format::Jpg => Some(ImageFormat::Jpeg),
        Format::Png => Some(ImageFormat::Png),
        Format::Gif => Some(ImageFormat::Gif),
        _ => None,
    }
}

/// Decode `bytes` (declared as `from`) and re-encode them as `to`.
pub fn transcode(
    bytes: &[u8],
    from: Format,
    to: Format,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ConvertError> {
    let img = decode(bytes, from)?;
    debug!(
        "Decoded {} image: {}×{}",
        from,
        img.width(),
        img.height()
    );
    encode(&img, to, jpeg_quality)
}

/// Decode using the content's magic bytes, falling back to the declared
/// format when the content is not recognised.
pub fn decode(bytes: &[u8], declared: Format) -> Result<DynamicImage, ConvertError> {
    if bytes.is_empty() {
        return Err(ConvertError::decode(declared, "image is empty"));
    }
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConvertError::decode(declared, e))?;
    if reader.format().is_none() {
        if let Some(f) = image_format(declared) {
            reader.set_format(f);
        }
    }
    reader
        .decode()
        .map_err(|e| ConvertError::decode(declared, e))
}

pub fn encode(img: &DynamicImage, to: Format, jpeg_quality: u8) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    match to {
        Format::Jpg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, jpeg_quality))
                .map_err(|e| ConvertError::encode(to, e))?;
        }
        Format::Gif => {
            let mut encoder = GifEncoder::new(&mut buf);
            encoder
                .encode_frame(Frame::new(img.to_rgba8()))
                .map_err(|e| ConvertError::encode(to, e))?;
        }
        Format::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| ConvertError::encode(to, e))?;
        }
        other => {
            return Err(ConvertError::Internal(format!(
                "{other} is not a raster format"
            )))
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(8, 6, |x, y| Rgba([(x * 30) as u8, (y * 40) as u8, 90, 200]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn png_to_jpg_keeps_dimensions() {
        let jpg = transcode(&sample_png(), Format::Png, Format::Jpg, 92).unwrap();
        assert!(jpg.starts_with(&[0xFF, 0xD8]));
        let back = decode(&jpg, Format::Jpg).unwrap();
        assert_eq!((back.width(), back.height()), (8, 6));
    }

    #[test]
    fn png_to_gif() {
        let gif = transcode(&sample_png(), Format::Png, Format::Gif, 92).unwrap();
        assert!(gif.starts_with(b"GIF8"));
        let back = decode(&gif, Format::Gif).unwrap();
        assert_eq!((back.width(), back.height()), (8, 6));
    }

    #[test]
    fn gif_to_png() {
        let gif = transcode(&sample_png(), Format::Png, Format::Gif, 92).unwrap();
        let png = transcode(&gif, Format::Gif, Format::Png, 92).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = RgbaImage::from_fn(64, 64, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8, 255]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let high = transcode(&png, Format::Png, Format::Jpg, 95).unwrap();
        let low = transcode(&png, Format::Png, Format::Jpg, 20).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn empty_input_is_decode_error() {
        let err = transcode(&[], Format::Png, Format::Jpg, 92).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { format: Format::Png, .. }));
    }

    #[test]
    fn corrupt_input_is_decode_error() {
        let err = transcode(b"\x89PNG\r\n\x1a\nnope", Format::Png, Format::Gif, 92).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { .. }));
    }
}
