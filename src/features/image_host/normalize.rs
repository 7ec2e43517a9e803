//! 图片归一化：data URI 剥离、base64 解码、格式策略与重编码。
//!
//! 这里的函数都是同步且 CPU 密集的，异步调用方应放到 `spawn_blocking` 中执行。
use std::io::Cursor;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use image::DynamicImage;

use crate::error::ImageError;

use super::types::{ImageFormat, NormalizedImage};

const BASE64_MARKER: &str = "base64,";

// 前端 FileReader 产生的 data URI 有时会丢失尾部 `=`，解码时对填充不作要求。
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 去掉 `data:...;base64,` 前缀（截至并包含最后一个 `base64,`）；无前缀时原样返回。
pub fn strip_data_uri_prefix(payload: &str) -> &str {
    match payload.rfind(BASE64_MARKER) {
        Some(idx) => &payload[idx + BASE64_MARKER.len()..],
        None => payload,
    }
}

/// 解码 base64 负载（允许 data URI 前缀与换行等空白）。
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, ImageError> {
    let body = strip_data_uri_prefix(payload.trim());
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(ImageError::InvalidImageData("base64 负载为空".to_string()));
    }
    Ok(LENIENT_STANDARD.decode(compact.as_bytes())?)
}

/// 解码任意图片字节并按格式策略重编码。
///
/// 格式优先从字节嗅探；嗅探失败时才使用调用方声明的格式。
pub fn normalize_bytes(
    bytes: &[u8],
    declared: Option<ImageFormat>,
) -> Result<NormalizedImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::InvalidImageData("图片数据为空".to_string()));
    }

    let source = match (image::guess_format(bytes), declared) {
        (Ok(sniffed), _) => sniffed,
        (Err(_), Some(declared)) => declared.codec(),
        (Err(e), None) => {
            return Err(ImageError::InvalidImageData(format!(
                "无法识别图片格式: {e}"
            )));
        }
    };

    let decoded = image::load_from_memory_with_format(bytes, source)?;
    let target = ImageFormat::for_source(source);
    let prepared = prepare_for_encoder(decoded, target);

    let mut out = Cursor::new(Vec::with_capacity(bytes.len()));
    prepared.write_to(&mut out, target.codec())?;

    Ok(NormalizedImage {
        bytes: out.into_inner(),
        format: target,
    })
}

/// 先解码 base64 再归一化。
pub fn normalize_base64(payload: &str) -> Result<NormalizedImage, ImageError> {
    let bytes = decode_base64_payload(payload)?;
    normalize_bytes(&bytes, None)
}

/// 把像素布局转换为目标编码器可接受的形式。
fn prepare_for_encoder(img: DynamicImage, target: ImageFormat) -> DynamicImage {
    match target {
        ImageFormat::Jpeg => match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        ImageFormat::Gif => match img {
            DynamicImage::ImageRgba8(_) => img,
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        },
        ImageFormat::Bmp => match img {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => img,
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        ImageFormat::Png => match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                DynamicImage::ImageRgba16(img.to_rgba16())
            }
            other => other,
        },
    }
}
