// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/transform.rs - 图像解码与缩放
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use image::{DynamicImage, ImageReader, codecs::jpeg::JpegEncoder, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::annotation::AnnotationRecord;
use crate::publish::{TargetAnnotation, convert};

/// 长边上限（像素）
pub const MAX_LONG_EDGE: u32 = 1000;

const JPEG_QUALITY: u8 = 75;

#[derive(Error, Debug)]
pub enum TransformError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 长边超过 `max_long_edge` 时缩到恰好等于它，否则不缩放
pub fn scale_factor(width: u32, height: u32, max_long_edge: u32) -> f32 {
  let long_edge = width.max(height);
  if long_edge > max_long_edge {
    max_long_edge as f32 / long_edge as f32
  } else {
    1.0
  }
}

pub fn scaled_dimensions(width: u32, height: u32, factor: f32) -> (u32, u32) {
  let scale = |v: u32| ((v as f32 * factor).round() as u32).max(1);
  (scale(width), scale(height))
}

/// 缩放后的图像；只在内存中存在，磁盘上只缓存原始字节
#[derive(Debug, Clone)]
pub struct ScaledImage {
  pub image: DynamicImage,
  pub original_width: u32,
  pub original_height: u32,
  pub scale_factor: f32,
  pub source_url: String,
}

impl ScaledImage {
  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 用与本图相同的缩放系数转换标注
  pub fn convert_annotation(&self, label: &str, record: &AnnotationRecord) -> TargetAnnotation {
    convert(label, record, self.scale_factor)
  }

  pub fn encode_jpeg(&self) -> Result<Vec<u8>, TransformError> {
    let mut bytes = Vec::new();
    let rgb = self.image.to_rgb8();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(bytes)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageTransformer {
  max_long_edge: u32,
}

impl Default for ImageTransformer {
  fn default() -> Self {
    Self {
      max_long_edge: MAX_LONG_EDGE,
    }
  }
}

impl ImageTransformer {
  pub fn with_max_long_edge(mut self, max_long_edge: u32) -> Self {
    self.max_long_edge = max_long_edge;
    self
  }

  pub fn load<P: AsRef<Path>>(
    &self,
    path: P,
    scale: bool,
    source_url: &str,
  ) -> Result<ScaledImage, TransformError> {
    let image = ImageReader::open(path.as_ref())?
      .with_guessed_format()?
      .decode()?;
    Ok(self.transform(image, scale, source_url))
  }

  pub fn transform(&self, image: DynamicImage, scale: bool, source_url: &str) -> ScaledImage {
    let (original_width, original_height) = (image.width(), image.height());

    let factor = if scale {
      scale_factor(original_width, original_height, self.max_long_edge)
    } else {
      1.0
    };

    let image = if factor != 1.0 {
      let (width, height) = scaled_dimensions(original_width, original_height, factor);
      debug!(
        "缩放图像 {}x{} -> {}x{} (系数 {:.4})",
        original_width, original_height, width, height, factor
      );
      image.resize_exact(width, height, FilterType::Lanczos3)
    } else {
      image
    };

    ScaledImage {
      image,
      original_width,
      original_height,
      scale_factor: factor,
      source_url: source_url.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, RgbImage};

  #[test]
  fn scale_factor_caps_long_edge() {
    assert_eq!(scale_factor(2000, 1000, MAX_LONG_EDGE), 0.5);
    assert_eq!(scaled_dimensions(2000, 1000, 0.5), (1000, 500));

    assert_eq!(scale_factor(800, 600, MAX_LONG_EDGE), 1.0);
    assert_eq!(scaled_dimensions(800, 600, 1.0), (800, 600));

    assert_eq!(scale_factor(500, 4000, MAX_LONG_EDGE), 0.25);
    assert_eq!(scale_factor(1000, 1000, MAX_LONG_EDGE), 1.0);
  }

  #[test]
  fn scaled_dimensions_round_each_axis() {
    let factor = scale_factor(1200, 301, MAX_LONG_EDGE);
    assert_eq!(scaled_dimensions(1200, 301, factor), (1000, 251));
    assert_eq!(scaled_dimensions(3000, 1, 1.0 / 3.0), (1000, 1));
  }

  #[test]
  fn transform_downscales_large_images() {
    let image = DynamicImage::ImageRgb8(RgbImage::new(1500, 600));
    let scaled = ImageTransformer::default().transform(image, true, "http://x/Images/f/a.jpg");
    assert_eq!((scaled.original_width, scaled.original_height), (1500, 600));
    assert_eq!((scaled.width(), scaled.height()), (1000, 400));
    assert!((scaled.scale_factor - 2.0 / 3.0).abs() < 1e-6);
    assert_eq!(scaled.source_url, "http://x/Images/f/a.jpg");
  }

  #[test]
  fn unscaled_load_keeps_original() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("f_a.jpg");
    RgbImage::new(1500, 600)
      .save_with_format(&path, ImageFormat::Png)
      .unwrap();

    let image = ImageTransformer::default().load(&path, false, "").unwrap();
    assert_eq!(image.scale_factor, 1.0);
    assert_eq!((image.width(), image.height()), (1500, 600));
  }

  #[test]
  fn encodes_jpeg() {
    let image = DynamicImage::ImageRgba8(image::RgbaImage::new(16, 8));
    let scaled = ImageTransformer::default().transform(image, true, "");
    let bytes = scaled.encode_jpeg().unwrap();
    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 8));
  }

  #[test]
  fn undecodable_file_is_an_error() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("broken.jpg");
    std::fs::write(&path, b"<html>not found</html>").unwrap();
    assert!(ImageTransformer::default().load(&path, true, "").is_err());
  }
}
