// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/publish/convert.rs - LabelMe 多边形到 ImageMonkey 标注的转换
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

use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationRecord, Point2D};

pub const POLYGON_SHAPE: &str = "polygon";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyPoint {
  pub x: i32,
  pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonShape {
  pub points: Vec<PolyPoint>,
  pub angle: i32,
  #[serde(rename = "type")]
  pub kind: String,
}

/// `POST /v1/annotate/{imageId}` 的请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAnnotation {
  #[serde(rename = "annotations")]
  pub shapes: Vec<PolygonShape>,
  pub label: String,
}

fn scale_point(point: &Point2D, scale_factor: f32) -> PolyPoint {
  PolyPoint {
    x: (point.x as f32 * scale_factor).round() as i32,
    y: (point.y as f32 * scale_factor).round() as i32,
  }
}

/// 每个目标的多边形按 `scale_factor` 缩放，保持点的顺序。
///
/// `scale_factor` 必须是同一张图像缩放时用的系数，见 [`crate::transform::ScaledImage::convert_annotation`]。
pub fn convert(label: &str, record: &AnnotationRecord, scale_factor: f32) -> TargetAnnotation {
  let shapes = record
    .objects
    .iter()
    .map(|object| PolygonShape {
      points: object
        .polygon
        .iter()
        .map(|p| scale_point(p, scale_factor))
        .collect(),
      angle: 0,
      kind: POLYGON_SHAPE.to_string(),
    })
    .collect();

  TargetAnnotation {
    shapes,
    label: label.to_string(),
  }
}
