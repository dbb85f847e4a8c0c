// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/annotation.rs - LabelMe 标注文档解析
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

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotationError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("XML 解析错误: {0}")]
  ParseError(#[from] quick_xml::DeError),
}

/// 源图像像素坐标系中的点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Point2D {
  pub x: i32,
  pub y: i32,
}

/// `segm/box` 形式的包围盒
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rect {
  pub xmin: f32,
  pub ymin: f32,
  pub xmax: f32,
  pub ymax: f32,
}

/// 单个目标的标注
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAnnotation {
  pub label: String,
  pub polygon: Vec<Point2D>,
  pub bounding_box: Option<Rect>,
}

/// 一张图像对应的标注文档
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
  pub objects: Vec<ObjectAnnotation>,
  pub source_filename: String,
  pub source_folder: String,
}

impl AnnotationRecord {
  pub fn has_label(&self, label: &str) -> bool {
    self.objects.iter().any(|object| object.label == label)
  }
}

/// 解析时的目标过滤策略
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LabelFilter {
  /// 保留全部目标
  #[default]
  All,
  /// 只保留标签相同的目标
  Include(String),
  /// 去掉标签相同的目标
  Exclude(String),
}

impl LabelFilter {
  pub fn keeps(&self, label: &str) -> bool {
    match self {
      LabelFilter::All => true,
      LabelFilter::Include(wanted) => wanted == label,
      LabelFilter::Exclude(unwanted) => unwanted != label,
    }
  }
}

#[derive(Deserialize)]
struct XmlAnnotation {
  #[serde(default)]
  filename: String,
  #[serde(default)]
  folder: String,
  #[serde(rename = "object", default)]
  objects: Vec<XmlObject>,
}

#[derive(Deserialize)]
struct XmlObject {
  #[serde(default)]
  name: String,
  #[serde(default)]
  polygon: Option<XmlPolygon>,
  #[serde(default)]
  segm: Option<XmlSegment>,
}

#[derive(Deserialize)]
struct XmlPolygon {
  #[serde(rename = "pt", default)]
  points: Vec<Point2D>,
}

#[derive(Deserialize)]
struct XmlSegment {
  #[serde(rename = "box", default)]
  bounding_box: Option<Rect>,
}

impl From<XmlObject> for ObjectAnnotation {
  fn from(object: XmlObject) -> Self {
    ObjectAnnotation {
      label: object.name,
      polygon: object.polygon.map(|p| p.points).unwrap_or_default(),
      bounding_box: object.segm.and_then(|s| s.bounding_box),
    }
  }
}

/// 解析一个标注文档
///
/// 同名子元素可以被其他元素隔开，例如 `<object>` 之间夹着 `<imagesize>`。
pub fn parse(document: &[u8], filter: &LabelFilter) -> Result<AnnotationRecord, AnnotationError> {
  let annotation: XmlAnnotation = quick_xml::de::from_reader(document)?;

  let objects = annotation
    .objects
    .into_iter()
    .filter(|object| filter.keeps(&object.name))
    .map(ObjectAnnotation::from)
    .collect();

  Ok(AnnotationRecord {
    objects,
    source_filename: annotation.filename,
    source_folder: annotation.folder,
  })
}

pub fn parse_file<P: AsRef<Path>>(
  path: P,
  filter: &LabelFilter,
) -> Result<AnnotationRecord, AnnotationError> {
  let document = std::fs::read(path)?;
  parse(&document, filter)
}
