// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/dataset.rs - LabelMe 数据集：标签统计与图像信息
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

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::annotation::{AnnotationRecord, LabelFilter, parse_file};

mod cache;
mod mirror;
mod scan;

pub use self::scan::annotation_files;

pub const DEFAULT_ARCHIVE_URL: &str = "http://people.csail.mit.edu/brussell/research/LabelMe/";
pub const DEFAULT_MIRROR_PROGRAM: &str = "wget";

const CACHE_DIRECTORY: &str = "cache";
const LABEL_MAP_FILE: &str = "labels.map";
const IMAGE_INFOS_EXTENSION: &str = "tmp";

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("缓存文件格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("遍历数据集目录失败: {0}")]
  WalkError(#[from] walkdir::Error),
  #[error("镜像标注失败: {0}")]
  MirrorError(String),
}

/// 标签出现次数统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCount {
  counts: HashMap<String, u32>,
}

impl LabelCount {
  pub fn observe(&mut self, label: &str) {
    *self.counts.entry(label.to_string()).or_insert(0) += 1;
  }

  pub fn observe_record(&mut self, record: &AnnotationRecord) {
    for object in &record.objects {
      self.observe(&object.label);
    }
  }

  pub fn get(&self, label: &str) -> Option<u32> {
    self.counts.get(label).copied()
  }

  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
    self.counts.iter().map(|(name, num)| (name.as_str(), *num))
  }

  /// 按出现次数降序排列，次数相同时按名称排序
  pub fn sorted(&self) -> Vec<(&str, u32)> {
    let mut labels: Vec<_> = self.iter().collect();
    labels.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    labels
  }
}

impl FromIterator<(String, u32)> for LabelCount {
  fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
    LabelCount {
      counts: iter.into_iter().collect(),
    }
  }
}

/// 本地缓存文件名：`<folder>_<filename>`
pub fn local_name(folder: &str, filename: &str) -> String {
  format!("{}_{}", folder, filename)
}

fn trim_line_breaks(value: &str) -> &str {
  value.trim_matches(|c| c == '\r' || c == '\n')
}

/// 图像在归档中的位置
///
/// 本地文件名总是由目录与文件名推导，缓存里的 `uniquename` 读取时被忽略。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CachedImageInfo", into = "CachedImageInfo")]
pub struct ImageInfo {
  folder: String,
  filename: String,
}

impl ImageInfo {
  pub fn new(folder: &str, filename: &str) -> Self {
    ImageInfo {
      folder: trim_line_breaks(folder).to_string(),
      filename: trim_line_breaks(filename).to_string(),
    }
  }

  pub fn folder(&self) -> &str {
    &self.folder
  }

  pub fn filename(&self) -> &str {
    &self.filename
  }

  pub fn local_name(&self) -> String {
    local_name(&self.folder, &self.filename)
  }
}

#[derive(Serialize, Deserialize)]
struct CachedImageInfo {
  folder: String,
  filename: String,
  #[serde(default)]
  uniquename: String,
}

impl From<CachedImageInfo> for ImageInfo {
  fn from(cached: CachedImageInfo) -> Self {
    ImageInfo::new(&cached.folder, &cached.filename)
  }
}

impl From<ImageInfo> for CachedImageInfo {
  fn from(info: ImageInfo) -> Self {
    let uniquename = info.local_name();
    CachedImageInfo {
      folder: info.folder,
      filename: info.filename,
      uniquename,
    }
  }
}

/// 收集包含指定标签的图像，按 (folder, filename) 去重，保留首次出现的顺序
pub fn collect_image_infos<I>(records: I, label: &str) -> Vec<ImageInfo>
where
  I: IntoIterator<Item = AnnotationRecord>,
{
  let mut seen = HashSet::new();
  let mut infos = Vec::new();
  for record in records {
    if !record.has_label(label) {
      continue;
    }
    let info = ImageInfo::new(&record.source_folder, &record.source_filename);
    if seen.insert((info.folder.clone(), info.filename.clone())) {
      infos.push(info);
    }
  }
  infos
}

/// LabelMe 数据集
pub struct Dataset {
  root: PathBuf,
  archive: Url,
  use_cache: bool,
  mirror_program: String,
}

impl Dataset {
  pub fn new<P: Into<PathBuf>>(root: P, archive: Url, use_cache: bool) -> Self {
    Dataset {
      root: root.into(),
      archive,
      use_cache,
      mirror_program: DEFAULT_MIRROR_PROGRAM.to_string(),
    }
  }

  /// 镜像标注使用的下载程序，参数与 `wget` 相同
  pub fn with_mirror_program(mut self, program: &str) -> Self {
    self.mirror_program = program.to_string();
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn archive(&self) -> &Url {
    &self.archive
  }

  pub fn cache_directory(&self) -> PathBuf {
    self.root.join(CACHE_DIRECTORY)
  }

  pub fn label_map_path(&self) -> PathBuf {
    self.cache_directory().join(LABEL_MAP_FILE)
  }

  pub fn image_infos_path(&self, label: &str) -> PathBuf {
    self
      .cache_directory()
      .join(format!("{}.{}", label, IMAGE_INFOS_EXTENSION))
  }

  pub fn image_directory(&self, label: &str) -> PathBuf {
    self.cache_directory().join(label)
  }

  pub fn image_path(&self, label: &str, info: &ImageInfo) -> PathBuf {
    self.image_directory(label).join(info.local_name())
  }

  /// 数据集目录不存在时从归档镜像全部标注。
  ///
  /// 先镜像到同级的 `<root>.partial`，成功后再改名为 `root`；
  /// 失败时删除暂存目录，下次运行会重新镜像。
  pub fn load(&self) -> Result<(), DatasetError> {
    if self.root.exists() {
      info!("数据集已存在，直接使用: {}", self.root.display());
      return Ok(());
    }

    info!("数据集不存在，开始下载: {}", self.root.display());
    let staging = self.staging_directory()?;
    if staging.exists() {
      warn!("删除上次未完成的镜像: {}", staging.display());
      std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;

    if let Err(err) = mirror::mirror_annotations(&self.mirror_program, &self.archive, &staging) {
      if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
        warn!("无法删除暂存目录 {}: {}", staging.display(), cleanup);
      }
      return Err(err);
    }

    std::fs::rename(&staging, &self.root)?;
    Ok(())
  }

  fn staging_directory(&self) -> Result<PathBuf, DatasetError> {
    let name = self.root.file_name().ok_or_else(|| {
      DatasetError::MirrorError(format!("无效的数据集目录: {}", self.root.display()))
    })?;
    let mut staging = name.to_os_string();
    staging.push(".partial");
    let parent = self.root.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(staging))
  }

  fn ensure_cache_directory(&self) -> Result<(), DatasetError> {
    std::fs::create_dir_all(self.cache_directory())?;
    Ok(())
  }

  /// 逐个解析标注文件，解析失败的文件记录警告后跳过
  fn records(&self) -> Result<impl Iterator<Item = AnnotationRecord>, DatasetError> {
    let files = annotation_files(&self.root)?;
    Ok(files.into_iter().filter_map(|file| {
      match parse_file(&file, &LabelFilter::All) {
        Ok(record) => Some(record),
        Err(err) => {
          warn!("无法解析标注文件 {}: {}", file.display(), err);
          None
        }
      }
    }))
  }

  /// 统计每个标签出现的次数；缓存存在时直接使用缓存
  pub fn build_label_map(&self) -> Result<LabelCount, DatasetError> {
    let path = self.label_map_path();
    if self.use_cache {
      self.ensure_cache_directory()?;
      if path.exists() {
        info!("找到缓存的标签统计: {}", path.display());
        return cache::read_label_map(&path);
      }
    }

    let mut labels = LabelCount::default();
    for record in self.records()? {
      labels.observe_record(&record);
    }
    info!("标签统计完成，共 {} 个标签", labels.len());

    if self.use_cache {
      cache::persist_label_map(&path, &labels)?;
    }
    Ok(labels)
  }

  /// 找出所有包含 `label` 目标的图像；缓存存在时直接使用缓存
  pub fn image_infos(&self, label: &str) -> Result<Vec<ImageInfo>, DatasetError> {
    let path = self.image_infos_path(label);
    if self.use_cache {
      self.ensure_cache_directory()?;
      if path.exists() {
        info!("找到缓存的图像信息: {}", path.display());
        return cache::read_image_infos(&path);
      }
    }

    let infos = collect_image_infos(self.records()?, label);
    info!("标签 {} 共有 {} 张图像", label, infos.len());

    if self.use_cache {
      cache::persist_image_infos(&path, &infos)?;
    }
    Ok(infos)
  }
}
