// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/dataset/cache.rs - 标签统计与图像信息的缓存文件
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

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DatasetError, ImageInfo, LabelCount};

#[derive(Serialize, Deserialize)]
struct Label {
  name: String,
  num: u32,
}

pub(super) fn read_label_map(path: &Path) -> Result<LabelCount, DatasetError> {
  let bytes = std::fs::read(path)?;
  let labels: Vec<Label> = serde_json::from_slice(&bytes)?;
  Ok(labels.into_iter().map(|l| (l.name, l.num)).collect())
}

pub(super) fn persist_label_map(path: &Path, labels: &LabelCount) -> Result<(), DatasetError> {
  let labels: Vec<Label> = labels
    .iter()
    .map(|(name, num)| Label {
      name: name.to_string(),
      num,
    })
    .collect();
  write_replace(path, &serde_json::to_vec(&labels)?)
}

pub(super) fn read_image_infos(path: &Path) -> Result<Vec<ImageInfo>, DatasetError> {
  let bytes = std::fs::read(path)?;
  Ok(serde_json::from_slice(&bytes)?)
}

pub(super) fn persist_image_infos(path: &Path, infos: &[ImageInfo]) -> Result<(), DatasetError> {
  write_replace(path, &serde_json::to_vec(infos)?)
}

/// 先写临时文件再改名，读者永远看不到写了一半的缓存
fn write_replace(path: &Path, bytes: &[u8]) -> Result<(), DatasetError> {
  let mut partial = path.as_os_str().to_owned();
  partial.push(".partial");
  std::fs::write(&partial, bytes)?;
  std::fs::rename(&partial, path)?;
  debug!("写入缓存文件: {}", path.display());
  Ok(())
}
