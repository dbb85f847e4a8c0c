// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/dataset/mirror.rs - 从归档镜像标注目录
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

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;
use url::Url;

use super::DatasetError;

const ANNOTATIONS_PATH: &str = "Annotations/";

fn annotations_url(archive: &Url) -> Result<Url, DatasetError> {
  archive
    .join(ANNOTATIONS_PATH)
    .map_err(|err| DatasetError::MirrorError(format!("无效的归档地址 {}: {}", archive, err)))
}

/// 用 `<program> -m -np` 把 `<archive>/Annotations/` 镜像到 `root`
pub(super) fn mirror_annotations(program: &str, archive: &Url, root: &Path) -> Result<(), DatasetError> {
  let url = annotations_url(archive)?;
  info!("镜像标注: {} -> {}", url, root.display());

  let mut child = Command::new(program)
    .arg("-m")
    .arg("-np")
    .arg(url.as_str())
    .arg(format!("--directory-prefix={}", root.display()))
    .stdout(Stdio::null())
    .stderr(Stdio::piped())
    .spawn()?;

  if let Some(stderr) = child.stderr.take() {
    for line in BufReader::new(stderr).lines() {
      info!("{}: {}", program, line?);
    }
  }

  let status = child.wait()?;
  if !status.success() {
    return Err(DatasetError::MirrorError(format!(
      "{} 退出状态 {}",
      program, status
    )));
  }
  Ok(())
}
