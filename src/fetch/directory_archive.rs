// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/fetch/directory_archive.rs - 本地目录图像归档
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

use std::path::{Path, PathBuf};

use url::Url;

use crate::fetch::{FetchError, ImageArchive};
use crate::{FromUrl, FromUrlWithScheme};

/// 已经镜像到本地的归档，布局同远端：`<root>/Images/<folder>/<filename>`
pub struct DirectoryArchive {
  root: PathBuf,
}

impl FromUrlWithScheme for DirectoryArchive {
  const SCHEME: &'static str = "file";
}

impl FromUrl for DirectoryArchive {
  type Error = FetchError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(FetchError::SchemeMismatch(url.scheme().to_string()));
    }
    let root = url
      .to_file_path()
      .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    Ok(DirectoryArchive::new(root))
  }
}

impl DirectoryArchive {
  pub fn new<P: Into<PathBuf>>(root: P) -> Self {
    DirectoryArchive { root: root.into() }
  }

  fn source_path(&self, folder: &str, filename: &str) -> PathBuf {
    self.root.join("Images").join(folder).join(filename)
  }
}

impl ImageArchive for DirectoryArchive {
  fn fetch(&self, folder: &str, filename: &str, dest: &Path) -> Result<(), FetchError> {
    std::fs::copy(self.source_path(folder, filename), dest)?;
    Ok(())
  }
}
