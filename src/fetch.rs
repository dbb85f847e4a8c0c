// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/fetch.rs - 图像下载与断点续传
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

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, dataset::ImageInfo, task::Interrupt};

mod directory_archive;
mod http_archive;

pub use self::directory_archive::DirectoryArchive;
pub use self::http_archive::HttpArchive;

#[derive(Error, Debug)]
pub enum FetchError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的地址: {0}")]
  InvalidUrl(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("下载 {url} 失败，状态码 {status}")]
  StatusError {
    url: String,
    status: reqwest::StatusCode,
  },
}

/// 只读的图像归档，以 `folder/filename` 寻址
pub trait ImageArchive {
  /// 把归档中的 `folder/filename` 写入 `dest`
  fn fetch(&self, folder: &str, filename: &str, dest: &Path) -> Result<(), FetchError>;
}

/// 归档内图像的相对路径 `Images/<folder>/<filename>`，各段分别做百分号编码
pub fn image_path(folder: &str, filename: &str) -> String {
  let mut path = String::from("Images");
  for segment in folder.split('/').filter(|s| !s.is_empty()) {
    path.push('/');
    path.push_str(&urlencoding::encode(segment));
  }
  path.push('/');
  path.push_str(&urlencoding::encode(filename));
  path
}

/// 归档内图像的完整地址
pub fn image_url(archive: &Url, folder: &str, filename: &str) -> Result<Url, FetchError> {
  let base = if archive.path().ends_with('/') {
    archive.clone()
  } else {
    Url::parse(&format!("{}/", archive)).map_err(|e| FetchError::InvalidUrl(e.to_string()))?
  };
  base
    .join(&image_path(folder, filename))
    .map_err(|e| FetchError::InvalidUrl(e.to_string()))
}

pub enum ArchiveWrapper {
  Http(HttpArchive),
  Directory(DirectoryArchive),
}

impl FromUrl for ArchiveWrapper {
  type Error = FetchError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "http" | "https" => Ok(ArchiveWrapper::Http(HttpArchive::from_url(url)?)),
      DirectoryArchive::SCHEME => Ok(ArchiveWrapper::Directory(DirectoryArchive::from_url(url)?)),
      scheme => Err(FetchError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl ImageArchive for ArchiveWrapper {
  fn fetch(&self, folder: &str, filename: &str, dest: &Path) -> Result<(), FetchError> {
    match self {
      ArchiveWrapper::Http(archive) => archive.fetch(folder, filename, dest),
      ArchiveWrapper::Directory(archive) => archive.fetch(folder, filename, dest),
    }
  }
}

/// 一次批量下载的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchSummary {
  pub downloaded: usize,
  pub skipped: usize,
  pub refetched: usize,
  pub interrupted: bool,
}

pub struct ImageFetcher<A> {
  archive: A,
  interrupt: Interrupt,
}

impl<A: ImageArchive> ImageFetcher<A> {
  pub fn new(archive: A) -> Self {
    ImageFetcher {
      archive,
      interrupt: Interrupt::default(),
    }
  }

  pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
    self.interrupt = interrupt;
    self
  }

  #[cfg(test)]
  fn archive(&self) -> &A {
    &self.archive
  }

  pub fn fetch(&self, info: &ImageInfo, dest: &Path) -> Result<(), FetchError> {
    self.archive.fetch(info.folder(), info.filename(), dest)
  }

  /// 确保 `infos` 中的图像都已下载到 `dest_dir`。
  ///
  /// 已存在的文件直接跳过。遇到第一个缺失文件时，它前面最后一个已存在的文件
  /// 可能是上次中断时写了一半的，先删除并重新下载，再继续往后。
  /// 任何一次下载失败都会终止整批，已下载的文件保留在磁盘上。
  pub fn ensure_all(&self, infos: &[ImageInfo], dest_dir: &Path) -> Result<FetchSummary, FetchError> {
    std::fs::create_dir_all(dest_dir)?;

    let total = infos.len();
    let mut summary = FetchSummary::default();
    let mut last_present: Option<&ImageInfo> = None;
    let mut resumed = false;

    for (index, info) in infos.iter().enumerate() {
      if self.interrupt.is_triggered() {
        warn!("收到中断信号，停止下载");
        summary.interrupted = true;
        break;
      }

      let local_name = info.local_name();
      let path = dest_dir.join(&local_name);
      if path.exists() {
        info!("[{}/{}] 图像已存在，跳过: {}", index + 1, total, local_name);
        if !resumed {
          last_present = Some(info);
        }
        summary.skipped += 1;
        continue;
      }

      if let Some(previous) = last_present.take() {
        let previous_path = dest_dir.join(previous.local_name());
        std::fs::remove_file(&previous_path)?;
        self.fetch(previous, &previous_path)?;
        warn!("重新下载上次最后一张图像: {}", previous.local_name());
        summary.refetched += 1;
      }
      resumed = true;

      self.fetch(info, &path)?;
      info!("[{}/{}] 已下载图像: {}", index + 1, total, local_name);
      summary.downloaded += 1;
    }

    Ok(summary)
  }
}
