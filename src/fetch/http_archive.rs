// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/fetch/http_archive.rs - HTTP 图像归档
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

use std::fs::File;
use std::path::Path;

use reqwest::blocking::Client;
use tracing::{debug, error};
use url::Url;

use crate::FromUrl;
use crate::fetch::{FetchError, ImageArchive, image_url};

pub struct HttpArchive {
  base: Url,
  client: Client,
}

impl FromUrl for HttpArchive {
  type Error = FetchError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != "http" && url.scheme() != "https" {
      error!("URI 方案不匹配: 期望 'http' 或 'https', 实际 '{}'", url.scheme());
      return Err(FetchError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(HttpArchive::with_client(url.clone(), Client::new()))
  }
}

impl HttpArchive {
  pub fn with_client(base: Url, client: Client) -> Self {
    HttpArchive { base, client }
  }

  pub fn base(&self) -> &Url {
    &self.base
  }
}

impl ImageArchive for HttpArchive {
  fn fetch(&self, folder: &str, filename: &str, dest: &Path) -> Result<(), FetchError> {
    let url = image_url(&self.base, folder, filename)?;
    debug!("GET {}", url);

    let mut response = self.client.get(url.clone()).send()?;
    if !response.status().is_success() {
      return Err(FetchError::StatusError {
        url: url.to_string(),
        status: response.status(),
      });
    }

    let mut file = File::create(dest)?;
    if let Err(err) = response.copy_to(&mut file) {
      drop(file);
      let _ = std::fs::remove_file(dest);
      return Err(err.into());
    }
    file.sync_all()?;
    Ok(())
  }
}
