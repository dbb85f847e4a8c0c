// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/publish/imagemonkey.rs - ImageMonkey 上传接口
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

use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::publish::TargetAnnotation;
use crate::transform::{ScaledImage, TransformError};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8081";

const DONATE_PATH: &str = "v1/donate";
const PROVENANCE_DONATE_PATH: &str = "v1/internal/labelme/donate";
const ANNOTATE_PATH: &str = "v1/annotate";

const CLIENT_ID_HEADER: &str = "X-Client-Id";
const CLIENT_SECRET_HEADER: &str = "X-Client-Secret";

const IMAGE_FIELD: &str = "image";
const IMAGE_FILE_NAME: &str = "image.jpeg";
const IMAGE_MIME: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum PublishError {
  /// 服务端返回非 2xx，内容即响应体
  #[error("{0}")]
  Rejected(String),
  #[error("HTTP 错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("图像编码错误: {0}")]
  EncodeError(#[from] TransformError),
  #[error("无效的地址: {0}")]
  InvalidUrl(#[from] url::ParseError),
  #[error("缺少客户端凭据")]
  MissingCredentials,
}

/// 带来源信息上传时使用的客户端凭据
#[derive(Clone)]
pub struct Credentials {
  pub client_id: String,
  pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("client_id", &self.client_id)
      .field("client_secret", &"***")
      .finish()
  }
}

pub struct ImageMonkeyApi {
  base: Url,
  client: Client,
  credentials: Option<Credentials>,
}

impl ImageMonkeyApi {
  pub fn new(base: Url) -> Self {
    Self::with_client(base, Client::new())
  }

  pub fn with_client(base: Url, client: Client) -> Self {
    ImageMonkeyApi {
      base,
      client,
      credentials: None,
    }
  }

  pub fn with_credentials(mut self, credentials: Credentials) -> Self {
    self.credentials = Some(credentials);
    self
  }

  fn endpoint(&self, path: &str) -> Result<Url, PublishError> {
    let base = self.base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{}/{}", base, path))?)
  }

  fn donation_form(
    image: &ScaledImage,
    label: &str,
    auto_unlock: bool,
  ) -> Result<multipart::Form, PublishError> {
    let image = multipart::Part::bytes(image.encode_jpeg()?)
      .file_name(IMAGE_FILE_NAME)
      .mime_str(IMAGE_MIME)?;
    Ok(
      multipart::Form::new()
        .part(IMAGE_FIELD, image)
        .text("label", label.to_string())
        .text("auto_unlock", auto_unlock.to_string()),
    )
  }

  /// 发送请求，非 2xx 响应转为 [`PublishError::Rejected`]，不做重试。
  ///
  /// 响应体按原始字节读取，不按 `charset` 转码。
  fn submit(request: RequestBuilder) -> Result<Response, PublishError> {
    let response = request.send()?;
    let status = response.status();
    debug!("响应状态: {}", status);
    if !status.is_success() {
      let body = response.bytes()?;
      return Err(PublishError::Rejected(
        String::from_utf8_lossy(&body).into_owned(),
      ));
    }
    Ok(response)
  }

  /// 匿名上传一张图像
  pub fn donate(
    &self,
    image: &ScaledImage,
    label: &str,
    auto_unlock: bool,
  ) -> Result<(), PublishError> {
    let form = Self::donation_form(image, label, auto_unlock)?;
    let url = self.endpoint(DONATE_PATH)?;
    Self::submit(self.client.post(url).multipart(form))?;
    Ok(())
  }

  /// 带来源地址上传一张图像，需要客户端凭据
  pub fn donate_with_provenance(
    &self,
    image: &ScaledImage,
    label: &str,
    auto_unlock: bool,
    source_url: &str,
  ) -> Result<(), PublishError> {
    let credentials = self
      .credentials
      .as_ref()
      .ok_or(PublishError::MissingCredentials)?;
    let form = Self::donation_form(image, label, auto_unlock)?
      .text("image_source_url", source_url.to_string());
    let url = self.endpoint(PROVENANCE_DONATE_PATH)?;
    let request = self
      .client
      .post(url)
      .header(CLIENT_SECRET_HEADER, &credentials.client_secret)
      .header(CLIENT_ID_HEADER, &credentials.client_id)
      .multipart(form);
    Self::submit(request)?;
    Ok(())
  }

  /// 给已存在的图像添加多边形标注
  pub fn add_annotations(
    &self,
    image_id: &str,
    annotation: &TargetAnnotation,
  ) -> Result<(), PublishError> {
    let url = self.endpoint(&format!(
      "{}/{}",
      ANNOTATE_PATH,
      urlencoding::encode(image_id)
    ))?;
    Self::submit(self.client.post(url).json(annotation))?;
    Ok(())
  }
}
