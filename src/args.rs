// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

use qiaoliang::{
  dataset::{DEFAULT_ARCHIVE_URL, DEFAULT_MIRROR_PROGRAM},
  publish::{Credentials, DEFAULT_API_URL},
  task::{Action, PipelineConfig},
  transform::MAX_LONG_EDGE,
};

/// Qiaoliang 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 数据集根目录，不存在时从归档镜像标注
  #[arg(long, value_name = "DIR")]
  pub dataset: PathBuf,

  /// 目标标签
  #[arg(long, default_value = "car", value_name = "LABEL")]
  pub label: String,

  /// 不读写缓存文件
  #[arg(long)]
  pub no_cache: bool,

  /// LabelMe 归档地址（http/https 或 file）
  #[arg(long, default_value = DEFAULT_ARCHIVE_URL, value_name = "URL")]
  pub archive: Url,

  /// 镜像标注使用的下载程序
  #[arg(long, default_value = DEFAULT_MIRROR_PROGRAM, value_name = "PROGRAM")]
  pub mirror_program: String,

  /// ImageMonkey 服务地址
  #[arg(long, default_value = DEFAULT_API_URL, value_name = "URL")]
  pub api: Url,

  /// 长边上限（像素）
  #[arg(long, default_value_t = MAX_LONG_EDGE, value_name = "PIXELS")]
  pub max_long_edge: u32,

  /// 执行的动作
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 统计标签出现次数
  Labels,
  /// 下载标签对应的全部图像
  Download,
  /// 上传标签对应的全部图像
  Push {
    /// 上传后自动解锁
    #[arg(long)]
    auto_unlock: bool,
    /// 匿名上传，不附带来源地址
    #[arg(long)]
    anonymous: bool,
    /// 上传原始尺寸的图像
    #[arg(long)]
    no_scale: bool,
    /// 客户端 ID
    #[arg(long, env = "X_CLIENT_ID", value_name = "ID")]
    client_id: Option<String>,
    /// 客户端密钥
    #[arg(long, env = "X_CLIENT_SECRET", value_name = "SECRET", hide_env_values = true)]
    client_secret: Option<String>,
  },
  /// 把标注文件中的多边形提交给已有图像
  Annotate {
    /// LabelMe 标注文件
    #[arg(long, value_name = "FILE")]
    annotation: PathBuf,
    /// ImageMonkey 图像 ID
    #[arg(long, value_name = "ID")]
    image_id: String,
  },
}

impl Args {
  pub fn into_config(self) -> anyhow::Result<PipelineConfig> {
    let action = match &self.command {
      Command::Labels => Action::Labels,
      Command::Download => Action::Download,
      Command::Push { .. } => Action::Push,
      Command::Annotate {
        annotation,
        image_id,
      } => Action::Annotate {
        annotation: annotation.clone(),
        image_id: image_id.clone(),
      },
    };

    let mut config = PipelineConfig::new(self.dataset, &self.label, action)?;
    config.use_cache = !self.no_cache;
    config.archive = self.archive;
    config.mirror_program = self.mirror_program;
    config.api = self.api;
    config.max_long_edge = self.max_long_edge;

    if let Command::Push {
      auto_unlock,
      anonymous,
      no_scale,
      client_id,
      client_secret,
    } = self.command
    {
      config.auto_unlock = auto_unlock;
      config.provenance = !anonymous;
      config.scale = !no_scale;
      if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
        config.credentials = Some(Credentials {
          client_id,
          client_secret,
        });
      }
    }

    Ok(config)
  }
}
