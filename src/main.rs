// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use qiaoliang::task::{Interrupt, run_pipeline};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();
  let config = args.into_config()?;

  info!("数据集目录: {}", config.dataset_root.display());
  info!("标签: {}", config.label);
  info!("归档地址: {}", config.archive);
  info!("服务地址: {}", config.api);
  info!("动作: {:?}", config.action);

  let interrupt = Interrupt::default();
  interrupt.install_ctrlc()?;

  run_pipeline(&config, interrupt)?;

  info!("处理完成!");
  Ok(())
}
