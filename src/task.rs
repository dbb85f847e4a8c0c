// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/task.rs - 导入流程：统计、下载、上传、标注
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

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl,
  annotation::{LabelFilter, parse_file},
  dataset::{DEFAULT_ARCHIVE_URL, DEFAULT_MIRROR_PROGRAM, Dataset, ImageInfo},
  fetch::{ArchiveWrapper, ImageFetcher, image_url},
  publish::{Credentials, DEFAULT_API_URL, ImageMonkeyApi},
  transform::{ImageTransformer, MAX_LONG_EDGE},
};

/// 中断标志，批处理在两个条目之间检查它
#[derive(Clone, Default, Debug)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
  pub fn trigger(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_triggered(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  /// 收到 Ctrl-C 时置位
  pub fn install_ctrlc(&self) -> Result<(), ctrlc::Error> {
    let interrupt = self.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，当前条目完成后退出...");
      interrupt.trigger();
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  /// 统计标签
  Labels,
  /// 下载标签对应的全部图像
  Download,
  /// 上传标签对应的全部图像
  Push,
  /// 把一个标注文件转换后提交给已有图像
  Annotate { annotation: PathBuf, image_id: String },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub dataset_root: PathBuf,
  pub use_cache: bool,
  pub label: String,
  pub action: Action,
  pub archive: Url,
  pub mirror_program: String,
  pub api: Url,
  pub auto_unlock: bool,
  pub provenance: bool,
  pub credentials: Option<Credentials>,
  pub max_long_edge: u32,
  pub scale: bool,
}

impl PipelineConfig {
  pub fn new<P: Into<PathBuf>>(dataset_root: P, label: &str, action: Action) -> anyhow::Result<Self> {
    Ok(PipelineConfig {
      dataset_root: dataset_root.into(),
      use_cache: true,
      label: label.to_string(),
      action,
      archive: Url::parse(DEFAULT_ARCHIVE_URL)?,
      mirror_program: DEFAULT_MIRROR_PROGRAM.to_string(),
      api: Url::parse(DEFAULT_API_URL)?,
      auto_unlock: false,
      provenance: true,
      credentials: None,
      max_long_edge: MAX_LONG_EDGE,
      scale: true,
    })
  }

  pub fn dataset(&self) -> Dataset {
    Dataset::new(&self.dataset_root, self.archive.clone(), self.use_cache)
      .with_mirror_program(&self.mirror_program)
  }

  fn transformer(&self) -> ImageTransformer {
    ImageTransformer::default().with_max_long_edge(self.max_long_edge)
  }

  pub fn api(&self) -> ImageMonkeyApi {
    let api = ImageMonkeyApi::new(self.api.clone());
    match &self.credentials {
      Some(credentials) => api.with_credentials(credentials.clone()),
      None => api,
    }
  }
}

pub trait Task: Sized {
  type Error;
  fn run_task(self, dataset: &Dataset, config: &PipelineConfig) -> Result<(), Self::Error>;
}

pub struct LabelsTask;

impl Task for LabelsTask {
  type Error = anyhow::Error;

  fn run_task(self, dataset: &Dataset, _config: &PipelineConfig) -> Result<(), Self::Error> {
    let labels = dataset.build_label_map().context("无法统计标签")?;
    for (name, num) in labels.sorted() {
      info!("{}: {}", name, num);
    }
    Ok(())
  }
}

pub struct DownloadTask {
  interrupt: Interrupt,
}

impl DownloadTask {
  pub fn new(interrupt: Interrupt) -> Self {
    Self { interrupt }
  }
}

impl Task for DownloadTask {
  type Error = anyhow::Error;

  fn run_task(self, dataset: &Dataset, config: &PipelineConfig) -> Result<(), Self::Error> {
    let infos = dataset
      .image_infos(&config.label)
      .context("无法获取图像信息")?;
    let archive = ArchiveWrapper::from_url(dataset.archive())?;
    let fetcher = ImageFetcher::new(archive).with_interrupt(self.interrupt);
    let summary = fetcher
      .ensure_all(&infos, &dataset.image_directory(&config.label))
      .context("无法下载图像")?;
    info!(
      "下载完成: 新下载 {}, 跳过 {}, 重新下载 {}",
      summary.downloaded, summary.skipped, summary.refetched
    );
    Ok(())
  }
}

pub struct PushTask {
  api: ImageMonkeyApi,
  interrupt: Interrupt,
}

impl PushTask {
  pub fn new(api: ImageMonkeyApi, interrupt: Interrupt) -> Self {
    Self { api, interrupt }
  }
}

impl Task for PushTask {
  type Error = anyhow::Error;

  fn run_task(self, dataset: &Dataset, config: &PipelineConfig) -> Result<(), Self::Error> {
    let infos = dataset
      .image_infos(&config.label)
      .context("无法获取图像信息")?;
    let api = &self.api;
    let transformer = config.transformer();

    let total = infos.len();
    for (index, info) in infos.iter().enumerate() {
      if self.interrupt.is_triggered() {
        warn!("收到中断信号，停止上传");
        break;
      }

      let path = dataset.image_path(&config.label, info);
      let source_url = image_url(dataset.archive(), info.folder(), info.filename())?;
      let image = transformer
        .load(&path, config.scale, source_url.as_str())
        .with_context(|| format!("无法读取图像 {}", path.display()))?;

      let donated = if config.provenance {
        api.donate_with_provenance(&image, &config.label, config.auto_unlock, &image.source_url)
      } else {
        api.donate(&image, &config.label, config.auto_unlock)
      };
      donated.with_context(|| format!("上传图像 {} 失败", info.local_name()))?;

      info!("[{}/{}] 已上传图像: {}", index + 1, total, info.local_name());
    }
    Ok(())
  }
}

pub struct AnnotateTask {
  api: ImageMonkeyApi,
  annotation: PathBuf,
  image_id: String,
}

impl AnnotateTask {
  pub fn new(api: ImageMonkeyApi, annotation: PathBuf, image_id: String) -> Self {
    Self {
      api,
      annotation,
      image_id,
    }
  }
}

impl Task for AnnotateTask {
  type Error = anyhow::Error;

  fn run_task(self, dataset: &Dataset, config: &PipelineConfig) -> Result<(), Self::Error> {
    let filter = LabelFilter::Include(config.label.clone());
    let record = parse_file(&self.annotation, &filter)
      .with_context(|| format!("无法解析标注文件 {}", self.annotation.display()))?;

    let info = ImageInfo::new(&record.source_folder, &record.source_filename);
    let path = dataset.image_path(&config.label, &info);
    let source_url = image_url(dataset.archive(), info.folder(), info.filename())?;
    let image = config
      .transformer()
      .load(&path, config.scale, source_url.as_str())
      .with_context(|| format!("无法读取图像 {}", path.display()))?;

    let annotation = image.convert_annotation(&config.label, &record);
    info!(
      "提交 {} 个多边形到图像 {}",
      annotation.shapes.len(),
      self.image_id
    );
    self
      .api
      .add_annotations(&self.image_id, &annotation)
      .context("提交标注失败")?;
    Ok(())
  }
}

/// 按配置执行一次完整流程
pub fn run_pipeline(config: &PipelineConfig, interrupt: Interrupt) -> anyhow::Result<()> {
  let dataset = config.dataset();
  dataset.load().context("无法准备数据集")?;

  match &config.action {
    Action::Labels => LabelsTask.run_task(&dataset, config),
    Action::Download => DownloadTask::new(interrupt).run_task(&dataset, config),
    Action::Push => PushTask::new(config.api(), interrupt).run_task(&dataset, config),
    Action::Annotate {
      annotation,
      image_id,
    } => AnnotateTask::new(config.api(), annotation.clone(), image_id.clone())
      .run_task(&dataset, config),
  }
}
