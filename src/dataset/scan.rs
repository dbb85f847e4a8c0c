// 该文件是 Qiaoliang （桥梁） 项目的一部分。
// src/dataset/scan.rs - 枚举标注文件
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

use walkdir::WalkDir;

const ANNOTATION_EXTENSION: &str = ".xml";

/// 递归列出 `root` 下所有 `.xml` 文件，按文件名排序
pub fn annotation_files(root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
  let mut files = Vec::new();
  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry?;
    if entry.file_type().is_file()
      && entry
        .file_name()
        .to_string_lossy()
        .ends_with(ANNOTATION_EXTENSION)
    {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}
