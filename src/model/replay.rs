// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/model/replay.rs - 回放录制的网络输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::NchwTensor,
  model::{Model, RawOutput},
  url_path,
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("录制文件解析错误 {0}: {1}")]
  ParseError(PathBuf, serde_json::Error),
  #[error("录制已播放完毕，共 {0} 帧")]
  Exhausted(usize),
}

/// 按文件名顺序逐帧返回录制好的网络输出
///
/// 每个文件是 `{ "shape": [...], "data": [...] }` 形式的 JSON。
#[derive(Debug)]
pub struct ReplayModel {
  files: Vec<PathBuf>,
  cursor: Mutex<usize>,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::open(url_path(url))
  }
}

impl ReplayModel {
  pub fn open(directory: impl Into<PathBuf>) -> Result<Self, ReplayModelError> {
    let directory = directory.into();
    info!("加载录制输出目录: {}", directory.display());

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      if path.extension().is_some_and(|ext| ext == "json") {
        files.push(path);
      }
    }
    files.sort();

    info!("共 {} 帧录制输出", files.len());
    Ok(Self {
      files,
      cursor: Mutex::new(0),
    })
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  fn next_index(&self) -> usize {
    let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
    let index = *cursor;
    *cursor = index + 1;
    index
  }
}

impl Model for ReplayModel {
  type Input = NchwTensor;
  type Output = RawOutput;
  type Error = ReplayModelError;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let index = self.next_index();
    let path = self
      .files
      .get(index)
      .ok_or(ReplayModelError::Exhausted(self.files.len()))?;

    debug!("回放第 {} 帧输出: {}", index, path.display());
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
      error!("录制文件解析失败: {}", path.display());
      ReplayModelError::ParseError(path.clone(), e)
    })
  }
}
