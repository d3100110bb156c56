// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/input/image_sequence.rs - 目录图像序列输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbFrame, url_path};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Error, Debug)]
pub enum ImageSequenceInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按文件名顺序逐帧读取目录中的图像
///
/// 某个文件读取失败时记录错误并结束序列。
pub struct ImageSequenceInput {
  files: Vec<PathBuf>,
  cursor: usize,
}

impl FromUrlWithScheme for ImageSequenceInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageSequenceInput {
  type Error = ImageSequenceInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageSequenceInputError::SchemeMismatch);
    }
    Self::open(url_path(url))
  }
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| {
      IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
    })
}

impl ImageSequenceInput {
  pub fn open(directory: impl AsRef<Path>) -> Result<Self, ImageSequenceInputError> {
    let directory = directory.as_ref();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if path.is_file() && is_image(&path) {
        files.push(path);
      }
    }
    files.sort();
    info!("图像序列 {}: 共 {} 帧", directory.display(), files.len());
    Ok(Self { files, cursor: 0 })
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

impl Iterator for ImageSequenceInput {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.files.get(self.cursor)?;
    self.cursor += 1;
    debug!("读取图像: {}", path.display());

    match ImageReader::open(path).map_err(image::ImageError::IoError).and_then(|r| r.decode()) {
      Ok(image) => Some(RgbFrame::from(image.to_rgb8())),
      Err(e) => {
        error!("无法读取图像 {}: {}，结束序列", path.display(), e);
        self.cursor = self.files.len();
        None
      }
    }
  }
}
