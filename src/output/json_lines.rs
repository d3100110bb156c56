// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/output/json_lines.rs - 每帧一行 JSON 的结果输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::RgbFrame, output::Render, pipeline::FrameAnalytics, url_path,
};

#[derive(Error, Debug)]
pub enum JsonLinesOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 向文件追加分析结果，一帧一行
pub struct JsonLinesOutput {
  path: PathBuf,
  writer: Mutex<BufWriter<File>>,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(JsonLinesOutputError::SchemeMismatch);
    }
    Self::create(url_path(url))
  }
}

impl JsonLinesOutput {
  pub fn create(path: impl Into<PathBuf>) -> Result<Self, JsonLinesOutputError> {
    let path = path.into();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!("结果输出到: {}", path.display());
    Ok(Self {
      path,
      writer: Mutex::new(BufWriter::new(file)),
    })
  }

  pub fn path(&self) -> &PathBuf {
    &self.path
  }
}

impl Render<RgbFrame, FrameAnalytics> for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn render_result(&self, _frame: &RgbFrame, result: &FrameAnalytics) -> Result<(), Self::Error> {
    let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
    serde_json::to_writer(&mut *writer, result)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn appends_one_line_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("match.jsonl");
    let url = Url::parse(&format!("jsonl://{}", path.display())).unwrap();
    let output = JsonLinesOutput::from_url(&url).unwrap();

    let frame = RgbFrame::with_shape(1, 1);
    for n in 1..=3 {
      let record = FrameAnalytics {
        frame_number: n,
        ..FrameAnalytics::default()
      };
      output.render_result(&frame, &record).unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let frames: Vec<u64> = content
      .lines()
      .map(|l| serde_json::from_str::<FrameAnalytics>(l).unwrap().frame_number)
      .collect();
    assert_eq!(frames, vec![1, 2, 3]);
  }
}
