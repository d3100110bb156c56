// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbFrame,
  output::{Render, draw::annotate},
  pipeline::FrameAnalytics,
  url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 每帧一个 JSON 文件，按日期分目录：`<dir>/YYYY/MM/DD/frame-<n>.json`
///
/// 查询参数 `always` 让没有球员的帧也被记录，`image` 同时保存标注后的帧图像。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  always: bool,
  save_image: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    let save_image = uri.query_pairs().any(|(k, _)| k == "image");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(url_path(uri)),
      always,
      save_image,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_stem(&self, result: &FrameAnalytics) -> Result<PathBuf, DirectoryRecordOutputError> {
    let when = DateTime::<Utc>::from_timestamp_millis(result.timestamp_ms).unwrap_or_else(Utc::now);
    let directory = self
      .directory
      .join(when.year().to_string())
      .join(format!("{:02}", when.month()))
      .join(format!("{:02}", when.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }
    Ok(directory.join(format!("frame-{:06}", result.frame_number)))
  }
}

impl Render<RgbFrame, FrameAnalytics> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbFrame, result: &FrameAnalytics) -> Result<(), Self::Error> {
    if !self.always && result.players.is_empty() {
      debug!("第 {} 帧没有球员，不记录", result.frame_number);
      return Ok(());
    }

    let stem = self.frame_stem(result)?;
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(stem.with_extension("json"), json)?;
    if self.save_image {
      annotate(frame, result).save(stem.with_extension("png"))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{BBox, Detection, Point2};

  fn record(frame_number: u64, with_player: bool) -> FrameAnalytics {
    let players = if with_player {
      vec![Detection {
        bbox: BBox::new(1.0, 1.0, 2.0, 2.0),
        class_id: 0,
        confidence: 0.8,
        center: Point2::new(2.0, 2.0),
        label: "player".to_string(),
      }]
    } else {
      Vec::new()
    };
    FrameAnalytics {
      frame_number,
      // 2026-03-01T12:00:00Z
      timestamp_ms: 1_772_366_400_000,
      players,
      ..FrameAnalytics::default()
    }
  }

  #[test]
  fn writes_dated_records_and_skips_empty_frames() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("record://{}?image", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = RgbFrame::with_shape(4, 4);

    output.render_result(&frame, &record(1, true)).unwrap();
    output.render_result(&frame, &record(2, false)).unwrap();

    let day = dir.path().join("2026").join("03").join("01");
    assert!(day.join("frame-000001.json").exists());
    assert!(day.join("frame-000001.png").exists());
    assert!(!day.join("frame-000002.json").exists());

    let saved: FrameAnalytics =
      serde_json::from_str(&std::fs::read_to_string(day.join("frame-000001.json")).unwrap())
        .unwrap();
    assert_eq!(saved, record(1, true));
  }

  #[test]
  fn always_records_empty_frames() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("record://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    output
      .render_result(&RgbFrame::with_shape(1, 1), &record(9, false))
      .unwrap();
    assert!(
      dir
        .path()
        .join("2026/03/01/frame-000009.json")
        .exists()
    );
  }
}
