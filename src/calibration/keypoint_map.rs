// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/calibration/keypoint_map.rs - 球场关键点映射
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

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{error, info};

use crate::model::{ClassLabels, Point2};

#[derive(Error, Debug)]
pub enum KeypointMapError {
  #[error("无法读取关键点映射文件 {0}: {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("关键点映射格式错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("关键点映射为空")]
  Empty,
  #[error("关键点 '{name}' 坐标 ({x}, {y}) 超出战术地图范围 {width}x{height}")]
  OutOfBounds {
    name: String,
    x: f32,
    y: f32,
    width: u32,
    height: u32,
  },
  #[error("无法读取战术地图尺寸: {0}")]
  TacticalMap(#[from] image::ImageError),
}

/// 关键点名称 → 战术地图坐标，启动时加载一次，之后只读
///
/// 保留文件中的书写顺序，关键点模型的类别编号即按此顺序排列。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointMap {
  points: IndexMap<String, Point2>,
}

impl KeypointMap {
  /// 解析 `{ "名称": [x, y], ... }` 形式的 JSON
  pub fn from_json(content: &str) -> Result<Self, KeypointMapError> {
    let raw: IndexMap<String, [f32; 2]> = serde_json::from_str(content)?;
    if raw.is_empty() {
      return Err(KeypointMapError::Empty);
    }
    Ok(Self {
      points: raw
        .into_iter()
        .map(|(name, [x, y])| (name, Point2::new(x, y)))
        .collect(),
    })
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, KeypointMapError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
      error!("无法打开关键点映射文件: {}", path.display());
      KeypointMapError::IoError(path.to_path_buf(), e)
    })?;
    let map = Self::from_json(&content)?;
    info!("关键点映射已加载: {} 个点", map.len());
    Ok(map)
  }

  pub fn get(&self, name: &str) -> Option<Point2> {
    self.points.get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Point2)> {
    self.points.iter().map(|(k, v)| (k.as_str(), *v))
  }

  /// 以文件顺序构造关键点模型的类别表
  pub fn class_labels(&self) -> ClassLabels {
    ClassLabels::new(self.points.keys().cloned())
  }

  /// 检查全部坐标都落在 `width × height` 的战术地图内
  pub fn check_bounds(&self, width: u32, height: u32) -> Result<(), KeypointMapError> {
    for (name, p) in self.iter() {
      if p.x < 0.0 || p.y < 0.0 || p.x > width as f32 || p.y > height as f32 {
        return Err(KeypointMapError::OutOfBounds {
          name: name.to_string(),
          x: p.x,
          y: p.y,
          width,
          height,
        });
      }
    }
    Ok(())
  }

  /// 读取战术地图图像尺寸并检查坐标范围
  pub fn check_tactical_map(&self, path: impl AsRef<Path>) -> Result<(u32, u32), KeypointMapError> {
    let (width, height) = image::image_dimensions(path.as_ref())?;
    info!("战术地图尺寸: {}x{}", width, height);
    self.check_bounds(width, height)?;
    Ok((width, height))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MAP: &str = r#"{
    "Center circle": [640, 360],
    "Left penalty spot": [150.5, 360]
  }"#;

  #[test]
  fn parses_name_to_coordinate_pairs() {
    let map = KeypointMap::from_json(MAP).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("Center circle"), Some(Point2::new(640.0, 360.0)));
    assert_eq!(map.get("Left penalty spot"), Some(Point2::new(150.5, 360.0)));
    assert_eq!(map.get("Right corner"), None);
  }

  #[test]
  fn class_ids_follow_file_order() {
    let map = KeypointMap::from_json(
      r#"{"Top left corner": [0, 0], "Center circle": [640, 360], "Bottom right corner": [1280, 720]}"#,
    )
    .unwrap();
    let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
    assert_eq!(
      names,
      vec!["Top left corner", "Center circle", "Bottom right corner"]
    );

    let labels = map.class_labels();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.resolve(0), "Top left corner");
    assert_eq!(labels.resolve(1), "Center circle");
    assert_eq!(labels.resolve(2), "Bottom right corner");
  }

  #[test]
  fn rejects_empty_and_malformed_maps() {
    assert!(matches!(
      KeypointMap::from_json("{}"),
      Err(KeypointMapError::Empty)
    ));
    assert!(matches!(
      KeypointMap::from_json(r#"{"a": [1]}"#),
      Err(KeypointMapError::ParseError(_))
    ));
  }

  #[test]
  fn bounds_are_checked() {
    let map = KeypointMap::from_json(MAP).unwrap();
    assert!(map.check_bounds(1280, 720).is_ok());
    assert!(matches!(
      map.check_bounds(600, 720),
      Err(KeypointMapError::OutOfBounds { .. })
    ));
  }

  #[test]
  fn load_reports_missing_file() {
    assert!(matches!(
      KeypointMap::load("/nonexistent/pitch_map.json"),
      Err(KeypointMapError::IoError(..))
    ));
  }
}
