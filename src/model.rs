// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/model.rs - 模型与检测结果
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::{Deserialize, Serialize};

/// 神经网络前向推理，对本库而言是一个不透明的函数
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 网络原始输出：扁平的浮点缓冲区及其形状
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOutput {
  pub shape: Vec<usize>,
  pub data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
  pub x: f32,
  pub y: f32,
}

impl Point2 {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  pub fn distance_squared(&self, other: &Point2) -> f32 {
    let dx = self.x - other.x;
    let dy = self.y - other.y;
    dx * dx + dy * dy
  }
}

/// 轴对齐矩形 (x, y, width, height)，原图像素坐标
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BBox {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn xmax(&self) -> f32 {
    self.x + self.width
  }

  pub fn ymax(&self) -> f32 {
    self.y + self.height
  }

  pub fn area(&self) -> f32 {
    self.width * self.height
  }

  /// 底边中点，近似球员脚下在地面上的位置
  pub fn bottom_center(&self) -> Point2 {
    Point2::new(self.x + self.width / 2.0, self.y + self.height)
  }

  /// 交集面积，不超过两框中较小者的面积
  ///
  /// 边长在 f64 下计算：极窄的框在 f32 中 `(x + w) - x` 可能大于 `w`。
  pub fn intersection_area(&self, other: &BBox) -> f32 {
    let overlap = |a0: f32, a1: f32, b0: f32, b1: f32| {
      let lo = (a0 as f64).max(b0 as f64);
      let hi = (a0 as f64 + a1 as f64).min(b0 as f64 + b1 as f64);
      (hi - lo).max(0.0)
    };
    let w = overlap(self.x, self.width, other.x, other.width);
    let h = overlap(self.y, self.height, other.y, other.height);
    ((w * h) as f32).min(self.area()).min(other.area()).max(0.0)
  }
}

/// 一个检测到的目标实例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub bbox: BBox,
  pub class_id: usize,
  pub confidence: f32,
  /// 代表点：模型输入空间中的框中心，换算到原图坐标
  pub center: Point2,
  pub label: String,
}

/// 类别标签表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassLabels {
  labels: Vec<String>,
}

impl ClassLabels {
  pub fn new<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      labels: labels.into_iter().map(Into::into).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// 解析类别名称；超出标签表范围时返回 `class_<id>`
  pub fn resolve(&self, class_id: usize) -> String {
    self
      .labels
      .get(class_id)
      .cloned()
      .unwrap_or_else(|| format!("class_{}", class_id))
  }
}

pub mod decode;
pub mod detector;
pub mod nms;
pub mod replay;

pub use self::decode::{DecodeParams, OutputLayout, decode};
pub use self::detector::{Detector, DetectorConfig};
pub use self::nms::{iou, suppress};
pub use self::replay::{ReplayModel, ReplayModelError};
