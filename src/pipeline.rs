// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/pipeline.rs - 单帧分析流程
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

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
  calibration::{Calibrator, homography::MIN_CORRESPONDENCES},
  frame::{NchwTensor, RgbFrame},
  model::{Detection, Detector, Model, Point2, RawOutput},
  team::TeamClassifier,
};

/// 对帧做处理的步骤，带跨帧状态
pub trait Process<F> {
  type Output;
  type Error;
  fn process(&mut self, frame_number: u64, frame: &F) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum PipelineError<E> {
  #[error("球员检测失败: {0}")]
  PlayerDetection(E),
  #[error("关键点检测失败: {0}")]
  KeypointDetection(E),
}

/// 球员检测模型的类别编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerClasses {
  pub player: usize,
  pub referee: usize,
  pub ball: usize,
}

impl Default for PlayerClasses {
  fn default() -> Self {
    Self {
      player: 0,
      referee: 1,
      ball: 2,
    }
  }
}

impl PlayerClasses {
  /// 按标签名查找类别编号，找不到的沿用默认编号
  pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
    let position = |name: &str| labels.iter().position(|l| l.as_ref() == name);
    let default = Self::default();
    Self {
      player: position("player").unwrap_or(default.player),
      referee: position("referee").unwrap_or(default.referee),
      ball: position("ball").unwrap_or(default.ball),
    }
  }
}

/// 一帧的分析结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalytics {
  pub frame_number: u64,
  /// 处理时刻，Unix 毫秒
  pub timestamp_ms: i64,
  pub source: String,
  pub players: Vec<Detection>,
  pub keypoints: Vec<Detection>,
  pub balls: Vec<Detection>,
  /// 与 players 一一对应；未配置球队时为空
  pub team_ids: Vec<usize>,
  /// 与 players 一一对应；没有有效单应性矩阵时为空
  pub tactical_positions: Vec<Point2>,
  pub homography: Option<[[f64; 3]; 3]>,
  pub homography_updated: bool,
}

/// 标定 → 球队判断 → 投影
pub struct Analyzer {
  calibrator: Calibrator,
  classifier: TeamClassifier,
  classes: PlayerClasses,
  source: String,
}

impl Analyzer {
  pub fn new(calibrator: Calibrator, classifier: TeamClassifier) -> Self {
    Self {
      calibrator,
      classifier,
      classes: PlayerClasses::default(),
      source: String::new(),
    }
  }

  pub fn with_classes(mut self, classes: PlayerClasses) -> Self {
    self.classifier = self.classifier.with_player_class(classes.player);
    self.classes = classes;
    self
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = source.into();
    self
  }

  pub fn calibrator(&self) -> &Calibrator {
    &self.calibrator
  }

  pub fn classifier(&self) -> &TeamClassifier {
    &self.classifier
  }

  /// 球员检测结果拆成球员与球，裁判不进入记录
  pub fn analyze(
    &mut self,
    frame_number: u64,
    frame: &RgbFrame,
    detections: Vec<Detection>,
    keypoints: Vec<Detection>,
  ) -> FrameAnalytics {
    let (players, balls): (Vec<Detection>, Vec<Detection>) = detections
      .into_iter()
      .filter(|d| d.class_id == self.classes.player || d.class_id == self.classes.ball)
      .partition(|d| d.class_id == self.classes.player);

    let homography_updated = if keypoints.len() >= MIN_CORRESPONDENCES {
      self.calibrator.update(&keypoints, frame_number as i64)
    } else {
      debug!("第 {} 帧: 关键点 {} 个，不做标定", frame_number, keypoints.len());
      false
    };

    let team_ids = if players.is_empty() {
      Vec::new()
    } else {
      self.classifier.classify(frame, &players)
    };

    let tactical_positions = if players.is_empty() {
      Vec::new()
    } else {
      self.calibrator.project_players(&players)
    };

    FrameAnalytics {
      frame_number,
      timestamp_ms: Utc::now().timestamp_millis(),
      source: self.source.clone(),
      players,
      keypoints,
      balls,
      team_ids,
      tactical_positions,
      homography: self.calibrator.matrix(),
      homography_updated,
    }
  }
}

/// 两个检测器（球员/球、球场关键点）加分析器
pub struct Pipeline<M> {
  players: Detector<M>,
  keypoints: Detector<M>,
  analyzer: Analyzer,
}

impl<M, E> Pipeline<M>
where
  M: Model<Input = NchwTensor, Output = RawOutput, Error = E>,
{
  pub fn new(players: Detector<M>, keypoints: Detector<M>, analyzer: Analyzer) -> Self {
    Self {
      players,
      keypoints,
      analyzer,
    }
  }

  pub fn analyzer(&self) -> &Analyzer {
    &self.analyzer
  }
}

impl<M, E> Process<RgbFrame> for Pipeline<M>
where
  M: Model<Input = NchwTensor, Output = RawOutput, Error = E>,
{
  type Output = FrameAnalytics;
  type Error = PipelineError<E>;

  fn process(&mut self, frame_number: u64, frame: &RgbFrame) -> Result<FrameAnalytics, Self::Error> {
    let detections = self
      .players
      .detect(frame)
      .map_err(PipelineError::PlayerDetection)?;
    let keypoints = self
      .keypoints
      .detect(frame)
      .map_err(PipelineError::KeypointDetection)?;
    debug!(
      "第 {} 帧: {} 个球员/球检测, {} 个关键点",
      frame_number,
      detections.len(),
      keypoints.len()
    );
    Ok(self.analyzer.analyze(frame_number, frame, detections, keypoints))
  }
}
