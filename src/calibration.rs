// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/calibration.rs - 摄像机到战术地图的单应性标定
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

use std::collections::HashMap;

use nalgebra::Matrix3;
use tracing::{debug, info, warn};

use crate::model::{Detection, Point2};

pub mod homography;
pub mod keypoint_map;

pub use homography::{HomographyError, HomographyFit, RansacConfig};
pub use keypoint_map::{KeypointMap, KeypointMapError};

/// 跨帧保存的标定状态
#[derive(Debug, Clone, Default)]
pub struct HomographyState {
  /// 当前的摄像机 → 地图变换，首次成功拟合前为空
  pub matrix: Option<Matrix3<f64>>,
  /// 计算当前矩阵时使用的 (摄像机坐标, 关键点名称)
  pub reference_keypoints: Vec<(Point2, String)>,
  pub last_update_frame: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CalibratorConfig {
  /// 关键点均方根位移超过该值（像素）才重新计算
  pub displacement_tolerance: f32,
  pub ransac: RansacConfig,
}

impl Default for CalibratorConfig {
  fn default() -> Self {
    Self {
      displacement_tolerance: 7.0,
      ransac: RansacConfig::default(),
    }
  }
}

struct Correspondence<'a> {
  src: Point2,
  dst: Point2,
  label: &'a str,
}

/// 维护单应性矩阵，只在摄像机明显移动时重新估计
#[derive(Debug, Clone)]
pub struct Calibrator {
  map: KeypointMap,
  config: CalibratorConfig,
  state: HomographyState,
}

impl Calibrator {
  pub fn new(map: KeypointMap, config: CalibratorConfig) -> Self {
    info!(
      "标定器初始化: {} 个地图关键点, 位移容差 {} 像素, 内点阈值 {}",
      map.len(),
      config.displacement_tolerance,
      config.ransac.inlier_threshold
    );
    Self {
      map,
      config,
      state: HomographyState::default(),
    }
  }

  pub fn keypoint_map(&self) -> &KeypointMap {
    &self.map
  }

  pub fn state(&self) -> &HomographyState {
    &self.state
  }

  pub fn has_valid(&self) -> bool {
    self.state.matrix.is_some()
  }

  pub fn current_matrix(&self) -> Option<&Matrix3<f64>> {
    self.state.matrix.as_ref()
  }

  /// 以行优先数组返回当前矩阵，便于序列化
  pub fn matrix(&self) -> Option<[[f64; 3]; 3]> {
    self.state.matrix.map(|m| {
      let mut rows = [[0.0; 3]; 3];
      for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
          *v = m[(r, c)];
        }
      }
      rows
    })
  }

  /// 用本帧关键点更新标定，返回矩阵是否被重新计算
  ///
  /// 少于 4 对对应点或拟合失败时保留原矩阵。
  pub fn update(&mut self, keypoints: &[Detection], frame_number: i64) -> bool {
    let correspondences: Vec<Correspondence> = keypoints
      .iter()
      .filter_map(|d| {
        self.map.get(&d.label).map(|dst| Correspondence {
          src: d.center,
          dst,
          label: d.label.as_str(),
        })
      })
      .collect();

    if correspondences.len() < homography::MIN_CORRESPONDENCES {
      debug!(
        "第 {} 帧: 仅 {} 对对应点，跳过标定",
        frame_number,
        correspondences.len()
      );
      return false;
    }

    if !self.needs_recompute(&correspondences, frame_number) {
      return false;
    }

    let src: Vec<Point2> = correspondences.iter().map(|c| c.src).collect();
    let dst: Vec<Point2> = correspondences.iter().map(|c| c.dst).collect();

    match homography::fit_ransac(&src, &dst, &self.config.ransac) {
      Ok(fit) => {
        self.state = HomographyState {
          matrix: Some(fit.h),
          reference_keypoints: correspondences
            .iter()
            .map(|c| (c.src, c.label.to_string()))
            .collect(),
          last_update_frame: Some(frame_number),
        };
        info!(
          "第 {} 帧: 单应性矩阵已更新, 内点 {}/{}",
          frame_number,
          fit.n_inliers,
          correspondences.len()
        );
        true
      }
      Err(e) => {
        warn!("第 {} 帧: 单应性拟合失败，保留原矩阵: {}", frame_number, e);
        false
      }
    }
  }

  fn needs_recompute(&self, current: &[Correspondence], frame_number: i64) -> bool {
    if self.state.last_update_frame.is_none() || frame_number <= 0 {
      return true;
    }

    let previous: HashMap<&str, Point2> = self
      .state
      .reference_keypoints
      .iter()
      .map(|(p, label)| (label.as_str(), *p))
      .collect();

    let displacements: Vec<f32> = current
      .iter()
      .filter_map(|c| previous.get(c.label).map(|p| p.distance_squared(&c.src)))
      .collect();

    if displacements.len() < homography::MIN_CORRESPONDENCES {
      debug!(
        "第 {} 帧: 与参考帧仅 {} 个共同关键点，重新计算",
        frame_number,
        displacements.len()
      );
      return true;
    }

    let rmse = (displacements.iter().sum::<f32>() / displacements.len() as f32).sqrt();
    debug!("第 {} 帧: 关键点位移 RMSE {:.3}", frame_number, rmse);
    rmse > self.config.displacement_tolerance
  }

  /// 把摄像机坐标投影到战术地图；没有有效矩阵或齐次分量接近零时原样返回
  pub fn project(&self, point: Point2) -> Point2 {
    self
      .state
      .matrix
      .as_ref()
      .and_then(|h| homography::apply(h, point))
      .unwrap_or(point)
  }

  /// 用检测框底边中点（近似脚下位置）投影球员；没有有效矩阵时返回空列表
  pub fn project_players(&self, players: &[Detection]) -> Vec<Point2> {
    if !self.has_valid() {
      return Vec::new();
    }
    players
      .iter()
      .map(|d| self.project(d.bbox.bottom_center()))
      .collect()
  }
}
