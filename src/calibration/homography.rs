// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/calibration/homography.rs - 单应性矩阵估计
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

use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::{SeedableRng, rngs::StdRng, seq::index};
use thiserror::Error;
use tracing::debug;

use crate::model::Point2;

pub const MIN_CORRESPONDENCES: usize = 4;
const COLLINEAR_EPS: f64 = 1e-6;
const SINGULAR_EPS: f64 = 1e-12;

#[derive(Error, Debug, PartialEq)]
pub enum HomographyError {
  #[error("对应点不足: 需要至少 4 对, 实际 {0} 对")]
  NotEnoughPoints(usize),
  #[error("源点与目标点数量不一致: {0} != {1}")]
  LengthMismatch(usize, usize),
  #[error("对应点几何退化，无法估计单应性矩阵")]
  Degenerate,
}

/// RANSAC 参数
#[derive(Debug, Clone)]
pub struct RansacConfig {
  /// 内点的重投影误差阈值（目标坐标系单位）
  pub inlier_threshold: f64,
  pub max_iters: usize,
  pub confidence: f64,
  pub seed: u64,
}

impl Default for RansacConfig {
  fn default() -> Self {
    Self {
      inlier_threshold: 3.0,
      max_iters: 2000,
      confidence: 0.995,
      seed: 0x5eed,
    }
  }
}

/// 估计结果
#[derive(Debug, Clone)]
pub struct HomographyFit {
  pub h: Matrix3<f64>,
  pub inliers: Vec<bool>,
  pub n_inliers: usize,
}

/// 用齐次坐标变换一个点；尺度分量接近零时返回 `None`
pub fn apply(h: &Matrix3<f64>, p: Point2) -> Option<Point2> {
  let v = h * Vector3::new(p.x as f64, p.y as f64, 1.0);
  let w = v[2];
  if w.abs() < 1e-6 {
    return None;
  }
  Some(Point2::new((v[0] / w) as f32, (v[1] / w) as f32))
}

fn reprojection_error(h: &Matrix3<f64>, src: Point2, dst: Point2) -> f64 {
  match apply(h, src) {
    Some(p) => (p.distance_squared(&dst) as f64).sqrt(),
    None => f64::INFINITY,
  }
}

/// 将点集平移到质心、缩放到平均距离 √2 的相似变换
fn normalization(points: &[Point2]) -> Matrix3<f64> {
  let n = points.len() as f64;
  let (sx, sy) = points
    .iter()
    .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
  let (cx, cy) = (sx / n, sy / n);
  let mean_dist = points
    .iter()
    .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
    .sum::<f64>()
    / n;
  let s = if mean_dist > f64::EPSILON {
    std::f64::consts::SQRT_2 / mean_dist
  } else {
    1.0
  };
  Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn transform(t: &Matrix3<f64>, p: Point2) -> (f64, f64) {
  let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
  (v[0] / v[2], v[1] / v[2])
}

/// 归一化 DLT：对全部对应点做最小二乘拟合
pub fn fit_dlt(src: &[Point2], dst: &[Point2]) -> Result<Matrix3<f64>, HomographyError> {
  if src.len() != dst.len() {
    return Err(HomographyError::LengthMismatch(src.len(), dst.len()));
  }
  if src.len() < MIN_CORRESPONDENCES {
    return Err(HomographyError::NotEnoughPoints(src.len()));
  }

  let t_src = normalization(src);
  let t_dst = normalization(dst);

  // 4 个点时只有 8 行，补零行使 SVD 给出完整的 V
  let rows = (2 * src.len()).max(9);
  let mut a = DMatrix::<f64>::zeros(rows, 9);
  for (i, (s, d)) in src.iter().zip(dst).enumerate() {
    let (x, y) = transform(&t_src, *s);
    let (u, v) = transform(&t_dst, *d);
    let r = 2 * i;
    a.row_mut(r)
      .copy_from_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]);
    a.row_mut(r + 1)
      .copy_from_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]);
  }

  let svd = a.svd(false, true);
  let v_t = svd.v_t.ok_or(HomographyError::Degenerate)?;
  let (min_idx, _) = svd
    .singular_values
    .iter()
    .enumerate()
    .min_by(|a, b| a.1.total_cmp(b.1))
    .ok_or(HomographyError::Degenerate)?;
  let h = v_t.row(min_idx);
  let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

  let t_dst_inv = t_dst.try_inverse().ok_or(HomographyError::Degenerate)?;
  let mut h = t_dst_inv * hn * t_src;

  let scale = h[(2, 2)];
  if scale.abs() > SINGULAR_EPS {
    h /= scale;
  }
  if !h.iter().all(|v| v.is_finite()) || h.determinant().abs() < SINGULAR_EPS {
    return Err(HomographyError::Degenerate);
  }
  Ok(h)
}

fn collinear(a: Point2, b: Point2, c: Point2) -> bool {
  let cross = (b.x as f64 - a.x as f64) * (c.y as f64 - a.y as f64)
    - (b.y as f64 - a.y as f64) * (c.x as f64 - a.x as f64);
  cross.abs() < COLLINEAR_EPS
}

/// 最小样本中任意三点共线即视为退化
fn degenerate_sample(points: &[Point2]) -> bool {
  let n = points.len();
  for i in 0..n {
    for j in (i + 1)..n {
      for k in (j + 1)..n {
        if collinear(points[i], points[j], points[k]) {
          return true;
        }
      }
    }
  }
  false
}

fn score(
  h: &Matrix3<f64>,
  src: &[Point2],
  dst: &[Point2],
  threshold: f64,
) -> (Vec<bool>, usize, f64) {
  let mut inliers = vec![false; src.len()];
  let mut count = 0;
  let mut err_sum = 0.0;
  for (i, (s, d)) in src.iter().zip(dst).enumerate() {
    let err = reprojection_error(h, *s, *d);
    if err <= threshold {
      inliers[i] = true;
      count += 1;
      err_sum += err;
    }
  }
  (inliers, count, err_sum)
}

fn required_iterations(confidence: f64, inlier_ratio: f64, max_iters: usize) -> usize {
  let p_good = inlier_ratio.powi(MIN_CORRESPONDENCES as i32);
  if p_good >= 1.0 - f64::EPSILON {
    return 1;
  }
  if p_good <= f64::EPSILON {
    return max_iters;
  }
  let n = (1.0 - confidence).ln() / (1.0 - p_good).ln();
  (n.ceil() as usize).clamp(1, max_iters)
}

/// RANSAC 鲁棒拟合：随机 4 点采样，统计内点，最后用全部内点重新拟合
pub fn fit_ransac(
  src: &[Point2],
  dst: &[Point2],
  config: &RansacConfig,
) -> Result<HomographyFit, HomographyError> {
  if src.len() != dst.len() {
    return Err(HomographyError::LengthMismatch(src.len(), dst.len()));
  }
  let n = src.len();
  if n < MIN_CORRESPONDENCES {
    return Err(HomographyError::NotEnoughPoints(n));
  }

  if n == MIN_CORRESPONDENCES {
    if degenerate_sample(src) || degenerate_sample(dst) {
      return Err(HomographyError::Degenerate);
    }
    let h = fit_dlt(src, dst)?;
    let (inliers, n_inliers, _) = score(&h, src, dst, config.inlier_threshold);
    if n_inliers < MIN_CORRESPONDENCES {
      return Err(HomographyError::Degenerate);
    }
    return Ok(HomographyFit {
      h,
      inliers,
      n_inliers,
    });
  }

  let mut rng = StdRng::seed_from_u64(config.seed);
  let mut best: Option<(Vec<bool>, usize, f64)> = None;
  let mut iters_needed = config.max_iters;
  let mut iter = 0;

  while iter < iters_needed {
    iter += 1;
    let sample = index::sample(&mut rng, n, MIN_CORRESPONDENCES).into_vec();
    let s: Vec<Point2> = sample.iter().map(|&i| src[i]).collect();
    let d: Vec<Point2> = sample.iter().map(|&i| dst[i]).collect();
    if degenerate_sample(&s) || degenerate_sample(&d) {
      continue;
    }
    let Ok(h) = fit_dlt(&s, &d) else {
      continue;
    };

    let (inliers, count, err_sum) = score(&h, src, dst, config.inlier_threshold);
    let better = match &best {
      None => count >= MIN_CORRESPONDENCES,
      Some((_, best_count, best_err)) => {
        count > *best_count || (count == *best_count && err_sum < *best_err)
      }
    };
    if better {
      iters_needed =
        required_iterations(config.confidence, count as f64 / n as f64, config.max_iters);
      best = Some((inliers, count, err_sum));
    }
  }

  let (inliers, _, _) = best.ok_or(HomographyError::Degenerate)?;
  debug!("RANSAC 迭代 {} 次", iter);

  let s: Vec<Point2> = (0..n).filter(|&i| inliers[i]).map(|i| src[i]).collect();
  let d: Vec<Point2> = (0..n).filter(|&i| inliers[i]).map(|i| dst[i]).collect();
  let h = fit_dlt(&s, &d)?;
  let (inliers, n_inliers, _) = score(&h, src, dst, config.inlier_threshold);
  if n_inliers < MIN_CORRESPONDENCES {
    return Err(HomographyError::Degenerate);
  }

  Ok(HomographyFit {
    h,
    inliers,
    n_inliers,
  })
}
