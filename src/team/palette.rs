// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/team/palette.rs - 球衣区域主色提取
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

use rand::{Rng, SeedableRng, distributions::WeightedIndex, prelude::Distribution, rngs::StdRng};
use tracing::trace;

use crate::{frame::RgbFrame, model::BBox};

pub type Rgb = [f32; 3];

#[derive(Debug, Clone)]
pub struct PaletteConfig {
  /// 调色板颜色数 k
  pub num_colors: usize,
  pub max_iters: usize,
  /// 中心最大位移不超过该值即收敛
  pub epsilon: f32,
  /// 重启次数，保留紧致度最好的一次
  pub attempts: usize,
  pub seed: u64,
}

impl Default for PaletteConfig {
  fn default() -> Self {
    Self {
      num_colors: 3,
      max_iters: 100,
      epsilon: 0.2,
      attempts: 3,
      seed: 0x7ea3,
    }
  }
}

/// 图像内的整数矩形 [x0, x1) × [y0, y1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
  pub x0: usize,
  pub y0: usize,
  pub x1: usize,
  pub y1: usize,
}

impl Region {
  pub fn width(&self) -> usize {
    self.x1 - self.x0
  }

  pub fn height(&self) -> usize {
    self.y1 - self.y0
  }

  pub fn area(&self) -> usize {
    self.width() * self.height()
  }
}

/// 把检测框裁剪到图像范围内，再取躯干区域：
/// 水平居中 40%，垂直方向以上三分之一处为中心、高 40%
pub fn jersey_region(frame_width: usize, frame_height: usize, bbox: &BBox) -> Option<Region> {
  let bx0 = bbox.x.max(0.0) as usize;
  let by0 = bbox.y.max(0.0) as usize;
  let bx1 = (bbox.xmax().max(0.0) as usize).min(frame_width);
  let by1 = (bbox.ymax().max(0.0) as usize).min(frame_height);
  if bx1 <= bx0 || by1 <= by0 {
    return None;
  }

  let w = bx1 - bx0;
  let h = by1 - by0;
  let cx0 = (w / 2).saturating_sub(w / 5);
  let cx1 = (w / 2 + w / 5).min(w);
  let cy0 = (h / 3).saturating_sub(h / 5);
  let cy1 = (h / 3 + h / 5).min(h);
  if cx1 <= cx0 || cy1 <= cy0 {
    return None;
  }

  Some(Region {
    x0: bx0 + cx0,
    y0: by0 + cy0,
    x1: bx0 + cx1,
    y1: by0 + cy1,
  })
}

fn region_pixels(frame: &RgbFrame, region: Region) -> Vec<Rgb> {
  let mut pixels = Vec::with_capacity(region.area());
  for y in region.y0..region.y1 {
    for x in region.x0..region.x1 {
      let [r, g, b] = frame.pixel(x, y);
      pixels.push([r as f32, g as f32, b as f32]);
    }
  }
  pixels
}

fn mean_color(samples: &[Rgb]) -> Rgb {
  let mut sum = [0.0f64; 3];
  for s in samples {
    for c in 0..3 {
      sum[c] += s[c] as f64;
    }
  }
  let n = samples.len().max(1) as f64;
  [
    (sum[0] / n) as f32,
    (sum[1] / n) as f32,
    (sum[2] / n) as f32,
  ]
}

fn distance_squared(a: &Rgb, b: &Rgb) -> f32 {
  (0..3).map(|c| (a[c] - b[c]) * (a[c] - b[c])).sum()
}

fn nearest(point: &Rgb, centers: &[Rgb]) -> (usize, f32) {
  let mut best = (0, f32::INFINITY);
  for (i, c) in centers.iter().enumerate() {
    let d = distance_squared(point, c);
    if d < best.1 {
      best = (i, d);
    }
  }
  best
}

/// 一次聚类的结果
#[derive(Debug, Clone)]
pub struct Clustering {
  pub centers: Vec<Rgb>,
  pub counts: Vec<usize>,
  /// 各点到所属中心的距离平方和
  pub compactness: f32,
}

fn seed_centers(samples: &[Rgb], k: usize, rng: &mut StdRng) -> Vec<Rgb> {
  let mut centers = Vec::with_capacity(k);
  centers.push(samples[rng.gen_range(0..samples.len())]);
  let mut dist: Vec<f32> = samples
    .iter()
    .map(|s| distance_squared(s, &centers[0]))
    .collect();

  while centers.len() < k {
    let index = match WeightedIndex::new(&dist) {
      Ok(weights) => weights.sample(rng),
      // 所有点都与已有中心重合
      Err(_) => rng.gen_range(0..samples.len()),
    };
    let center = samples[index];
    for (d, s) in dist.iter_mut().zip(samples) {
      *d = d.min(distance_squared(s, &center));
    }
    centers.push(center);
  }
  centers
}

fn run_once(samples: &[Rgb], config: &PaletteConfig, rng: &mut StdRng) -> Clustering {
  let k = config.num_colors;
  let eps2 = config.epsilon * config.epsilon;
  let mut centers = seed_centers(samples, k, rng);
  let mut labels = vec![0usize; samples.len()];

  for iter in 0..config.max_iters.max(1) {
    for (label, s) in labels.iter_mut().zip(samples) {
      *label = nearest(s, &centers).0;
    }

    let mut sums = vec![[0.0f64; 3]; k];
    let mut counts = vec![0usize; k];
    for (label, s) in labels.iter().zip(samples) {
      counts[*label] += 1;
      for c in 0..3 {
        sums[*label][c] += s[c] as f64;
      }
    }

    let mut updated = centers.clone();
    for j in 0..k {
      if counts[j] > 0 {
        let n = counts[j] as f64;
        updated[j] = [
          (sums[j][0] / n) as f32,
          (sums[j][1] / n) as f32,
          (sums[j][2] / n) as f32,
        ];
      }
    }

    // 空簇取离自己中心最远的点
    for j in 0..k {
      if counts[j] > 0 {
        continue;
      }
      let farthest = labels
        .iter()
        .zip(samples)
        .enumerate()
        .filter(|(_, (label, _))| counts[**label] > 1)
        .map(|(i, (label, s))| (i, distance_squared(s, &updated[*label])))
        .max_by(|a, b| a.1.total_cmp(&b.1));
      if let Some((i, _)) = farthest {
        counts[labels[i]] -= 1;
        labels[i] = j;
        counts[j] = 1;
        updated[j] = samples[i];
      }
    }

    let shift = centers
      .iter()
      .zip(&updated)
      .map(|(a, b)| distance_squared(a, b))
      .fold(0.0f32, f32::max);
    centers = updated;
    if shift <= eps2 {
      trace!("k-means 第 {} 轮收敛", iter + 1);
      break;
    }
  }

  let mut counts = vec![0usize; k];
  let mut compactness = 0.0;
  for (label, s) in labels.iter_mut().zip(samples) {
    let (j, d) = nearest(s, &centers);
    *label = j;
    counts[j] += 1;
    compactness += d;
  }

  Clustering {
    centers,
    counts,
    compactness,
  }
}

/// k-means++ 聚类，多次重启取紧致度最小者；要求 `samples.len() >= k > 0`
pub fn kmeans(samples: &[Rgb], config: &PaletteConfig, rng: &mut StdRng) -> Clustering {
  let mut best: Option<Clustering> = None;
  for _ in 0..config.attempts.max(1) {
    let result = run_once(samples, config, rng);
    if best
      .as_ref()
      .is_none_or(|b| result.compactness < b.compactness)
    {
      best = Some(result);
    }
  }
  best.unwrap_or(Clustering {
    centers: Vec::new(),
    counts: Vec::new(),
    compactness: 0.0,
  })
}

/// 提取球员球衣区域的调色板，按像素数降序排列
///
/// 区域无效时返回空；像素数少于 k 时返回区域平均色。
pub fn extract_palette(frame: &RgbFrame, bbox: &BBox, config: &PaletteConfig) -> Vec<Rgb> {
  let Some(region) = jersey_region(frame.width(), frame.height(), bbox) else {
    return Vec::new();
  };

  let samples = region_pixels(frame, region);
  if config.num_colors == 0 || samples.len() < config.num_colors {
    return vec![mean_color(&samples)];
  }

  let mut rng = StdRng::seed_from_u64(config.seed);
  let clustering = kmeans(&samples, config, &mut rng);

  let mut order: Vec<usize> = (0..clustering.centers.len()).collect();
  order.sort_by(|a, b| clustering.counts[*b].cmp(&clustering.counts[*a]));
  order.into_iter().map(|i| clustering.centers[i]).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn jersey_region_uses_integer_fractions() {
    // 框 100×90：x ∈ [50-20, 50+20)，y ∈ [30-18, 30+18)
    let region = jersey_region(1000, 1000, &BBox::new(10.0, 20.0, 100.0, 90.0)).unwrap();
    assert_eq!(
      region,
      Region {
        x0: 40,
        y0: 32,
        x1: 80,
        y1: 68
      }
    );
  }

  #[test]
  fn jersey_region_is_clamped_to_frame() {
    let region = jersey_region(60, 60, &BBox::new(-40.0, -40.0, 100.0, 100.0)).unwrap();
    // 裁剪后 60×60：x ∈ [18, 42)，y ∈ [8, 32)
    assert_eq!(
      region,
      Region {
        x0: 18,
        y0: 8,
        x1: 42,
        y1: 32
      }
    );
    assert!(jersey_region(60, 60, &BBox::new(100.0, 100.0, 10.0, 10.0)).is_none());
  }

  #[test]
  fn tiny_region_falls_back_to_mean_color() {
    let mut frame = RgbFrame::with_shape(10, 10);
    // 5×5 的框只剩 x ∈ [1, 3)，y ∈ [0, 2) 共 4 个像素
    frame.fill_rect(1, 0, 3, 1, [10, 20, 30]);
    frame.fill_rect(1, 1, 3, 2, [30, 40, 50]);
    let config = PaletteConfig {
      num_colors: 5,
      ..PaletteConfig::default()
    };
    let palette = extract_palette(&frame, &BBox::new(0.0, 0.0, 5.0, 5.0), &config);
    assert_eq!(palette, vec![[20.0, 30.0, 40.0]]);

    assert!(extract_palette(&frame, &BBox::new(0.0, 0.0, 3.0, 3.0), &config).is_empty());
  }

  #[test]
  fn palette_is_sorted_by_population() {
    let mut frame = RgbFrame::with_shape(100, 100);
    // 区域为 x ∈ [30, 70)，y ∈ [13, 53)：共 1600 像素
    frame.fill_rect(0, 0, 100, 100, [200, 30, 30]);
    frame.fill_rect(30, 13, 70, 23, [20, 20, 220]);
    frame.fill_rect(30, 23, 40, 53, [240, 240, 240]);

    let palette = extract_palette(&frame, &BBox::new(0.0, 0.0, 100.0, 100.0), &PaletteConfig::default());
    assert_eq!(palette.len(), 3);
    // 红 900，蓝 400，白 300
    assert_eq!(palette[0], [200.0, 30.0, 30.0]);
    assert_eq!(palette[1], [20.0, 20.0, 220.0]);
    assert_eq!(palette[2], [240.0, 240.0, 240.0]);
  }

  #[test]
  fn uniform_region_still_yields_k_colors() {
    let mut frame = RgbFrame::with_shape(50, 50);
    frame.fill_rect(0, 0, 50, 50, [5, 100, 5]);
    let palette = extract_palette(&frame, &BBox::new(0.0, 0.0, 50.0, 50.0), &PaletteConfig::default());
    assert_eq!(palette.len(), 3);
    assert!(palette.iter().all(|c| *c == [5.0, 100.0, 5.0]));
  }

  #[test]
  fn clustering_is_deterministic_for_a_seed() {
    let samples: Vec<Rgb> = (0..90)
      .map(|i| [(i % 3) as f32 * 80.0 + (i % 7) as f32, (i % 5) as f32, 40.0])
      .collect();
    let config = PaletteConfig::default();
    let a = kmeans(&samples, &config, &mut StdRng::seed_from_u64(1));
    let b = kmeans(&samples, &config, &mut StdRng::seed_from_u64(1));
    assert_eq!(a.centers, b.centers);
    assert_eq!(a.counts.iter().sum::<usize>(), 90);
  }
}
