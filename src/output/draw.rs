// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/output/draw.rs - 分析结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_hollow_rect_mut},
  rect::Rect,
};

use crate::{frame::RgbFrame, model::BBox, pipeline::FrameAnalytics};

const TEAM_COLORS: [[u8; 3]; 2] = [[220, 40, 40], [40, 90, 230]];
const UNASSIGNED_COLOR: [u8; 3] = [160, 160, 160];
const BALL_COLOR: [u8; 3] = [255, 220, 0];
const KEYPOINT_COLOR: [u8; 3] = [0, 255, 128];
const KEYPOINT_RADIUS: i32 = 3;
const BOX_THICKNESS: i32 = 2;

fn draw_box(image: &mut RgbImage, bbox: &BBox, color: [u8; 3]) {
  let (w, h) = (image.width() as i32, image.height() as i32);
  let x_min = (bbox.x.floor() as i32).clamp(0, w - 1);
  let y_min = (bbox.y.floor() as i32).clamp(0, h - 1);
  let x_max = (bbox.xmax().ceil() as i32).clamp(0, w - 1);
  let y_max = (bbox.ymax().ceil() as i32).clamp(0, h - 1);
  if x_min >= x_max || y_min >= y_max {
    return;
  }

  // 加粗为 2 像素
  for t in 0..BOX_THICKNESS {
    let width = x_max - x_min - 2 * t;
    let height = y_max - y_min - 2 * t;
    if width <= 0 || height <= 0 {
      break;
    }
    let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
    draw_hollow_rect_mut(image, rect, Rgb(color));
  }
}

/// 球员框按球队着色，球和关键点另色标出
pub fn annotate(frame: &RgbFrame, result: &FrameAnalytics) -> RgbImage {
  let mut image = frame.to_rgb_image();
  if image.width() == 0 || image.height() == 0 {
    return image;
  }

  for (i, player) in result.players.iter().enumerate() {
    let color = result
      .team_ids
      .get(i)
      .and_then(|team| TEAM_COLORS.get(*team))
      .copied()
      .unwrap_or(UNASSIGNED_COLOR);
    draw_box(&mut image, &player.bbox, color);
  }
  for ball in &result.balls {
    draw_box(&mut image, &ball.bbox, BALL_COLOR);
  }
  for keypoint in &result.keypoints {
    draw_filled_circle_mut(
      &mut image,
      (keypoint.center.x as i32, keypoint.center.y as i32),
      KEYPOINT_RADIUS,
      Rgb(KEYPOINT_COLOR),
    );
  }
  image
}
