// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/team/color.rs - sRGB 与 CIE Lab 颜色转换
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

use serde::{Deserialize, Serialize};

// D65 白点
const WHITE_X: f32 = 0.950_47;
const WHITE_Y: f32 = 1.0;
const WHITE_Z: f32 = 1.088_83;

const DELTA: f32 = 6.0 / 29.0;

/// CIE Lab 颜色，L ∈ [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lab {
  pub l: f32,
  pub a: f32,
  pub b: f32,
}

impl Lab {
  /// CIE76 色差
  pub fn distance(&self, other: &Lab) -> f32 {
    let dl = self.l - other.l;
    let da = self.a - other.a;
    let db = self.b - other.b;
    (dl * dl + da * da + db * db).sqrt()
  }
}

fn srgb_to_linear(c: f32) -> f32 {
  let c = c / 255.0;
  if c <= 0.040_45 {
    c / 12.92
  } else {
    ((c + 0.055) / 1.055).powf(2.4)
  }
}

fn lab_f(t: f32) -> f32 {
  if t > DELTA * DELTA * DELTA {
    t.cbrt()
  } else {
    t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
  }
}

/// 8 位 sRGB（可为聚类得到的浮点中心）转 Lab
pub fn rgb_to_lab(rgb: [f32; 3]) -> Lab {
  let r = srgb_to_linear(rgb[0]);
  let g = srgb_to_linear(rgb[1]);
  let b = srgb_to_linear(rgb[2]);

  let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
  let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
  let z = 0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b;

  let fx = lab_f(x / WHITE_X);
  let fy = lab_f(y / WHITE_Y);
  let fz = lab_f(z / WHITE_Z);

  Lab {
    l: 116.0 * fy - 16.0,
    a: 500.0 * (fx - fy),
    b: 200.0 * (fy - fz),
  }
}

pub fn rgb8_to_lab(rgb: [u8; 3]) -> Lab {
  rgb_to_lab([rgb[0] as f32, rgb[1] as f32, rgb[2] as f32])
}
