// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::model::{BBox, Detection};

/// 计算两个边界框的 IoU；并集面积为零时返回 0
pub fn iou(a: &BBox, b: &BBox) -> f32 {
  let intersection = a.intersection_area(b);
  let union = a.area() + b.area() - intersection;

  if union > 0.0 {
    (intersection / union).clamp(0.0, 1.0)
  } else {
    0.0
  }
}

/// 按类别做非极大值抑制，结果按置信度降序排列
///
/// 排序是稳定的：置信度相同的检测保持输入顺序，先出现者优先保留。
/// 已被抑制的检测不再抑制其他检测。
pub fn suppress(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
  let mut sorted: Vec<&Detection> = detections.iter().collect();
  sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut suppressed = vec![false; sorted.len()];
  let mut result = Vec::new();

  for i in 0..sorted.len() {
    if suppressed[i] {
      continue;
    }
    let keep = sorted[i];
    result.push(keep.clone());

    for j in (i + 1)..sorted.len() {
      if suppressed[j] || sorted[j].class_id != keep.class_id {
        continue;
      }
      if iou(&keep.bbox, &sorted[j].bbox) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  result
}
