// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/model/decode.rs - 检测输出解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::{debug, warn};

use crate::model::{BBox, ClassLabels, Detection, Point2};

/// 标签表为空时使用的默认类别数
pub const DEFAULT_NUM_CLASSES: usize = 80;
const BOX_CHANNELS: usize = 4;

/// 输出张量布局：`4 + num_classes` 个通道 × `num_anchors` 个锚点，通道优先
///
/// 通道顺序为 cx, cy, w, h，之后每个类别一行置信度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
  pub num_classes: usize,
  pub num_anchors: usize,
}

impl OutputLayout {
  /// 由缓冲区长度推断：类别数取自标签表（为空则取默认值），锚点数 = 长度 / (4 + 类别数)
  pub fn infer(len: usize, labels: &ClassLabels, default_classes: usize) -> Self {
    let num_classes = if labels.is_empty() {
      default_classes
    } else {
      labels.len()
    };
    Self {
      num_classes,
      num_anchors: len / (BOX_CHANNELS + num_classes),
    }
  }

  /// 由张量形状 `[1, 4 + nc, anchors]` 或 `[4 + nc, anchors]` 得到布局
  pub fn from_shape(shape: &[usize]) -> Option<Self> {
    let (channels, anchors) = match shape {
      [1, c, a] | [c, a] => (*c, *a),
      _ => return None,
    };
    if channels <= BOX_CHANNELS {
      return None;
    }
    Some(Self {
      num_classes: channels - BOX_CHANNELS,
      num_anchors: anchors,
    })
  }

  pub fn channels(&self) -> usize {
    BOX_CHANNELS + self.num_classes
  }

  /// 缓冲区中能完整读出的锚点数
  ///
  /// 通道优先布局下，锚点 i 的最后一个值位于 `(channels - 1) * num_anchors + i`。
  fn usable_anchors(&self, len: usize) -> usize {
    let last_row = (self.channels() - 1) * self.num_anchors;
    if len >= last_row + self.num_anchors {
      self.num_anchors
    } else {
      len.saturating_sub(last_row).min(self.num_anchors)
    }
  }
}

/// 解码参数
#[derive(Debug, Clone)]
pub struct DecodeParams<'a> {
  /// 模型输入尺寸 (宽, 高)
  pub input_size: (u32, u32),
  /// 原始帧尺寸 (宽, 高)
  pub frame_size: (u32, u32),
  pub labels: &'a ClassLabels,
  pub confidence_threshold: f32,
}

/// 将网络原始输出解码为原图坐标下的检测框
///
/// 缓冲区长度不足时只解码能完整读出的锚点，不会报错；最坏情况返回空列表。
pub fn decode(output: &[f32], layout: OutputLayout, params: &DecodeParams) -> Vec<Detection> {
  let mut detections = Vec::new();

  let (input_w, input_h) = params.input_size;
  if input_w == 0 || input_h == 0 || layout.num_anchors == 0 {
    return detections;
  }

  let anchors = layout.usable_anchors(output.len());
  if anchors < layout.num_anchors {
    warn!(
      "输出缓冲区不足: 长度 {}, 布局 {}x{}, 仅解码 {} 个锚点",
      output.len(),
      layout.channels(),
      layout.num_anchors,
      anchors
    );
  }

  let stride = layout.num_anchors;
  let scale_x = params.frame_size.0 as f32 / input_w as f32;
  let scale_y = params.frame_size.1 as f32 / input_h as f32;

  for i in 0..anchors {
    let cx = output[i];
    let cy = output[stride + i];
    // 负的宽高按 0 处理
    let w = output[2 * stride + i].max(0.0);
    let h = output[3 * stride + i].max(0.0);

    // 找到最高置信度的类别，相同分数取较小的类别号
    let mut best: Option<(usize, f32)> = None;
    let mut max_conf = 0.0f32;
    for c in 0..layout.num_classes {
      let conf = output[(BOX_CHANNELS + c) * stride + i];
      if conf > max_conf {
        max_conf = conf;
        best = Some((c, conf));
      }
    }

    let Some((class_id, confidence)) = best else {
      continue;
    };
    if confidence <= params.confidence_threshold {
      continue;
    }

    detections.push(Detection {
      bbox: BBox::new(
        (cx - w / 2.0) * scale_x,
        (cy - h / 2.0) * scale_y,
        w * scale_x,
        h * scale_y,
      ),
      class_id,
      confidence,
      center: Point2::new(cx * scale_x, cy * scale_y),
      label: params.labels.resolve(class_id),
    });
  }

  debug!("解码得到 {} 个候选框", detections.len());
  detections
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params(labels: &ClassLabels) -> DecodeParams<'_> {
    DecodeParams {
      input_size: (640, 640),
      frame_size: (1280, 1280),
      labels,
      confidence_threshold: 0.5,
    }
  }

  #[test]
  fn single_anchor_is_rescaled_to_frame() {
    let labels = ClassLabels::new(["player", "ball"]);
    let output = [100.0, 100.0, 20.0, 40.0, 0.9, 0.1];
    let layout = OutputLayout::infer(output.len(), &labels, DEFAULT_NUM_CLASSES);
    assert_eq!(
      layout,
      OutputLayout {
        num_classes: 2,
        num_anchors: 1
      }
    );

    let detections = decode(&output, layout, &params(&labels));
    assert_eq!(detections.len(), 1);
    let det = &detections[0];
    assert_eq!(det.bbox, BBox::new(180.0, 160.0, 40.0, 80.0));
    assert_eq!(det.class_id, 0);
    assert!((det.confidence - 0.9).abs() < 1e-6);
    assert_eq!(det.center, Point2::new(200.0, 200.0));
    assert_eq!(det.label, "player");
  }

  #[test]
  fn channel_major_with_several_anchors() {
    let labels = ClassLabels::default();
    // 3 个锚点，2 个类别
    #[rustfmt::skip]
    let output = [
      10.0, 20.0, 30.0, // cx
      10.0, 20.0, 30.0, // cy
      4.0, 4.0, 4.0,    // w
      4.0, 4.0, 4.0,    // h
      0.2, 0.7, 0.5,    // class 0
      0.6, 0.1, 0.4,    // class 1
    ];
    let layout = OutputLayout::from_shape(&[1, 6, 3]).unwrap();
    let detections = decode(&output, layout, &params(&labels));

    // 第三个锚点最大置信度 0.5 不超过阈值，被丢弃
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_id, 1);
    assert_eq!(detections[0].label, "class_1");
    assert_eq!(detections[1].class_id, 0);
    assert_eq!(detections[1].center, Point2::new(40.0, 40.0));
  }

  #[test]
  fn negative_size_becomes_empty_box_at_center() {
    let labels = ClassLabels::new(["player", "ball"]);
    let output = [100.0, 100.0, -20.0, 40.0, 0.9, 0.1];
    let layout = OutputLayout::infer(output.len(), &labels, DEFAULT_NUM_CLASSES);

    let detections = decode(&output, layout, &params(&labels));
    assert_eq!(detections.len(), 1);
    let bbox = detections[0].bbox;
    assert_eq!(bbox, BBox::new(200.0, 160.0, 0.0, 80.0));
    assert!(bbox.width >= 0.0 && bbox.height >= 0.0);
  }

  #[test]
  fn undersized_buffer_truncates_instead_of_failing() {
    let labels = ClassLabels::new(["player", "ball"]);
    let layout = OutputLayout {
      num_classes: 2,
      num_anchors: 4,
    };
    // 完整缓冲区需要 24 个值，这里只有 22 个：最后一行只够前两个锚点
    let mut output = vec![0.0f32; 22];
    output[20] = 0.9;
    output[21] = 0.8;
    let detections = decode(&output, layout, &params(&labels));
    assert_eq!(detections.len(), 2);
    assert!(detections.iter().all(|d| d.class_id == 1));

    assert!(decode(&[1.0, 2.0], layout, &params(&labels)).is_empty());
    assert!(decode(&[], layout, &params(&labels)).is_empty());
  }

  #[test]
  fn inferred_layout_uses_default_class_count() {
    let labels = ClassLabels::default();
    let layout = OutputLayout::infer(84 * 10, &labels, DEFAULT_NUM_CLASSES);
    assert_eq!(layout.num_classes, 80);
    assert_eq!(layout.num_anchors, 10);
  }

  #[test]
  fn unsupported_shapes_are_rejected() {
    assert!(OutputLayout::from_shape(&[2, 6, 3]).is_none());
    assert!(OutputLayout::from_shape(&[4, 3]).is_none());
    assert!(OutputLayout::from_shape(&[8400]).is_none());
  }
}
