// 该文件是 Pitchscope （球场视界） 项目的一部分。
// tests/suppression_properties.rs - 解码与 NMS 的性质测试
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use pitchscope::model::{
  BBox, ClassLabels, DecodeParams, Detection, OutputLayout, Point2, decode, iou, suppress,
};
use proptest::prelude::*;

fn bbox() -> impl Strategy<Value = BBox> {
  (0.0f32..500.0, 0.0f32..500.0, 0.0f32..120.0, 0.0f32..120.0)
    .prop_map(|(x, y, w, h)| BBox::new(x, y, w, h))
}

fn detection() -> impl Strategy<Value = Detection> {
  (bbox(), 0usize..3, 0.0f32..1.0).prop_map(|(bbox, class_id, confidence)| Detection {
    center: Point2::new(bbox.x + bbox.width / 2.0, bbox.y + bbox.height / 2.0),
    bbox,
    class_id,
    confidence,
    label: format!("class_{}", class_id),
  })
}

proptest! {
  #[test]
  fn iou_is_symmetric_and_bounded(a in bbox(), b in bbox()) {
    let ab = iou(&a, &b);
    prop_assert_eq!(ab, iou(&b, &a));
    prop_assert!((0.0..=1.0 + 1e-6).contains(&ab));
  }

  #[test]
  fn iou_with_itself_is_one(a in bbox()) {
    prop_assume!(a.area() > 1e-3);
    prop_assert!((iou(&a, &a) - 1.0).abs() < 1e-5);
  }

  #[test]
  fn suppression_output_is_sorted_subset(
    detections in prop::collection::vec(detection(), 0..40),
    threshold in 0.1f32..0.9,
  ) {
    let kept = suppress(&detections, threshold);
    prop_assert!(kept.len() <= detections.len());
    prop_assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    for d in &kept {
      prop_assert!(detections.contains(d));
    }
  }

  #[test]
  fn suppression_is_idempotent(
    detections in prop::collection::vec(detection(), 0..40),
    threshold in 0.1f32..0.9,
  ) {
    let once = suppress(&detections, threshold);
    let twice = suppress(&once, threshold);
    prop_assert_eq!(once, twice);
  }

  #[test]
  fn kept_boxes_of_one_class_do_not_overlap_beyond_threshold(
    detections in prop::collection::vec(detection(), 0..40),
    threshold in 0.1f32..0.9,
  ) {
    let kept = suppress(&detections, threshold);
    for (i, a) in kept.iter().enumerate() {
      for b in &kept[i + 1..] {
        if a.class_id == b.class_id {
          prop_assert!(iou(&a.bbox, &b.bbox) <= threshold);
        }
      }
    }
  }

  #[test]
  fn classes_are_suppressed_independently(
    detections in prop::collection::vec(detection(), 0..40),
    threshold in 0.1f32..0.9,
  ) {
    let all = suppress(&detections, threshold);
    for class_id in 0..3 {
      let only: Vec<Detection> = detections
        .iter()
        .filter(|d| d.class_id == class_id)
        .cloned()
        .collect();
      let from_all: Vec<Detection> = all
        .iter()
        .filter(|d| d.class_id == class_id)
        .cloned()
        .collect();
      prop_assert_eq!(suppress(&only, threshold), from_all);
    }
  }

  #[test]
  fn decode_tolerates_any_buffer_length(
    data in prop::collection::vec(0.0f32..1.0, 0..200),
    threshold in 0.0f32..1.0,
  ) {
    let labels = ClassLabels::new(["player", "referee", "ball"]);
    let layout = OutputLayout::infer(data.len(), &labels, 80);
    let params = DecodeParams {
      input_size: (640, 640),
      frame_size: (1280, 720),
      labels: &labels,
      confidence_threshold: threshold,
    };
    let detections = decode(&data, layout, &params);
    prop_assert!(detections.len() <= data.len() / 7);
    for d in &detections {
      prop_assert!(d.confidence > threshold);
      prop_assert!(d.class_id < 3);
    }
  }
}
