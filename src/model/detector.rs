// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/model/detector.rs - 目标检测器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::{debug, info};

use crate::{
  frame::{NchwTensor, RgbFrame},
  model::{
    ClassLabels, Detection, Model, RawOutput,
    decode::{self, DEFAULT_NUM_CLASSES, DecodeParams, OutputLayout},
    nms,
  },
};

/// 检测器参数
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  /// 模型输入尺寸 (宽, 高)
  pub input_size: (u32, u32),
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub labels: ClassLabels,
  /// 标签表为空且输出形状无法给出类别数时使用
  pub default_classes: usize,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      input_size: (640, 640),
      confidence_threshold: 0.6,
      iou_threshold: 0.45,
      labels: ClassLabels::default(),
      default_classes: DEFAULT_NUM_CLASSES,
    }
  }
}

impl DetectorConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_labels(mut self, labels: ClassLabels) -> Self {
    self.labels = labels;
    self
  }

  pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
    self.input_size = (width, height);
    self
  }
}

/// 预处理 → 推理 → 解码 → NMS
pub struct Detector<M> {
  model: M,
  config: DetectorConfig,
}

impl<M, E> Detector<M>
where
  M: Model<Input = NchwTensor, Output = RawOutput, Error = E>,
{
  pub fn new(model: M, config: DetectorConfig) -> Self {
    info!(
      "检测器初始化: 输入尺寸 {}x{}, 置信度阈值 {}, IoU 阈值 {}, 类别数 {}",
      config.input_size.0,
      config.input_size.1,
      config.confidence_threshold,
      config.iou_threshold,
      config.labels.len()
    );
    Self { model, config }
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn set_confidence_threshold(&mut self, threshold: f32) {
    debug!("置信度阈值: {} → {}", self.config.confidence_threshold, threshold);
    self.config.confidence_threshold = threshold;
  }

  pub fn set_iou_threshold(&mut self, threshold: f32) {
    debug!("IoU 阈值: {} → {}", self.config.iou_threshold, threshold);
    self.config.iou_threshold = threshold;
  }

  pub fn set_class_labels(&mut self, labels: ClassLabels) {
    debug!("类别表更新: {} 个类别", labels.len());
    self.config.labels = labels;
  }

  /// 检测帧中的目标；空帧直接返回空列表
  pub fn detect(&self, frame: &RgbFrame) -> Result<Vec<Detection>, E> {
    if frame.is_empty() {
      return Ok(Vec::new());
    }

    let (input_w, input_h) = self.config.input_size;
    let tensor = NchwTensor::from_frame(frame, input_w, input_h);
    let output = self.model.infer(&tensor)?;

    Ok(self.postprocess(&output, (frame.width() as u32, frame.height() as u32)))
  }

  /// 对一次推理输出做解码与 NMS
  pub fn postprocess(&self, output: &RawOutput, frame_size: (u32, u32)) -> Vec<Detection> {
    let layout = OutputLayout::from_shape(&output.shape).unwrap_or_else(|| {
      OutputLayout::infer(
        output.data.len(),
        &self.config.labels,
        self.config.default_classes,
      )
    });

    let params = DecodeParams {
      input_size: self.config.input_size,
      frame_size,
      labels: &self.config.labels,
      confidence_threshold: self.config.confidence_threshold,
    };

    let candidates = decode::decode(&output.data, layout, &params);
    let detections = nms::suppress(&candidates, self.config.iou_threshold);
    debug!(
      "NMS 前 {} 个候选框, NMS 后 {} 个",
      candidates.len(),
      detections.len()
    );
    detections
  }
}
