// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pitchscope::{
  FromUrl,
  calibration::{Calibrator, CalibratorConfig, KeypointMap, RansacConfig},
  input::InputWrapper,
  model::{ClassLabels, Detector, DetectorConfig, ReplayModel},
  output::OutputWrapper,
  pipeline::{Analyzer, Pipeline, PlayerClasses},
  task::{ContinuousTask, Task},
  team::{PaletteConfig, TeamClassifier, TeamColors, load_team_colors},
};

fn default_teams(args: &args::Args) -> [TeamColors; 2] {
  [
    TeamColors::new(args.team1_name.as_str(), [30, 37, 48], [245, 253, 21]),
    TeamColors::new(args.team2_name.as_str(), [251, 252, 250], [177, 252, 196]),
  ]
}

fn keypoint_labels(args: &args::Args, map: &KeypointMap) -> Result<ClassLabels> {
  match &args.keypoint_labels {
    Some(path) => {
      let content = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取关键点类别文件 {}", path.display()))?;
      let labels: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("关键点类别文件格式错误 {}", path.display()))?;
      Ok(ClassLabels::new(labels))
    }
    None => Ok(map.class_labels()),
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("球员模型: {}", args.player_model);
  info!("关键点模型: {}", args.keypoint_model);

  let map = KeypointMap::load(&args.keypoint_map)?;
  if let Some(tactical_map) = &args.tactical_map {
    map.check_tactical_map(tactical_map)?;
  }

  let [first, second] = match &args.teams {
    Some(path) => load_team_colors(path)?,
    None => default_teams(&args),
  };

  let player_detector = Detector::new(
    ReplayModel::from_url(&args.player_model)?,
    DetectorConfig::default()
      .with_input_size(args.input_size, args.input_size)
      .with_confidence_threshold(args.player_conf)
      .with_iou_threshold(args.iou)
      .with_labels(ClassLabels::new(args.player_labels.iter().cloned())),
  );
  let keypoint_detector = Detector::new(
    ReplayModel::from_url(&args.keypoint_model)?,
    DetectorConfig::default()
      .with_input_size(args.input_size, args.input_size)
      .with_confidence_threshold(args.keypoint_conf)
      .with_iou_threshold(args.iou)
      .with_labels(keypoint_labels(&args, &map)?),
  );

  let calibrator = Calibrator::new(
    map,
    CalibratorConfig {
      displacement_tolerance: args.tolerance,
      ransac: RansacConfig {
        inlier_threshold: args.ransac_threshold,
        seed: args.seed,
        ..RansacConfig::default()
      },
    },
  );
  let mut classifier = TeamClassifier::new(PaletteConfig {
    num_colors: args.palette,
    seed: args.seed,
    ..PaletteConfig::default()
  });
  classifier.set_team_colors(&first, &second);

  let analyzer = Analyzer::new(calibrator, classifier)
    .with_classes(PlayerClasses::from_labels(&args.player_labels))
    .with_source(args.input.as_str());
  let pipeline = Pipeline::new(player_detector, keypoint_detector, analyzer);

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .run_task(input, pipeline, output)?;

  Ok(())
}
