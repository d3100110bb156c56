// 该文件是 Pitchscope （球场视界） 项目的一部分。
// tests/pipeline.rs - 端到端流程测试
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use image::{Rgb, RgbImage};
use pitchscope::{
  FromUrl,
  calibration::{Calibrator, CalibratorConfig, KeypointMap},
  input::InputWrapper,
  model::{ClassLabels, Detector, DetectorConfig, RawOutput, ReplayModel},
  output::OutputWrapper,
  pipeline::{Analyzer, FrameAnalytics, Pipeline},
  task::{ContinuousTask, Task},
  team::{PaletteConfig, TeamClassifier, TeamColors},
};
use url::Url;

const FRAME_W: u32 = 200;
const FRAME_H: u32 = 100;

fn write_json(path: &Path, value: &impl serde::Serialize) {
  std::fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
}

/// 一名球员（框 (20, 10, 20, 60)）、一名裁判和一个球
fn player_output() -> RawOutput {
  #[rustfmt::skip]
  let data = vec![
    96.0, 320.0, 480.0,
    256.0, 256.0, 576.0,
    64.0, 64.0, 16.0,
    384.0, 384.0, 32.0,
    0.9, 0.0, 0.0,
    0.0, 0.85, 0.0,
    0.0, 0.0, 0.8,
  ];
  RawOutput {
    shape: vec![1, 7, 3],
    data,
  }
}

/// 四个角点，`shift` 为摄像机坐标中的水平平移（像素）
fn keypoint_output(shift: f32) -> RawOutput {
  // 640 / 200 = 3.2
  let dx = shift * 3.2;
  let xs = [dx, 640.0 + dx, 640.0 + dx, dx];
  let ys = [0.0, 0.0, 640.0, 640.0];
  let mut data = Vec::new();
  data.extend(xs);
  data.extend(ys);
  data.extend([10.0f32; 4]);
  data.extend([10.0f32; 4]);
  for class in 0..4 {
    for anchor in 0..4 {
      data.push(if class == anchor { 0.95 } else { 0.0 });
    }
  }
  RawOutput {
    shape: vec![1, 8, 4],
    data,
  }
}

fn replay_url(dir: &Path) -> Url {
  Url::parse(&format!("replay://{}", dir.display())).unwrap()
}

#[test]
fn frames_flow_from_folder_to_json_lines() {
  let root = tempfile::tempdir().unwrap();

  let frames = root.path().join("frames");
  std::fs::create_dir_all(&frames).unwrap();
  for n in 1..=3 {
    RgbImage::from_pixel(FRAME_W, FRAME_H, Rgb([250, 250, 250]))
      .save(frames.join(format!("{:04}.png", n)))
      .unwrap();
  }

  let players = root.path().join("players");
  let keypoints = root.path().join("keypoints");
  std::fs::create_dir_all(&players).unwrap();
  std::fs::create_dir_all(&keypoints).unwrap();
  // 第 2 帧几乎不动，第 3 帧摄像机平移 20 像素
  for (n, shift) in [(1, 0.0), (2, 1.0), (3, 20.0)] {
    write_json(&players.join(format!("{:04}.json", n)), &player_output());
    write_json(&keypoints.join(format!("{:04}.json", n)), &keypoint_output(shift));
  }

  let map = KeypointMap::from_json(
    r#"{"A": [0, 0], "B": [100, 0], "C": [100, 50], "D": [0, 50]}"#,
  )
  .unwrap();

  let player_detector = Detector::new(
    ReplayModel::from_url(&replay_url(&players)).unwrap(),
    DetectorConfig::default().with_labels(ClassLabels::new(["player", "referee", "ball"])),
  );
  let keypoint_detector = Detector::new(
    ReplayModel::from_url(&replay_url(&keypoints)).unwrap(),
    DetectorConfig::default()
      .with_confidence_threshold(0.7)
      .with_labels(ClassLabels::new(["A", "B", "C", "D"])),
  );

  let mut classifier = TeamClassifier::new(PaletteConfig::default());
  classifier.set_team_colors(
    &TeamColors::new("Team1", [30, 37, 48], [245, 253, 21]),
    &TeamColors::new("Team2", [251, 252, 250], [177, 252, 196]),
  );
  let analyzer = Analyzer::new(Calibrator::new(map, CalibratorConfig::default()), classifier)
    .with_source("folder");
  let pipeline = Pipeline::new(player_detector, keypoint_detector, analyzer);

  let input =
    InputWrapper::from_url(&Url::parse(&format!("folder://{}", frames.display())).unwrap())
      .unwrap();
  let jsonl = root.path().join("analytics.jsonl");
  let output =
    OutputWrapper::from_url(&Url::parse(&format!("jsonl://{}", jsonl.display())).unwrap())
      .unwrap();

  let summary = ContinuousTask::default()
    .run_task(input, pipeline, output)
    .unwrap();
  assert_eq!(summary.frames, 3);

  let records: Vec<FrameAnalytics> = std::fs::read_to_string(&jsonl)
    .unwrap()
    .lines()
    .map(|l| serde_json::from_str(l).unwrap())
    .collect();
  assert_eq!(records.len(), 3);

  let numbers: Vec<u64> = records.iter().map(|r| r.frame_number).collect();
  assert_eq!(numbers, vec![1, 2, 3]);
  let updated: Vec<bool> = records.iter().map(|r| r.homography_updated).collect();
  assert_eq!(updated, vec![true, false, true]);

  for record in &records {
    assert_eq!(record.source, "folder");
    assert_eq!(record.players.len(), 1);
    assert_eq!(record.balls.len(), 1);
    assert_eq!(record.keypoints.len(), 4);
    assert_eq!(record.team_ids, vec![1]);
    assert_eq!(record.tactical_positions.len(), 1);
  }

  // 球员底边中点 (30, 70)，未平移时映射到 (15, 35)
  let p = records[0].tactical_positions[0];
  assert!((p.x - 15.0).abs() < 1e-2 && (p.y - 35.0).abs() < 1e-2);
  // 第 2 帧沿用第 1 帧的矩阵
  assert_eq!(records[1].homography, records[0].homography);
  // 第 3 帧摄像机右移 20 像素，同一像素点对应地图上左移 10
  let p = records[2].tactical_positions[0];
  assert!((p.x - 5.0).abs() < 1e-2 && (p.y - 35.0).abs() < 1e-2);
}

#[test]
fn exhausted_recording_stops_the_task_with_an_error() {
  let root = tempfile::tempdir().unwrap();
  let frames = root.path().join("frames");
  let empty = root.path().join("empty");
  std::fs::create_dir_all(&frames).unwrap();
  std::fs::create_dir_all(&empty).unwrap();
  RgbImage::new(8, 8).save(frames.join("0001.png")).unwrap();

  let map = KeypointMap::from_json(r#"{"A": [0, 0]}"#).unwrap();
  let pipeline = Pipeline::new(
    Detector::new(
      ReplayModel::from_url(&replay_url(&empty)).unwrap(),
      DetectorConfig::default(),
    ),
    Detector::new(
      ReplayModel::from_url(&replay_url(&empty)).unwrap(),
      DetectorConfig::default(),
    ),
    Analyzer::new(
      Calibrator::new(map, CalibratorConfig::default()),
      TeamClassifier::default(),
    ),
  );

  let input =
    InputWrapper::from_url(&Url::parse(&format!("folder://{}", frames.display())).unwrap())
      .unwrap();
  let output = OutputWrapper::from_url(
    &Url::parse(&format!("jsonl://{}", root.path().join("out.jsonl").display())).unwrap(),
  )
  .unwrap();

  assert!(
    ContinuousTask::default()
      .run_task(input, pipeline, output)
      .is_err()
  );
}
