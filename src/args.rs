// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Pitchscope 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// - 单张图像: image:///path/to/frame.png
  /// - 图像目录: folder:///path/to/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出
  /// - JSON Lines 文件: jsonl:///path/to/analytics.jsonl
  /// - 按日期分目录记录: record:///path/to/dir[?always][&image]
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 球员/裁判/球检测模型，如 replay:///path/to/player_outputs
  #[arg(long, value_name = "MODEL")]
  pub player_model: Url,

  /// 球场关键点检测模型，如 replay:///path/to/keypoint_outputs
  #[arg(long, value_name = "MODEL")]
  pub keypoint_model: Url,

  /// 关键点名称到战术地图坐标的 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub keypoint_map: PathBuf,

  /// 战术地图图像，用于检查关键点坐标范围
  #[arg(long, value_name = "FILE")]
  pub tactical_map: Option<PathBuf>,

  /// 球队颜色配置 JSON，不指定时使用默认颜色
  #[arg(long, value_name = "FILE")]
  pub teams: Option<PathBuf>,

  /// 关键点检测器的类别名称（JSON 字符串数组），不指定时按关键点映射的键顺序
  #[arg(long, value_name = "FILE")]
  pub keypoint_labels: Option<PathBuf>,

  /// 球员检测模型的类别名称
  #[arg(long, value_delimiter = ',', default_value = "player,referee,ball")]
  pub player_labels: Vec<String>,

  /// 球员检测置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.6", value_name = "THRESHOLD")]
  pub player_conf: f32,

  /// 关键点检测置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.7", value_name = "THRESHOLD")]
  pub keypoint_conf: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 模型输入尺寸（正方形边长）
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub input_size: u32,

  /// 触发重新标定的关键点均方根位移（像素）
  #[arg(long, default_value = "7.0", value_name = "PIXELS")]
  pub tolerance: f32,

  /// RANSAC 内点阈值
  #[arg(long, default_value = "3.0", value_name = "PIXELS")]
  pub ransac_threshold: f64,

  /// 每名球员提取的调色板颜色数
  #[arg(long, default_value = "3", value_name = "COUNT")]
  pub palette: usize,

  /// 随机数种子（RANSAC 与 k-means）
  #[arg(long, default_value = "0", value_name = "SEED")]
  pub seed: u64,

  #[arg(long, default_value = "Team1")]
  pub team1_name: String,

  #[arg(long, default_value = "Team2")]
  pub team2_name: String,

  /// 最大处理帧数，不指定则处理全部输入
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<u64>,
}
