// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/team.rs - 基于球衣颜色的球队归属判断
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

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{frame::RgbFrame, model::Detection};

pub mod color;
pub mod palette;

pub use color::{Lab, rgb_to_lab, rgb8_to_lab};
pub use palette::{PaletteConfig, extract_palette};

/// 支持的球队数量
pub const TEAM_COUNT: usize = 2;

#[derive(Error, Debug)]
pub enum TeamConfigError {
  #[error("无法读取球队配置文件 {0}: {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("球队配置格式错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("需要恰好 2 支球队, 实际 {0} 支")]
  TeamCount(usize),
}

/// 配置文件中的一支球队，颜色为 8 位 RGB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamColors {
  pub name: String,
  #[serde(rename = "player")]
  pub player_color: [u8; 3],
  #[serde(rename = "goalkeeper")]
  pub goalkeeper_color: [u8; 3],
}

#[derive(Debug, Deserialize)]
struct TeamsFile {
  teams: Vec<TeamColors>,
}

impl TeamColors {
  pub fn new(name: impl Into<String>, player_color: [u8; 3], goalkeeper_color: [u8; 3]) -> Self {
    Self {
      name: name.into(),
      player_color,
      goalkeeper_color,
    }
  }
}

/// 读取 `{"teams": [{"name": ..., "player": [r, g, b], "goalkeeper": [r, g, b]}, ...]}`
pub fn load_team_colors(path: impl AsRef<Path>) -> Result<[TeamColors; TEAM_COUNT], TeamConfigError> {
  let path = path.as_ref();
  let content = std::fs::read_to_string(path).map_err(|e| {
    error!("无法打开球队配置文件: {}", path.display());
    TeamConfigError::IoError(path.to_path_buf(), e)
  })?;
  parse_team_colors(&content)
}

pub fn parse_team_colors(content: &str) -> Result<[TeamColors; TEAM_COUNT], TeamConfigError> {
  let TeamsFile { teams } = serde_json::from_str(content)?;
  let count = teams.len();
  <[TeamColors; TEAM_COUNT]>::try_from(teams).map_err(|_| TeamConfigError::TeamCount(count))
}

/// 一支球队的参考颜色，存为 Lab
#[derive(Debug, Clone, PartialEq)]
pub struct TeamColorReference {
  pub name: String,
  pub player: Lab,
  pub goalkeeper: Lab,
}

impl From<&TeamColors> for TeamColorReference {
  fn from(colors: &TeamColors) -> Self {
    Self {
      name: colors.name.clone(),
      player: rgb8_to_lab(colors.player_color),
      goalkeeper: rgb8_to_lab(colors.goalkeeper_color),
    }
  }
}

/// 一名球员的投票结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamVote {
  pub team: usize,
  pub votes: [usize; TEAM_COUNT],
}

pub struct TeamClassifier {
  teams: Option<[TeamColorReference; TEAM_COUNT]>,
  palette: PaletteConfig,
  player_class: usize,
}

impl TeamClassifier {
  pub fn new(palette: PaletteConfig) -> Self {
    Self {
      teams: None,
      palette,
      player_class: 0,
    }
  }

  pub fn with_player_class(mut self, class_id: usize) -> Self {
    self.player_class = class_id;
    self
  }

  pub fn set_team_colors(&mut self, first: &TeamColors, second: &TeamColors) {
    info!(
      "球队颜色已配置: {} (球员 {:?}, 守门员 {:?}), {} (球员 {:?}, 守门员 {:?})",
      first.name,
      first.player_color,
      first.goalkeeper_color,
      second.name,
      second.player_color,
      second.goalkeeper_color
    );
    self.teams = Some([first.into(), second.into()]);
  }

  pub fn is_configured(&self) -> bool {
    self.teams.is_some()
  }

  pub fn teams(&self) -> Option<&[TeamColorReference; TEAM_COUNT]> {
    self.teams.as_ref()
  }

  /// 调色板中每个颜色投给 Lab 距离最近的参考色所属球队
  ///
  /// 票数相同时编号小的球队获胜；调色板为空或未配置时归为 0 号球队。
  pub fn vote(&self, palette: &[Lab]) -> TeamVote {
    let mut votes = [0usize; TEAM_COUNT];
    let Some(teams) = &self.teams else {
      return TeamVote { team: 0, votes };
    };

    let references: Vec<(usize, &Lab)> = teams
      .iter()
      .enumerate()
      .flat_map(|(id, t)| [(id, &t.player), (id, &t.goalkeeper)])
      .collect();

    for color in palette {
      let mut closest = 0;
      let mut min_distance = f32::MAX;
      for (id, reference) in &references {
        let distance = color.distance(reference);
        if distance < min_distance {
          min_distance = distance;
          closest = *id;
        }
      }
      votes[closest] += 1;
    }

    let mut team = 0;
    let mut max_votes = 0;
    for (id, &count) in votes.iter().enumerate() {
      if count > max_votes {
        max_votes = count;
        team = id;
      }
    }
    TeamVote { team, votes }
  }

  /// 为每个球员类别的检测给出球队编号，其他类别跳过；未配置球队时返回空列表
  pub fn classify(&self, frame: &RgbFrame, detections: &[Detection]) -> Vec<usize> {
    if self.teams.is_none() {
      warn!("未配置球队颜色，跳过球队判断");
      return Vec::new();
    }

    detections
      .iter()
      .filter(|d| d.class_id == self.player_class)
      .map(|d| {
        let palette: Vec<Lab> = extract_palette(frame, &d.bbox, &self.palette)
          .into_iter()
          .map(rgb_to_lab)
          .collect();
        let vote = self.vote(&palette);
        debug!("球员框 {:?}: 投票 {:?} → 球队 {}", d.bbox, vote.votes, vote.team);
        vote.team
      })
      .collect()
  }
}

impl Default for TeamClassifier {
  fn default() -> Self {
    Self::new(PaletteConfig::default())
  }
}
