// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod calibration;
pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod task;
pub mod team;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 取出 URL 中的文件路径并做百分号解码
///
/// `scheme:///abs/path` 与 `scheme:rel/path` 直接使用路径部分；
/// `scheme://rel/path` 会被解析为主机 + 路径，这里把两者拼回相对路径。
pub fn url_path(url: &url::Url) -> String {
  let path = match url.host_str() {
    Some(host) if !host.is_empty() => format!("{}{}", host, url.path()),
    _ => url.path().to_string(),
  };
  urlencoding::decode(&path)
    .map(|p| p.into_owned())
    .unwrap_or(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_path_handles_absolute_and_relative_forms() {
    let abs = url::Url::parse("jsonl:///tmp/out%20dir/a.jsonl").unwrap();
    assert_eq!(url_path(&abs), "/tmp/out dir/a.jsonl");

    let rel = url::Url::parse("folder://frames/match").unwrap();
    assert_eq!(url_path(&rel), "frames/match");

    let opaque = url::Url::parse("image:clip.png").unwrap();
    assert_eq!(url_path(&opaque), "clip.png");
  }
}
