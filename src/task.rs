// 该文件是 Pitchscope （球场视界） 项目的一部分。
// src/task.rs - 逐帧处理任务
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{output::Render, pipeline::Process};

const PROGRESS_INTERVAL: u64 = 30;

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: P, output: O) -> Result<TaskSummary, Self::Error>;
}

/// 任务结束时的统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskSummary {
  pub frames: u64,
  pub elapsed: Duration,
}

impl TaskSummary {
  pub fn fps(&self) -> f64 {
    let secs = self.elapsed.as_secs_f64();
    if secs > 0.0 {
      self.frames as f64 / secs
    } else {
      0.0
    }
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<u64>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<u64>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<F, D, PE, RE, I, P, O> Task<I, P, O> for ContinuousTask
where
  PE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  P: Process<F, Output = D, Error = PE>,
  O: Render<F, D, Error = RE>,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, mut pipeline: P, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    let handler = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    });
    if let Err(e) = handler {
      warn!("无法注册 Ctrl-C 处理函数: {}", e);
    }

    let started = Instant::now();
    let mut frame_index = 0u64;
    for frame in input {
      frame_index += 1;
      let now = Instant::now();
      let result = pipeline.process(frame_index, &frame)?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      info!(
        "第 {} 帧处理完成，耗时: {:.2?} / {:.2?}",
        frame_index, elapsed_a, elapsed_b
      );

      if frame_index % PROGRESS_INTERVAL == 0 {
        let summary = TaskSummary {
          frames: frame_index,
          elapsed: started.elapsed(),
        };
        info!("已处理 {} 帧，平均 FPS: {:.2}", frame_index, summary.fps());
      }
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    let summary = TaskSummary {
      frames: frame_index,
      elapsed: started.elapsed(),
    };
    info!(
      "任务完成: 共 {} 帧, 耗时 {:.2?}, 平均 FPS: {:.2}",
      summary.frames,
      summary.elapsed,
      summary.fps()
    );
    Ok(summary)
  }
}
