//! 输入源接口 - 摄像头 / 视频文件统一为逐帧读取

use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 一帧图像 (RGB)
pub type Frame = RgbImage;

/// 输入源描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    Camera(usize),
    File(PathBuf),
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Camera(index) => write!(f, "摄像头 #{}", index),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 采集错误
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("无法打开 {target}: {reason}")]
    Open { target: String, reason: String },

    #[error("视频流已结束")]
    EndOfStream,

    #[error("读取帧超时")]
    Timeout,

    #[error("读取帧失败: {0}")]
    Read(String),
}

/// 已打开的采集句柄
pub trait FrameSource {
    /// 读取下一帧 (阻塞直到有帧、超时或流结束)
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// 释放句柄 (可重复调用)
    fn release(&mut self);

    fn describe(&self) -> String;
}

/// 打开采集句柄
pub trait SourceOpener {
    fn open_camera(&mut self, index: usize) -> Result<Box<dyn FrameSource>, CaptureError>;

    fn open_file(&mut self, path: &Path) -> Result<Box<dyn FrameSource>, CaptureError>;

    fn open(&mut self, source: &InputSource) -> Result<Box<dyn FrameSource>, CaptureError> {
        match source {
            InputSource::Camera(index) => self.open_camera(*index),
            InputSource::File(path) => self.open_file(path),
        }
    }
}
