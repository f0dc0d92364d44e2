/// 视频输入系统 (Video Input System)
///
/// - FrameSource:  已打开的采集句柄, 逐帧读取
/// - SourceOpener: 打开摄像头 / 视频文件
/// - FfmpegOpener: 基于 FFmpeg 的实现
/// - FrameResizer: 统一帧尺寸
pub mod capture_filter;
pub mod ffmpeg;
pub mod resize;
pub mod source;

pub use capture_filter::CaptureFilter;
pub use ffmpeg::{get_camera_devices, FfmpegOpener, FfmpegSource};
pub use resize::FrameResizer;
pub use source::{CaptureError, Frame, FrameSource, InputSource, SourceOpener};
