//! FFmpeg 采集句柄 - 摄像头 (DirectShow/AVFoundation/V4L2) 与视频文件
//!
//! 解码管线运行在句柄自带的工作线程中, 通过两帧的有界队列交给控制器逐帧读取

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::capture_filter::CaptureFilter;
use super::source::{CaptureError, Frame, FrameSource, SourceOpener};
use crate::config::AppConfig;

/// 解码线程 → 控制器 的队列长度
const FRAME_QUEUE: usize = 2;

/// FFmpeg 输入描述
#[derive(Clone, Debug)]
struct InputSpec {
    url: String,
    format: Option<&'static str>,
    live: bool,
    label: String,
}

impl InputSpec {
    fn camera(index: usize, name: &str) -> Self {
        Self {
            url: format_camera_url(index, name),
            format: Some(camera_format()),
            live: true,
            label: format!("摄像头 #{}", index),
        }
    }

    fn file(path: &Path) -> Self {
        Self {
            url: path.to_string_lossy().into_owned(),
            format: None,
            live: false,
            label: path.display().to_string(),
        }
    }
}

/// 摄像头输入格式 - 根据平台选择
fn camera_format() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dshow" // DirectShow
    }
    #[cfg(target_os = "macos")]
    {
        "avfoundation" // AVFoundation
    }
    #[cfg(target_os = "linux")]
    {
        "v4l2" // Video4Linux2
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        "video4linux2"
    }
}

/// 格式化摄像头URL - 根据平台选择
fn format_camera_url(index: usize, name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        let _ = index;
        format!("video={}", name)
    }
    #[cfg(target_os = "linux")]
    {
        let _ = name;
        format!("/dev/video{}", index)
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        let _ = name;
        format!("{}", index)
    }
}

/// 获取可用的摄像头设备列表
pub fn get_camera_devices() -> Vec<(usize, String)> {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => devices.into_iter().enumerate().collect(),
        Err(e) => {
            warn!("⚠️ 获取摄像头列表失败: {}", e);
            vec![]
        }
    }
}

/// FFmpeg 采集句柄
pub struct FfmpegSource {
    label: String,
    frames: Option<Receiver<Frame>>,
    released: Arc<AtomicBool>,
    read_timeout: Duration,
    _worker: JoinHandle<()>,
}

impl FfmpegSource {
    fn open(spec: InputSpec, open_timeout: Duration, read_timeout: Duration) -> Result<Self, CaptureError> {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let released = Arc::new(AtomicBool::new(false));
        let filter = CaptureFilter::new(frame_tx, released.clone(), spec.live);

        let label = spec.label.clone();
        let worker = std::thread::Builder::new()
            .name("ffmpeg-capture".to_string())
            .spawn(move || run_pipeline(spec, filter, ready_tx))
            .map_err(|e| CaptureError::Open {
                target: label.clone(),
                reason: e.to_string(),
            })?;

        match ready_rx.recv_timeout(open_timeout) {
            Ok(Ok(())) => {
                info!("✅ 已打开 {}", label);
                Ok(Self {
                    label,
                    frames: Some(frame_rx),
                    released,
                    read_timeout,
                    _worker: worker,
                })
            }
            Ok(Err(reason)) => Err(CaptureError::Open { target: label, reason }),
            Err(_) => {
                released.store(true, Ordering::Relaxed);
                Err(CaptureError::Open {
                    target: label,
                    reason: format!("{}ms 内未能打开", open_timeout.as_millis()),
                })
            }
        }
    }
}

impl FrameSource for FfmpegSource {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let Some(frames) = &self.frames else {
            return Err(CaptureError::Read("句柄已释放".to_string()));
        };
        match frames.recv_timeout(self.read_timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::EndOfStream),
        }
    }

    fn release(&mut self) {
        // 丢弃接收端, 阻塞在发送上的解码线程随之退出
        if self.frames.take().is_some() {
            self.released.store(true, Ordering::Relaxed);
            info!("🛑 已释放 {}", self.label);
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// 在工作线程中构建并运行解码管线
fn run_pipeline(spec: InputSpec, filter: CaptureFilter, ready_tx: Sender<Result<(), String>>) {
    debug!("🔍 打开输入: {} (格式: {:?})", spec.url, spec.format);

    // 构建帧处理管线
    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("capture", Box::new(filter));
    let out = create_null_output().add_frame_pipeline(pipe);

    let mut input = Input::new(spec.url.as_str());
    if let Some(format) = spec.format {
        input = input.set_format(format);
    }

    // 统一转成 RGB24, 缩放在控制器中完成
    let ctx = match FfmpegContext::builder()
        .input(input)
        .filter_descs(["format=rgb24"].into())
        .output(out)
        .build()
    {
        Ok(ctx) => ctx,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };

    let sch = match ctx.start() {
        Ok(sch) => sch,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    // 等待解码完成 (文件结束或句柄释放)
    let _ = sch.wait();
    debug!("📹 {} 解码循环结束", spec.label);
}

/// 基于 FFmpeg 的输入源工厂
#[derive(Clone, Debug)]
pub struct FfmpegOpener {
    open_timeout: Duration,
    read_timeout: Duration,
}

impl FfmpegOpener {
    pub fn new(open_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            open_timeout,
            read_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_millis(config.open_timeout_ms),
            Duration::from_millis(config.read_timeout_ms),
        )
    }
}

impl SourceOpener for FfmpegOpener {
    fn open_camera(&mut self, index: usize) -> Result<Box<dyn FrameSource>, CaptureError> {
        // dshow 需要设备名称
        let name = if cfg!(target_os = "windows") {
            get_camera_devices()
                .into_iter()
                .find(|(i, _)| *i == index)
                .map(|(_, name)| name)
                .ok_or_else(|| CaptureError::Open {
                    target: format!("摄像头 #{}", index),
                    reason: "未找到设备".to_string(),
                })?
        } else {
            index.to_string()
        };

        let spec = InputSpec::camera(index, &name);
        let source = FfmpegSource::open(spec, self.open_timeout, self.read_timeout)?;
        Ok(Box::new(source))
    }

    fn open_file(&mut self, path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
        if !path.is_file() {
            return Err(CaptureError::Open {
                target: path.display().to_string(),
                reason: "文件不存在".to_string(),
            });
        }
        let source = FfmpegSource::open(InputSpec::file(path), self.open_timeout, self.read_timeout)?;
        Ok(Box::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_fails_without_spawning() {
        let mut opener = FfmpegOpener::new(Duration::from_millis(100), Duration::from_millis(100));
        let err = opener
            .open_file(Path::new("/definitely/not/here.mp4"))
            .err()
            .expect("open should fail");
        assert!(matches!(err, CaptureError::Open { .. }));
    }

    #[test]
    fn file_spec_blocks_instead_of_dropping() {
        let spec = InputSpec::file(Path::new("clips/site.mp4"));
        assert!(!spec.live);
        assert!(spec.format.is_none());
        assert_eq!(spec.url, "clips/site.mp4");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_camera_uses_v4l2_device_node() {
        let spec = InputSpec::camera(0, "0");
        assert_eq!(spec.url, "/dev/video0");
        assert_eq!(spec.format, Some("v4l2"));
        assert!(spec.live);
    }
}
