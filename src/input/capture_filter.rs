/// FFmpeg帧过滤器: 解码帧(RGB24) → RgbImage → 采集队列
/// FFmpeg frame filter feeding the capture queue
use crossbeam_channel::{Sender, TrySendError};
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// 最大支持分辨率
const MAX_DIMENSION: i32 = 8192;

#[derive(Clone)]
pub struct CaptureFilter {
    tx: Sender<RgbImage>,
    released: Arc<AtomicBool>,
    live: bool,                // 实时源: 队列满时丢帧, 文件: 阻塞等待
    pub total_frames: usize,   // 总帧数
    pub dropped_frames: usize, // 丢弃的帧数
}

impl CaptureFilter {
    pub fn new(tx: Sender<RgbImage>, released: Arc<AtomicBool>, live: bool) -> Self {
        Self {
            tx,
            released,
            live,
            total_frames: 0,
            dropped_frames: 0,
        }
    }
}

impl FrameFilter for CaptureFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("✅ 采集管线启动 (live: {})", self.live);
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        // 句柄已释放, 终止管线
        if self.released.load(Ordering::Relaxed) {
            return Err("capture released".to_string());
        }

        self.total_frames += 1;
        let image = match unsafe { copy_rgb24(&frame) } {
            Some(image) => image,
            None => {
                self.dropped_frames += 1;
                if self.total_frames <= 10 {
                    warn!("⚠️ 丢弃帧 #{}: 空帧/损坏帧", self.total_frames);
                }
                return Ok(None);
            }
        };

        if self.live {
            match self.tx.try_send(image) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => self.dropped_frames += 1,
                Err(TrySendError::Disconnected(_)) => {
                    return Err("capture receiver dropped".to_string())
                }
            }
        } else if self.tx.send(image).is_err() {
            return Err("capture receiver dropped".to_string());
        }

        Ok(Some(frame))
    }
}

/// 拷贝 RGB24 平面 (按行去掉 linesize 填充)
///
/// # Safety
/// `frame` 必须是 FFmpeg 输出的有效视频帧
unsafe fn copy_rgb24(frame: &Frame) -> Option<RgbImage> {
    if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
        return None;
    }

    let raw = &*frame.as_ptr();
    if raw.width <= 0 || raw.height <= 0 || raw.width > MAX_DIMENSION || raw.height > MAX_DIMENSION
    {
        return None;
    }

    let (w, h) = (raw.width as usize, raw.height as usize);
    let plane = raw.data[0];
    let stride = raw.linesize[0];
    if plane.is_null() || stride < (w * 3) as i32 {
        return None;
    }

    let row_bytes = w * 3;
    let mut buffer = Vec::with_capacity(row_bytes * h);
    for row in 0..h {
        let src = std::slice::from_raw_parts(plane.add(row * stride as usize), row_bytes);
        buffer.extend_from_slice(src);
    }
    RgbImage::from_raw(w as u32, h as u32, buffer)
}
