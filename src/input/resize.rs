//! 统一帧尺寸 (fast_image_resize)

use anyhow::Result;
use fast_image_resize as fr;
use image::RgbImage;

use super::source::Frame;

/// 把任意分辨率的帧缩放到固定尺寸
pub struct FrameResizer {
    width: u32,
    height: u32,
    resizer: fr::Resizer,
}

impl FrameResizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            resizer: fr::Resizer::new(),
        }
    }

    /// 尺寸已一致时直接返回原帧
    pub fn resize(&mut self, frame: Frame) -> Result<Frame> {
        if frame.dimensions() == (self.width, self.height) {
            return Ok(frame);
        }

        let (w, h) = frame.dimensions();
        if w == 0 || h == 0 {
            anyhow::bail!("空帧 ({}x{})", w, h);
        }
        let src_image = fr::images::Image::from_vec_u8(w, h, frame.into_raw(), fr::PixelType::U8x3)?;
        let mut dst_image = fr::images::Image::new(self.width, self.height, fr::PixelType::U8x3);

        // 双线性插值, 与常见视频播放器画质接近
        self.resizer.resize(
            &src_image,
            &mut dst_image,
            &fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
        )?;

        RgbImage::from_raw(self.width, self.height, dst_image.into_vec())
            .ok_or_else(|| anyhow::anyhow!("RGB图像转换失败"))
    }
}
