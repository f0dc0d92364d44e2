//! 检测框绘制

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::config::AppConfig;
use crate::detection::Detection;

/// 在帧副本上绘制固定颜色、固定线宽的矩形
#[derive(Clone, Debug)]
pub struct Annotator {
    color: Rgb<u8>,
    thickness: u32,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new([0, 0, 255], 2)
    }
}

impl Annotator {
    pub fn new(color: [u8; 3], thickness: u32) -> Self {
        Self {
            color: Rgb(color),
            thickness: thickness.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.box_color, config.box_thickness)
    }

    /// 返回绘制后的副本, 原帧不变
    pub fn apply(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = frame.clone();
        for det in detections {
            self.draw_box(&mut canvas, det);
        }
        canvas
    }

    fn draw_box(&self, canvas: &mut RgbImage, det: &Detection) {
        let (w, h) = canvas.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let max_x = w as i32 - 1;
        let max_y = h as i32 - 1;
        let x1 = det.bbox.x1.clamp(0, max_x);
        let y1 = det.bbox.y1.clamp(0, max_y);
        let x2 = det.bbox.x2.clamp(0, max_x);
        let y2 = det.bbox.y2.clamp(0, max_y);

        // 线宽向框内收缩
        for i in 0..self.thickness as i32 {
            let (l, t, r, b) = (x1 + i, y1 + i, x2 - i, y2 - i);
            if r < l || b < t {
                break;
            }
            let rect = Rect::at(l, t).of_size((r - l + 1) as u32, (b - t + 1) as u32);
            draw_hollow_rect_mut(canvas, rect, self.color);
        }
    }
}
