//! 双画面显示 (macroquad 纹理)

use macroquad::prelude::*;

use crate::controller::DisplaySurface;
use crate::input::Frame;

/// 面板间距
const MARGIN: f32 = 10.0;

/// 原始画面 + 处理后画面
#[derive(Default)]
pub struct MacroquadDisplay {
    raw: Option<Texture2D>,
    annotated: Option<Texture2D>,
}

impl MacroquadDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在给定高度内并排绘制两个面板 (保持 4:3)
    pub fn draw(&self, area_height: f32) {
        let panel_w = ((screen_width() - MARGIN * 3.0) / 2.0).max(1.0);
        let panel_h = (panel_w * 3.0 / 4.0).min((area_height - MARGIN * 2.0).max(1.0));
        let panel_w = panel_h * 4.0 / 3.0;

        let left = (screen_width() - panel_w * 2.0 - MARGIN) / 2.0;
        draw_panel(self.raw.as_ref(), left, MARGIN, panel_w, panel_h);
        draw_panel(
            self.annotated.as_ref(),
            left + panel_w + MARGIN,
            MARGIN,
            panel_w,
            panel_h,
        );
    }
}

impl DisplaySurface for MacroquadDisplay {
    fn show_raw(&mut self, frame: &Frame) {
        upload(&mut self.raw, frame);
    }

    fn show_annotated(&mut self, frame: &Frame) {
        upload(&mut self.annotated, frame);
    }

    fn clear(&mut self) {
        self.raw = None;
        self.annotated = None;
    }
}

fn draw_panel(texture: Option<&Texture2D>, x: f32, y: f32, w: f32, h: f32) {
    match texture {
        Some(texture) => draw_texture_ex(
            texture,
            x,
            y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(w, h)),
                ..Default::default()
            },
        ),
        None => {
            draw_rectangle(x, y, w, h, Color::from_rgba(24, 24, 24, 255));
            draw_rectangle_lines(x, y, w, h, 1.0, DARKGRAY);
        }
    }
}

/// 只在分辨率变化时重建纹理, 否则更新像素数据
fn upload(slot: &mut Option<Texture2D>, frame: &Frame) {
    let (w, h) = frame.dimensions();
    let rgba = rgb_to_rgba(frame);

    let needs_rebuild = match slot {
        Some(tex) => tex.width() != w as f32 || tex.height() != h as f32,
        None => true,
    };

    if needs_rebuild {
        let texture = Texture2D::from_rgba8(w as u16, h as u16, &rgba);
        texture.set_filter(FilterMode::Linear);
        *slot = Some(texture);
    } else if let Some(tex) = slot {
        tex.update(&Image {
            bytes: rgba,
            width: w as u16,
            height: h as u16,
        });
    }
}

fn rgb_to_rgba(frame: &Frame) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(frame.as_raw().len() / 3 * 4);
    for chunk in frame.as_raw().chunks_exact(3) {
        rgba.extend_from_slice(chunk);
        rgba.push(255);
    }
    rgba
}
