use egui_macroquad::egui;
use std::path::Path;
use tracing::{info, warn};

use crate::log_panel::LogPanel;

/// 控制面板高度 (像素)
pub const PANEL_HEIGHT: f32 = 260.0;

const BUTTON_GREEN: egui::Color32 = egui::Color32::from_rgb(0x4C, 0xAF, 0x50);
const BUTTON_SIZE: egui::Vec2 = egui::vec2(120.0, 40.0);

/// 面板按钮触发的动作
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelAction {
    OpenVideo,
    StartCamera,
    Stop,
}

/// 底部控制面板: 日志 + 三个按钮
#[derive(Default)]
pub struct ControlPanel {
    last_revision: u64,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, ctx: &egui::Context, log: &LogPanel, running: bool) -> Option<PanelAction> {
        let mut action = None;

        egui::TopBottomPanel::bottom("控制面板")
            .exact_height(PANEL_HEIGHT)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("日志");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if running {
                            ui.colored_label(egui::Color32::GREEN, "● 运行中");
                        } else {
                            ui.colored_label(egui::Color32::GRAY, "○ 已停止");
                        }
                    });
                });

                let mut scroll = egui::ScrollArea::vertical()
                    .max_height(PANEL_HEIGHT - 100.0)
                    .auto_shrink([false, false]);
                // 有新日志时回到顶部 (最新一行在最前)
                if log.revision() != self.last_revision {
                    scroll = scroll.vertical_scroll_offset(0.0);
                    self.last_revision = log.revision();
                }
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    scroll.show(ui, |ui| {
                        for line in log.lines() {
                            ui.monospace(line);
                        }
                    });
                });

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if green_button(ui, "视频文件").clicked() {
                        action = Some(PanelAction::OpenVideo);
                    }
                    if green_button(ui, "摄像头").clicked() {
                        action = Some(PanelAction::StartCamera);
                    }
                    if green_button(ui, "🛑停止").clicked() {
                        action = Some(PanelAction::Stop);
                    }
                });
            });

        action
    }
}

fn green_button(ui: &mut egui::Ui, text: &str) -> egui::Response {
    let label = egui::RichText::new(text).color(egui::Color32::WHITE).size(16.0);
    ui.add_sized(BUTTON_SIZE, egui::Button::new(label).fill(BUTTON_GREEN))
}

/// 加载中文字体 (egui 默认字体不含中文)
pub fn install_cjk_font(path: &Path) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("⚠️ 未找到中文字体文件: {} ({})", path.display(), e);
            return;
        }
    };

    egui_macroquad::cfg(|egui_ctx| {
        let mut fonts = egui::FontDefinitions::default();
        fonts
            .font_data
            .insert("cjk".to_owned(), egui::FontData::from_owned(bytes.clone()).into());
        for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
            fonts
                .families
                .entry(family)
                .or_default()
                .push("cjk".to_owned());
        }
        egui_ctx.set_fonts(fonts);
    });
    info!("✅ 中文字体加载成功: {}", path.display());
}
