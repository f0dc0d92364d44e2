//! 主窗口: 上方两个画面, 下方控制面板
pub mod control_panel;
pub mod display;
pub mod file_picker;

pub use control_panel::{install_cjk_font, ControlPanel, PanelAction, PANEL_HEIGHT};
pub use display::MacroquadDisplay;
pub use file_picker::{FileFilter, FilePicker};

use macroquad::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::controller::Controller;

pub struct Viewer {
    controller: Controller<MacroquadDisplay>,
    panel: ControlPanel,
    picker: FilePicker,
}

impl Viewer {
    pub fn new(controller: Controller<MacroquadDisplay>, video_dir: impl Into<PathBuf>) -> Self {
        Self {
            controller,
            panel: ControlPanel::new(),
            picker: FilePicker::new(video_dir),
        }
    }

    pub fn controller_mut(&mut self) -> &mut Controller<MacroquadDisplay> {
        &mut self.controller
    }

    /// 驱动定时器
    pub fn update(&mut self) {
        self.controller.poll(Instant::now());
    }

    pub fn draw(&self) {
        clear_background(Color::from_rgba(40, 40, 40, 255));
        self.controller
            .display()
            .draw(screen_height() - PANEL_HEIGHT);
    }

    pub fn draw_egui(&mut self) {
        let mut action = None;
        let mut chosen = None;

        egui_macroquad::ui(|egui_ctx| {
            action = self
                .panel
                .show(egui_ctx, self.controller.log(), self.controller.is_running());
            chosen = self.picker.show(egui_ctx);
        });

        match action {
            Some(PanelAction::OpenVideo) => self.picker.open(),
            Some(PanelAction::StartCamera) => {
                self.controller.start_camera();
            }
            Some(PanelAction::Stop) => self.controller.stop(),
            None => {}
        }
        // 取消选择时什么都不做
        if let Some(path) = chosen {
            self.controller.start_file(path);
        }

        egui_macroquad::draw();
    }
}
