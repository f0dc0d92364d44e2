//! 视频文件选择器
//!
//! 扩展名过滤只是提示: "所有文件" 下任何文件都可以选择

use egui_macroquad::egui;
use std::io;
use std::path::{Path, PathBuf};

/// 视频文件扩展名
pub const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "avi"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFilter {
    All,
    Video,
}

impl FileFilter {
    pub const ALL: [FileFilter; 2] = [FileFilter::All, FileFilter::Video];

    pub fn label(&self) -> &'static str {
        match self {
            FileFilter::All => "所有文件 (*)",
            FileFilter::Video => "视频文件 (*.mp4 *.avi)",
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::Video => path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    VIDEO_EXTENSIONS
                        .iter()
                        .any(|video| ext.eq_ignore_ascii_case(video))
                })
                .unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// 列出目录: 子目录在前, 其后是匹配过滤器的文件, 均按名称排序, 跳过隐藏项
pub fn list_entries(dir: &Path, filter: FileFilter) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for item in std::fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = item.path();
        let is_dir = path.is_dir();
        if is_dir || filter.matches(&path) {
            entries.push(Entry { path, name, is_dir });
        }
    }
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

pub struct FilePicker {
    open: bool,
    dir: PathBuf,
    filter: FileFilter,
    entries: Vec<Entry>,
    selected: Option<PathBuf>,
    error: Option<String>,
}

impl FilePicker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            open: false,
            dir: dir.into(),
            filter: FileFilter::All,
            entries: Vec::new(),
            selected: None,
            error: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn open(&mut self) {
        self.open = true;
        self.selected = None;
        self.refresh();
    }

    pub fn set_filter(&mut self, filter: FileFilter) {
        self.filter = filter;
        self.refresh();
    }

    pub fn enter(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
        self.selected = None;
        self.refresh();
    }

    pub fn up(&mut self) {
        let parent = std::fs::canonicalize(&self.dir)
            .ok()
            .and_then(|dir| dir.parent().map(Path::to_path_buf));
        if let Some(parent) = parent {
            self.enter(parent);
        }
    }

    pub fn refresh(&mut self) {
        match list_entries(&self.dir, self.filter) {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(e) => {
                self.entries.clear();
                self.error = Some(format!("无法读取目录: {}", e));
            }
        }
    }

    /// 绘制选择窗口, 选定文件时返回路径; 取消或关闭返回 None
    pub fn show(&mut self, ctx: &egui::Context) -> Option<PathBuf> {
        if !self.open {
            return None;
        }

        let mut window_open = true;
        let mut chosen = None;
        let mut cancel = false;
        let mut go_up = false;
        let mut navigate: Option<PathBuf> = None;
        let mut filter = self.filter;

        let Self {
            dir,
            entries,
            selected,
            error,
            ..
        } = self;

        egui::Window::new("选择视频文件")
            .open(&mut window_open)
            .default_size(egui::vec2(480.0, 360.0))
            .collapsible(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("⬆ 上一级").clicked() {
                        go_up = true;
                    }
                    ui.label(dir.display().to_string());
                });
                ui.horizontal(|ui| {
                    ui.label("文件类型:");
                    egui::ComboBox::from_id_salt("file_filter")
                        .selected_text(filter.label())
                        .show_ui(ui, |ui| {
                            for option in FileFilter::ALL {
                                ui.selectable_value(&mut filter, option, option.label());
                            }
                        });
                });
                ui.separator();

                egui::ScrollArea::vertical()
                    .max_height(240.0)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        for entry in entries.iter() {
                            let text = if entry.is_dir {
                                format!("📁 {}", entry.name)
                            } else {
                                format!("🎞 {}", entry.name)
                            };
                            let is_selected = selected.as_ref() == Some(&entry.path);
                            let response = ui.selectable_label(is_selected, text);
                            if response.double_clicked() && !entry.is_dir {
                                chosen = Some(entry.path.clone());
                            } else if response.clicked() {
                                if entry.is_dir {
                                    navigate = Some(entry.path.clone());
                                } else {
                                    *selected = Some(entry.path.clone());
                                }
                            }
                        }
                    });

                if let Some(error) = error.as_ref() {
                    ui.colored_label(egui::Color32::RED, error.as_str());
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(selected.is_some(), egui::Button::new("打开"))
                        .clicked()
                    {
                        chosen = selected.clone();
                    }
                    if ui.button("取消").clicked() {
                        cancel = true;
                    }
                });
            });

        if filter != self.filter {
            self.set_filter(filter);
        }
        if go_up {
            self.up();
        } else if let Some(dir) = navigate {
            self.enter(dir);
        }
        if chosen.is_some() || cancel || !window_open {
            self.open = false;
        }
        chosen
    }
}
