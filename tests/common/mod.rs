#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Result};
use image::{Rgb, RgbImage};

use helmet_sentinel::controller::{Controller, ControllerConfig, DisplaySurface};
use helmet_sentinel::detection::{BoundingBox, Detection, Detector, Model};
use helmet_sentinel::input::{CaptureError, Frame, FrameSource, SourceOpener};
use helmet_sentinel::{Annotator, LogPanel};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;
pub const BACKGROUND: Rgb<u8> = Rgb([60, 60, 60]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// 第 n 帧: 灰底, 左上角像素的红色通道记录帧号
pub fn numbered_frame(n: u8) -> Frame {
    let mut frame = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    frame.put_pixel(0, 0, Rgb([n, 0, 0]));
    frame
}

pub fn frame_number(frame: &Frame) -> u8 {
    frame.get_pixel(0, 0)[0]
}

/// 按脚本依次返回帧, 用完后报告流结束
pub struct ScriptedSource {
    frames: VecDeque<Result<Frame, CaptureError>>,
    releases: Rc<Cell<u32>>,
    label: String,
}

impl FrameSource for ScriptedSource {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        self.frames.pop_front().unwrap_or(Err(CaptureError::EndOfStream))
    }

    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// 测试用的输入源工厂
#[derive(Clone, Default)]
pub struct ScriptedOpener {
    pub camera_available: bool,
    pub files: Rc<RefCell<HashMap<PathBuf, Vec<Frame>>>>,
    pub camera_frames: Rc<RefCell<Vec<Result<Frame, CaptureError>>>>,
    pub releases: Rc<Cell<u32>>,
    pub opened: Rc<Cell<u32>>,
}

impl ScriptedOpener {
    pub fn with_file(path: &str, frames: Vec<Frame>) -> Self {
        let opener = Self::default();
        opener.files.borrow_mut().insert(PathBuf::from(path), frames);
        opener
    }

    pub fn with_camera(frames: Vec<Result<Frame, CaptureError>>) -> Self {
        let opener = Self {
            camera_available: true,
            ..Self::default()
        };
        *opener.camera_frames.borrow_mut() = frames;
        opener
    }

    fn source(&self, label: String, frames: Vec<Result<Frame, CaptureError>>) -> Box<dyn FrameSource> {
        self.opened.set(self.opened.get() + 1);
        Box::new(ScriptedSource {
            frames: frames.into(),
            releases: self.releases.clone(),
            label,
        })
    }
}

impl SourceOpener for ScriptedOpener {
    fn open_camera(&mut self, index: usize) -> Result<Box<dyn FrameSource>, CaptureError> {
        if !self.camera_available {
            return Err(CaptureError::Open {
                target: format!("摄像头 #{}", index),
                reason: "设备不存在".to_string(),
            });
        }
        let frames = std::mem::take(&mut *self.camera_frames.borrow_mut());
        Ok(self.source(format!("摄像头 #{}", index), frames))
    }

    fn open_file(&mut self, path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
        let frames = self.files.borrow().get(path).cloned();
        match frames {
            Some(frames) => Ok(self.source(
                path.display().to_string(),
                frames.into_iter().map(Ok).collect(),
            )),
            None => Err(CaptureError::Open {
                target: path.display().to_string(),
                reason: "文件不存在".to_string(),
            }),
        }
    }
}

/// 按帧号返回预设检测结果 (含非关注类别, 由 Detector 过滤)
#[derive(Default)]
pub struct ScriptedModel {
    pub by_frame: HashMap<u8, Vec<Detection>>,
    pub fail_on: Option<u8>,
    pub calls: Rc<Cell<u32>>,
}

impl Model for ScriptedModel {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        self.calls.set(self.calls.get() + 1);
        let n = frame_number(frame);
        if self.fail_on == Some(n) {
            bail!("模型推理出错 (第 {} 帧)", n);
        }
        Ok(self.by_frame.get(&n).cloned().unwrap_or_default())
    }
}

pub fn hardhat(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
    Detection::new(BoundingBox::new(x1, y1, x2, y2), 0, "Hardhat", 0.91)
}

pub fn person(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
    Detection::new(BoundingBox::new(x1, y1, x2, y2), 5, "Person", 0.88)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shown {
    Raw(Frame),
    Annotated(Frame),
    Clear,
}

/// 记录所有显示调用
#[derive(Default)]
pub struct RecordingDisplay {
    pub events: Vec<Shown>,
}

impl RecordingDisplay {
    pub fn raw(&self) -> Vec<&Frame> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Shown::Raw(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn annotated(&self) -> Vec<&Frame> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Shown::Annotated(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn clears(&self) -> usize {
        self.events.iter().filter(|e| **e == Shown::Clear).count()
    }
}

impl DisplaySurface for RecordingDisplay {
    fn show_raw(&mut self, frame: &Frame) {
        self.events.push(Shown::Raw(frame.clone()));
    }

    fn show_annotated(&mut self, frame: &Frame) {
        self.events.push(Shown::Annotated(frame.clone()));
    }

    fn clear(&mut self) {
        self.events.push(Shown::Clear);
    }
}

pub fn config(max_failures: u32) -> ControllerConfig {
    ControllerConfig {
        camera_index: 0,
        frame_size: (WIDTH, HEIGHT),
        tick_interval: Duration::from_millis(30),
        max_consecutive_read_failures: max_failures,
    }
}

pub fn controller(
    opener: ScriptedOpener,
    model: ScriptedModel,
    max_failures: u32,
) -> Controller<RecordingDisplay> {
    Controller::new(
        Box::new(opener),
        Box::new(Detector::new(model)),
        Annotator::new([0, 0, 255], 2),
        RecordingDisplay::default(),
        LogPanel::new(500),
        config(max_failures),
    )
}

/// 日志内容 (去掉时间戳), 从旧到新
pub fn messages(log: &LogPanel) -> Vec<String> {
    let mut lines: Vec<String> = log
        .lines()
        .map(|line| match line.split_once("] ") {
            Some((_, message)) => message.to_string(),
            None => line.to_string(),
        })
        .collect();
    lines.reverse();
    lines
}
