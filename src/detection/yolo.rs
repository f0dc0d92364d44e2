// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 ONNX 检测模型
// 包含: 模型加载、预处理、推理、后处理

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{s, Array, Array4, ArrayView2, Axis, Ix2};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use regex::Regex;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::model::Model;
use super::types::{class_name, BoundingBox, Detection, CLASS_NAMES};
use crate::config::AppConfig;

/// 前4维为 cx, cy, w, h
const CXYWH_OFFSET: usize = 4;

/// letterbox 填充灰度
const PAD_VALUE: f32 = 144.0 / 255.0;

/// YOLOv8 模型参数
#[derive(Clone, Debug)]
pub struct YoloConfig {
    pub model_path: String,
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub cuda: bool,
    pub intra_threads: usize,
}

impl From<&AppConfig> for YoloConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            input_size: config.input_size,
            conf_threshold: config.conf_threshold,
            iou_threshold: config.iou_threshold,
            cuda: config.cuda,
            intra_threads: config.intra_threads,
        }
    }
}

/// ONNX Runtime 推理的 YOLOv8 检测模型
pub struct YoloModel {
    session: Session,
    input_name: String,
    output_name: String,
    input_size: u32,
    conf: f32,
    iou: f32,
    names: Vec<String>,
}

impl YoloModel {
    /// 从配置创建模型
    pub fn new(config: YoloConfig) -> Result<Self> {
        let mut builder =
            Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
        if config.intra_threads > 0 {
            builder = builder.with_intra_threads(config.intra_threads)?;
        }

        if config.cuda {
            #[cfg(feature = "cuda")]
            {
                use ort::execution_providers::CUDAExecutionProvider;
                builder = builder
                    .with_execution_providers([CUDAExecutionProvider::default().build()])?;
                info!("⚡ 推理后端: CUDA");
            }
            #[cfg(not(feature = "cuda"))]
            warn!("⚠️ 未启用 cuda 特性, 使用CPU推理");
        }

        let session = builder
            .commit_from_file(&config.model_path)
            .with_context(|| format!("模型加载失败: {}", config.model_path))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("模型没有输入节点")?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .context("模型没有输出节点")?;

        // ultralytics 导出时会把类别名写入 metadata
        let names = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .map(|raw| parse_names(&raw))
            .filter(|names| !names.is_empty())
            .unwrap_or_else(|| CLASS_NAMES.iter().map(|s| s.to_string()).collect());

        let model = Self {
            session,
            input_name,
            output_name,
            input_size: config.input_size,
            conf: config.conf_threshold,
            iou: config.iou_threshold,
            names,
        };
        model.summary();
        Ok(model)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 预处理: letterbox → NCHW 张量, 返回缩放比例
    pub fn preprocess(&self, frame: &RgbImage) -> (Array4<f32>, f32) {
        let size = self.input_size as usize;
        let (w0, h0) = frame.dimensions();
        let ratio = letterbox_ratio(w0, h0, self.input_size);
        let w1 = ((w0 as f32 * ratio).round() as u32).clamp(1, self.input_size);
        let h1 = ((h0 as f32 * ratio).round() as u32).clamp(1, self.input_size);
        let resized = imageops::resize(frame, w1, h1, FilterType::Triangle);

        let mut xs = Array::from_elem((1, 3, size, size), PAD_VALUE);
        for (x, y, rgb) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let [r, g, b] = rgb.0;
            xs[[0, 0, y, x]] = r as f32 / 255.0;
            xs[[0, 1, y, x]] = g as f32 / 255.0;
            xs[[0, 2, y, x]] = b as f32 / 255.0;
        }
        (xs, ratio)
    }
}

impl Model for YoloModel {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let t_pre = Instant::now();
        let (xs, ratio) = self.preprocess(frame);
        let preprocess_ms = t_pre.elapsed().as_secs_f64() * 1000.0;

        let t_run = Instant::now();
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => xs.view()]?)?;
        let ys = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        let inference_ms = t_run.elapsed().as_secs_f64() * 1000.0;

        // [1, 4 + nc, anchors] → [4 + nc, anchors]
        let preds = ys.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;
        let detections = decode_predictions(
            preds,
            ratio,
            frame.dimensions(),
            self.conf,
            self.iou,
            &self.names,
        );

        debug!(
            "🎯 推理: {}个目标 | 预处理:{:.1}ms | 推理:{:.1}ms",
            detections.len(),
            preprocess_ms,
            inference_ms
        );
        Ok(detections)
    }

    fn summary(&self) {
        info!(
            "✅ YOLOv8 模型: 输入 {}x{} | 类别 {} | conf {:.2} | iou {:.2}",
            self.input_size,
            self.input_size,
            self.names.len(),
            self.conf,
            self.iou
        );
    }
}

/// letterbox 缩放比例
pub fn letterbox_ratio(w0: u32, h0: u32, input_size: u32) -> f32 {
    (input_size as f32 / w0 as f32).min(input_size as f32 / h0 as f32)
}

/// 解析 metadata 中的类别字典, 形如 `{0: 'Hardhat', 1: 'Mask'}`
pub fn parse_names(raw: &str) -> Vec<String> {
    let re = match Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let mut pairs: Vec<(usize, String)> = re
        .captures_iter(raw)
        .filter_map(|cap| Some((cap[1].parse().ok()?, cap[2].to_string())))
        .collect();
    pairs.sort_by_key(|(id, _)| *id);
    pairs.into_iter().map(|(_, name)| name).collect()
}

/// 候选框 (原图坐标)
#[derive(Clone, Debug)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    id: usize,
    confidence: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.) * (self.y2 - self.y1).max(0.)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let l = self.x1.max(other.x1);
        let r = self.x2.min(other.x2);
        let t = self.y1.max(other.y1);
        let b = self.y2.min(other.y2);
        let inter = (r - l).max(0.) * (b - t).max(0.);
        let union = self.area() + other.area() - inter;
        if union <= 0. {
            0.
        } else {
            inter / union
        }
    }
}

/// 后处理: 原始输出 → 检测结果
///
/// `preds` 形状为 `[4 + nc, anchors]`, 坐标为 letterbox 后的模型输入坐标
pub fn decode_predictions(
    preds: ArrayView2<f32>,
    ratio: f32,
    (width, height): (u32, u32),
    conf_threshold: f32,
    iou_threshold: f32,
    names: &[String],
) -> Vec<Detection> {
    let nc = preds.nrows().saturating_sub(CXYWH_OFFSET);
    if nc == 0 || ratio <= 0. {
        return Vec::new();
    }
    // 角点包含在框内, 最大坐标为 宽-1 / 高-1
    let (max_x, max_y) = (width.saturating_sub(1) as f32, height.saturating_sub(1) as f32);

    let mut candidates = Vec::new();
    for pred in preds.axis_iter(Axis(1)) {
        let clss = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);
        let Some((id, &confidence)) = clss
            .iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };
        if confidence < conf_threshold {
            continue;
        }

        let cx = pred[0] / ratio;
        let cy = pred[1] / ratio;
        let w = pred[2] / ratio;
        let h = pred[3] / ratio;
        candidates.push(Candidate {
            x1: (cx - w / 2.).clamp(0., max_x),
            y1: (cy - h / 2.).clamp(0., max_y),
            x2: (cx + w / 2.).clamp(0., max_x),
            y2: (cy + h / 2.).clamp(0., max_y),
            id,
            confidence,
        });
    }

    non_max_suppression(&mut candidates, iou_threshold);

    candidates
        .into_iter()
        .map(|c| {
            Detection::new(
                BoundingBox::new(
                    c.x1.round() as i32,
                    c.y1.round() as i32,
                    c.x2.round() as i32,
                    c.y2.round() as i32,
                ),
                c.id,
                class_name(names, c.id),
                c.confidence,
            )
        })
        .collect()
}

fn non_max_suppression(xs: &mut Vec<Candidate>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence.total_cmp(&b1.confidence));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            // 只在同类别之间抑制
            if xs[prev_index].id == xs[index].id && xs[prev_index].iou(&xs[index]) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn names() -> Vec<String> {
        CLASS_NAMES.iter().map(|s| s.to_string()).collect()
    }

    /// 构造 [4 + 10, anchors] 输出
    fn preds(anchors: &[([f32; 4], usize, f32)]) -> Array2<f32> {
        let mut ys = Array2::zeros((CXYWH_OFFSET + CLASS_NAMES.len(), anchors.len()));
        for (i, (cxcywh, id, conf)) in anchors.iter().enumerate() {
            for k in 0..4 {
                ys[[k, i]] = cxcywh[k];
            }
            ys[[CXYWH_OFFSET + id, i]] = *conf;
        }
        ys
    }

    #[test]
    fn drops_low_confidence_and_overlaps() {
        let ys = preds(&[
            ([100., 100., 50., 50.], 0, 0.9),
            ([102., 101., 50., 50.], 0, 0.8),
            ([300., 200., 40., 40.], 2, 0.1),
        ]);
        let dets = decode_predictions(ys.view(), 1.0, (640, 480), 0.25, 0.45, &names());
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "Hardhat");
        assert_eq!(dets[0].bbox, BoundingBox::new(75, 75, 125, 125));
    }

    #[test]
    fn overlapping_boxes_of_different_classes_both_survive() {
        // 同一个头上的 Hardhat / NO-Hardhat 不互相抑制
        let ys = preds(&[
            ([100., 100., 50., 50.], 0, 0.9),
            ([102., 100., 50., 50.], 2, 0.8),
        ]);
        let dets = decode_predictions(ys.view(), 1.0, (640, 480), 0.25, 0.45, &names());
        let labels: Vec<_> = dets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["Hardhat", "NO-Hardhat"]);
    }

    #[test]
    fn bottom_right_corner_is_clamped_inside_frame() {
        let ys = preds(&[([630., 470., 40., 40.], 0, 0.9)]);
        let dets = decode_predictions(ys.view(), 1.0, (640, 480), 0.25, 0.45, &names());
        assert_eq!(dets[0].bbox, BoundingBox::new(610, 450, 639, 479));
    }

    #[test]
    fn keeps_disjoint_boxes_sorted_by_confidence() {
        let ys = preds(&[
            ([100., 100., 20., 20.], 0, 0.5),
            ([300., 300., 20., 20.], 2, 0.7),
        ]);
        let dets = decode_predictions(ys.view(), 1.0, (640, 480), 0.25, 0.45, &names());
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].label, "NO-Hardhat");
        assert_eq!(dets[1].label, "Hardhat");
    }

    #[test]
    fn scales_back_and_clamps_to_frame() {
        // 640x480 的帧 letterbox 到 320 时比例为 0.5
        let ratio = letterbox_ratio(640, 480, 320);
        assert!((ratio - 0.5).abs() < 1e-6);
        let ys = preds(&[([310., 20., 40., 40.], 0, 0.9)]);
        let dets = decode_predictions(ys.view(), ratio, (640, 480), 0.25, 0.45, &names());
        assert_eq!(dets[0].bbox, BoundingBox::new(580, 0, 639, 80));
    }

    #[test]
    fn parses_metadata_names() {
        let raw = "{0: 'Hardhat', 2: 'NO-Hardhat', 1: 'Mask', 4: 'NO-Safety Vest'}";
        assert_eq!(
            parse_names(raw),
            vec!["Hardhat", "Mask", "NO-Hardhat", "NO-Safety Vest"]
        );
        assert!(parse_names("garbage").is_empty());
    }
}
