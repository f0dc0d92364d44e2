//! 训练工具 - 调用 ultralytics `yolo` 命令行完成训练 / 验证 / 导出
//!
//! 训练与验证的内部细节全部交给外部库, 这里只负责拼参数和读结果

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// 单个类别 (或 `all`) 的验证指标
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub name: String,
    pub images: u32,
    pub instances: u32,
    pub precision: f32,
    pub recall: f32,
    pub map50: f32,
    pub map50_95: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationMetrics {
    pub all: ClassMetrics,
    pub classes: Vec<ClassMetrics>,
}

impl ValidationMetrics {
    /// 从 `yolo detect val` 的输出中解析汇总表
    pub fn parse(output: &str) -> Result<Self> {
        let ansi = Regex::new(r"\x1b\[[0-9;]*[A-Za-z]")?;
        let clean = ansi.replace_all(output, "");

        let mut all = None;
        let mut classes = Vec::new();
        for line in clean.lines() {
            // tqdm 用 \r 刷新同一行, 只看最后一段
            let line = line.rsplit('\r').next().unwrap_or(line);
            let Some(row) = parse_row(line) else {
                continue;
            };
            if row.name == "all" {
                // 重复的 all 行以最后一次为准
                all = Some(row);
                classes.clear();
            } else if all.is_some() {
                classes.push(row);
            }
        }

        match all {
            Some(all) => Ok(Self { all, classes }),
            None => bail!("验证输出中没有找到 all 汇总行"),
        }
    }

    pub fn print_summary(&self) {
        info!("📊 验证结果");
        for row in std::iter::once(&self.all).chain(&self.classes) {
            info!(
                "   {:>12} P={:.3} R={:.3} mAP50={:.3} mAP50-95={:.3} ({} 张, {} 个实例)",
                row.name, row.precision, row.recall, row.map50, row.map50_95, row.images, row.instances
            );
        }
    }
}

/// `<类别名...> <images> <instances> <P> <R> <mAP50> <mAP50-95>`
fn parse_row(line: &str) -> Option<ClassMetrics> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 7 {
        return None;
    }
    let (name, numbers) = tokens.split_at(tokens.len() - 6);
    let images = numbers[0].parse().ok()?;
    let instances = numbers[1].parse().ok()?;
    let mut scores = [0f32; 4];
    for (score, token) in scores.iter_mut().zip(&numbers[2..]) {
        *score = token.parse().ok()?;
    }
    Some(ClassMetrics {
        name: name.join(" "),
        images,
        instances,
        precision: scores[0],
        recall: scores[1],
        map50: scores[2],
        map50_95: scores[3],
    })
}

/// 一次训练任务
#[derive(Clone, Debug)]
pub struct TrainRequest {
    pub base: PathBuf,
    pub data: PathBuf,
    pub epochs: u32,
    pub project: PathBuf,
    pub name: String,
}

impl TrainRequest {
    /// 训练产物: `<project>/<name>/weights/best.pt`
    pub fn best_checkpoint(&self) -> PathBuf {
        self.project.join(&self.name).join("weights").join("best.pt")
    }
}

/// ultralytics 命令行
#[derive(Clone, Debug)]
pub struct YoloCli {
    program: PathBuf,
}

impl Default for YoloCli {
    fn default() -> Self {
        Self::new("yolo")
    }
}

impl YoloCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn train_args(request: &TrainRequest) -> Vec<OsString> {
        vec![
            "detect".into(),
            "train".into(),
            key_value("model", request.base.as_os_str()),
            key_value("data", request.data.as_os_str()),
            format!("epochs={}", request.epochs).into(),
            key_value("project", request.project.as_os_str()),
            format!("name={}", request.name).into(),
            "exist_ok=True".into(),
        ]
    }

    pub fn val_args(checkpoint: &Path, data: &Path) -> Vec<OsString> {
        vec![
            "detect".into(),
            "val".into(),
            key_value("model", checkpoint.as_os_str()),
            key_value("data", data.as_os_str()),
        ]
    }

    pub fn export_args(checkpoint: &Path) -> Vec<OsString> {
        vec![
            "export".into(),
            key_value("model", checkpoint.as_os_str()),
            "format=onnx".into(),
        ]
    }

    /// 在基础模型上微调, 返回最优权重路径
    pub fn train(&self, request: &TrainRequest) -> Result<PathBuf> {
        info!(
            "🚀 开始训练: {} + {} ({} 轮)",
            request.base.display(),
            request.data.display(),
            request.epochs
        );
        self.run(&Self::train_args(request))?;

        let best = request.best_checkpoint();
        if !best.is_file() {
            bail!("训练结束但没有生成 {}", best.display());
        }
        info!("✅ 训练完成: {}", best.display());
        Ok(best)
    }

    /// 在验证集上评估
    pub fn validate(&self, checkpoint: &Path, data: &Path) -> Result<ValidationMetrics> {
        info!("🔍 验证: {}", checkpoint.display());
        let args = Self::val_args(checkpoint, data);
        debug!("{} {:?}", self.program.display(), args);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("无法执行 {}", self.program.display()))?;

        // 汇总表可能写到 stdout 或 stderr
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            bail!("yolo val 失败 ({}):\n{}", output.status, text.trim_end());
        }
        ValidationMetrics::parse(&text)
    }

    /// 导出 ONNX, 返回与权重同名的 `.onnx` 文件
    pub fn export_onnx(&self, checkpoint: &Path) -> Result<PathBuf> {
        info!("📦 导出 ONNX: {}", checkpoint.display());
        self.run(&Self::export_args(checkpoint))?;

        let onnx = checkpoint.with_extension("onnx");
        if !onnx.is_file() {
            bail!("导出结束但没有生成 {}", onnx.display());
        }
        info!("✅ 导出完成: {}", onnx.display());
        Ok(onnx)
    }

    /// 继承终端输出, 训练进度直接显示
    fn run(&self, args: &[OsString]) -> Result<()> {
        debug!("{} {:?}", self.program.display(), args);
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .with_context(|| format!("无法执行 {}", self.program.display()))?;
        if !status.success() {
            bail!("{} 退出状态异常: {}", self.program.display(), status);
        }
        Ok(())
    }
}

fn key_value(key: &str, value: &std::ffi::OsStr) -> OsString {
    let mut arg = OsString::from(key);
    arg.push("=");
    arg.push(value);
    arg
}
