/// 安全帽模型微调
///
/// 在 COCO 预训练的 yolov8n 上用自定义数据集训练, 然后在验证集上评估
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use helmet_sentinel::init_tracing;
use helmet_sentinel::training::{TrainRequest, YoloCli};

#[derive(Parser, Debug)]
#[command(author, version, about = "安全帽模型微调 (ultralytics yolo)", long_about = None)]
struct Args {
    /// 基础模型
    #[arg(short, long, default_value = "../yolov8n.pt")]
    base: PathBuf,

    /// 数据集配置 (类别 + 训练/验证路径)
    #[arg(short, long, default_value = "community.yaml")]
    data: PathBuf,

    /// 训练轮数
    #[arg(short, long, default_value_t = 100)]
    epochs: u32,

    /// 输出目录
    #[arg(long, default_value = "runs/detect")]
    project: PathBuf,

    /// 本次训练名称
    #[arg(long, default_value = "helmet")]
    name: String,

    /// yolo 可执行文件
    #[arg(long, default_value = "yolo")]
    yolo: PathBuf,

    /// 训练后导出 ONNX 供桌面程序使用
    #[arg(long)]
    export_onnx: bool,

    /// 以 JSON 打印验证指标
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let cli = YoloCli::new(&args.yolo);
    let request = TrainRequest {
        base: args.base,
        data: args.data,
        epochs: args.epochs,
        project: args.project,
        name: args.name,
    };

    let best = cli.train(&request)?;
    let metrics = cli.validate(&best, &request.data)?;
    metrics.print_summary();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    }

    if args.export_onnx {
        let onnx = cli.export_onnx(&best)?;
        info!("💡 桌面程序可使用: helmet --model {}", onnx.display());
    }
    Ok(())
}
