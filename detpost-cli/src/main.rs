use clap::Parser;
use detpost::{
    ConfLayout, Detection, DetectConfig, Detector, FeatureMapSpec, Predictions, PriorBox,
    PriorConfig, PriorSet, Stage, StageTimings, Variance, Workspace,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "detpost CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output and per-stage timings.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LayoutConfig {
    #[default]
    AnchorMajor,
    ClassMajor,
}

impl From<LayoutConfig> for ConfLayout {
    fn from(value: LayoutConfig) -> Self {
        match value {
            LayoutConfig::AnchorMajor => ConfLayout::AnchorMajor,
            LayoutConfig::ClassMajor => ConfLayout::ClassMajor,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureMapJson {
    size: usize,
    step: f32,
    min_size: f32,
    #[serde(default)]
    max_size: Option<f32>,
    #[serde(default)]
    aspect_ratios: Vec<f32>,
}

impl From<FeatureMapJson> for FeatureMapSpec {
    fn from(value: FeatureMapJson) -> Self {
        Self {
            size: value.size,
            step: value.step,
            min_size: value.min_size,
            max_size: value.max_size,
            aspect_ratios: value.aspect_ratios,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PriorConfigJson {
    image_size: f32,
    clip: bool,
    feature_maps: Vec<FeatureMapJson>,
}

impl Default for PriorConfigJson {
    fn default() -> Self {
        let cfg = PriorConfig::ssd300();
        Self {
            image_size: cfg.image_size,
            clip: cfg.clip,
            feature_maps: cfg
                .feature_maps
                .into_iter()
                .map(|m| FeatureMapJson {
                    size: m.size,
                    step: m.step,
                    min_size: m.min_size,
                    max_size: m.max_size,
                    aspect_ratios: m.aspect_ratios,
                })
                .collect(),
        }
    }
}

impl From<PriorConfigJson> for PriorConfig {
    fn from(value: PriorConfigJson) -> Self {
        Self {
            image_size: value.image_size,
            feature_maps: value.feature_maps.into_iter().map(Into::into).collect(),
            clip: value.clip,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectConfigJson {
    num_classes: usize,
    background_label: usize,
    conf_thresh: f32,
    iou_thresh: f32,
    top_k: usize,
    variance: [f32; 2],
    parallel: bool,
}

impl Default for DetectConfigJson {
    fn default() -> Self {
        let cfg = DetectConfig::default();
        Self {
            num_classes: cfg.num_classes,
            background_label: cfg.background_label,
            conf_thresh: cfg.conf_thresh,
            iou_thresh: cfg.iou_thresh,
            top_k: cfg.top_k,
            variance: [cfg.variance.center, cfg.variance.size],
            parallel: cfg.parallel,
        }
    }
}

impl From<DetectConfigJson> for DetectConfig {
    fn from(value: DetectConfigJson) -> Self {
        Self {
            num_classes: value.num_classes,
            background_label: value.background_label,
            conf_thresh: value.conf_thresh,
            iou_thresh: value.iou_thresh,
            top_k: value.top_k,
            variance: Variance::new(value.variance[0], value.variance[1]),
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    predictions_path: String,
    priors_path: Option<String>,
    priors: PriorConfigJson,
    output_path: Option<String>,
    /// Cross-class cap per image; 0 keeps every detection.
    max_per_image: usize,
    detect: DetectConfigJson,
}

#[derive(Debug, Deserialize)]
struct PredictionsFile {
    batch: usize,
    #[serde(default)]
    layout: LayoutConfig,
    loc: Vec<f32>,
    conf: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct PriorsFile {
    priors: Vec<[f32; 4]>,
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    class: usize,
    score: f32,
    bbox: [f32; 4],
}

impl From<Detection> for DetectionRecord {
    fn from(value: Detection) -> Self {
        Self {
            class: value.class,
            score: value.score,
            bbox: value.bbox.to_array(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRecord {
    image: usize,
    detections: Vec<DetectionRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    shape: [usize; 4],
    images: Vec<ImageRecord>,
}

fn load_priors(
    priors_path: Option<&str>,
    generate: PriorConfigJson,
) -> Result<PriorSet, Box<dyn std::error::Error>> {
    match priors_path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let file: PriorsFile = serde_json::from_str(&text)?;
            let boxes = file
                .priors
                .into_iter()
                .map(|p| PriorBox::new(p[0], p[1], p[2], p[3]))
                .collect();
            Ok(PriorSet::new(boxes)?)
        }
        None => Ok(PriorSet::generate(&generate.into())?),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive("detpost=info".parse()?)
                    .add_directive("detpost_cli=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let Config {
        predictions_path,
        priors_path,
        priors,
        output_path,
        max_per_image,
        detect,
    } = serde_json::from_str(&config_text)?;
    if predictions_path.is_empty() {
        return Err("predictions_path must be set in the config".into());
    }

    let priors = load_priors(priors_path.as_deref(), priors)?;
    let preds_text = fs::read_to_string(&predictions_path)?;
    let preds_file: PredictionsFile = serde_json::from_str(&preds_text)?;

    let detector = Detector::new(priors, detect.into())?;
    let preds = Predictions::new(&preds_file.loc, &preds_file.conf, preds_file.batch)
        .with_layout(preds_file.layout.into());

    let timings = StageTimings::new();
    let mut ws = Workspace::with_capacity(detector.priors().len());
    let mut out = detector.output_buffer(preds.batch);
    detector.detect_instrumented(preds, &mut ws, &mut out, &timings)?;

    if cli.trace {
        for stage in Stage::ALL {
            tracing::info!(
                stage = ?stage,
                calls = timings.calls(stage),
                total_us = timings.total(stage).as_micros() as u64,
                "stage timing"
            );
        }
    }

    let mut images = Vec::with_capacity(out.batch());
    for image in 0..out.batch() {
        let detections = if max_per_image == 0 {
            out.detections(image)?
        } else {
            out.top_detections(image, max_per_image)?
        };
        images.push(ImageRecord {
            image,
            detections: detections.into_iter().map(DetectionRecord::from).collect(),
        });
    }
    let output = Output {
        shape: out.shape(),
        images,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
