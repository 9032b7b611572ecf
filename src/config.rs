use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::postprocess::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_THRESHOLD};
use crate::geometry::Rect;
use crate::occupancy::DEFAULT_OCCUPANCY_THRESHOLD;

const DEFAULT_VIDEO_PATH: &str = "gato.mp4";
const DEFAULT_CLASSES_PATH: &str = "coco.names";
const DEFAULT_TARGET_CLASS: &str = "cat";
const DEFAULT_REGION: Rect = Rect {
    x: 90,
    y: 180,
    width: 250,
    height: 180,
};
const DEFAULT_INPUT_SIZE: u32 = 416;
const DEFAULT_WAIT_MS: i32 = 30;
const DEFAULT_QUIT_KEY: char = 'q';
const DEFAULT_HEALTH_LOG_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    video_path: Option<String>,
    target_class: Option<String>,
    region: Option<RegionConfigFile>,
    occupancy_threshold: Option<u32>,
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
    model: Option<ModelConfigFile>,
    display: Option<DisplayConfigFile>,
    health_log_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RegionConfigFile {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    backend: Option<String>,
    variant: Option<String>,
    config_path: Option<PathBuf>,
    weights_path: Option<PathBuf>,
    classes_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    enabled: Option<bool>,
    wait_ms: Option<i32>,
    quit_key: Option<char>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// No model; replays scripted candidates (empty by default).
    Stub,
    /// Darknet cfg + weights through OpenCV DNN.
    Darknet,
    /// ONNX export through tract.
    Tract,
}

impl BackendKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "darknet" | "opencv" => Ok(Self::Darknet),
            "tract" | "onnx" => Ok(Self::Tract),
            other => Err(anyhow!(
                "unknown detector backend '{}' (expected stub, darknet or tract)",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelVariant {
    Tiny,
    Full,
}

impl ModelVariant {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tiny" => Ok(Self::Tiny),
            "full" => Ok(Self::Full),
            other => Err(anyhow!(
                "unknown model variant '{}' (expected tiny or full)",
                other
            )),
        }
    }

    fn stem(&self) -> &'static str {
        match self {
            Self::Tiny => "yolov4-tiny",
            Self::Full => "yolov4",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub video_path: String,
    pub target_class: String,
    pub region: Rect,
    pub occupancy_threshold: u32,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub model: ModelSettings,
    pub display: DisplaySettings,
    pub health_log_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub backend: BackendKind,
    pub variant: ModelVariant,
    pub config_path: PathBuf,
    pub weights_path: PathBuf,
    pub classes_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    explicit_config: bool,
    explicit_weights: bool,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub enabled: bool,
    pub wait_ms: i32,
    pub quit_key: char,
}

impl ModelSettings {
    /// Files that must exist before the model is loaded.
    pub fn required_assets(&self) -> Vec<PathBuf> {
        match self.backend {
            BackendKind::Stub => vec![self.classes_path.clone()],
            BackendKind::Darknet => vec![
                self.config_path.clone(),
                self.weights_path.clone(),
                self.classes_path.clone(),
            ],
            BackendKind::Tract => vec![self.weights_path.clone(), self.classes_path.clone()],
        }
    }

    /// Recompute default model paths after the backend or variant changed.
    fn refresh_default_paths(&mut self) {
        let stem = self.variant.stem();
        if !self.explicit_config {
            self.config_path = PathBuf::from(format!("{}.cfg", stem));
        }
        if !self.explicit_weights {
            let ext = match self.backend {
                BackendKind::Tract => "onnx",
                _ => "weights",
            };
            self.weights_path = PathBuf::from(format!("{}.{}", stem, ext));
        }
    }

    pub fn set_backend(&mut self, backend: BackendKind) {
        self.backend = backend;
        self.refresh_default_paths();
    }

    pub fn set_variant(&mut self, variant: ModelVariant) {
        self.variant = variant;
        self.refresh_default_paths();
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_file(MonitorConfigFile::default()).expect("built-in defaults are valid")
    }
}

impl MonitorConfig {
    /// Defaults, then the file named by `BANCADA_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BANCADA_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let model_file = file.model.unwrap_or_default();
        let backend = match model_file.backend.as_deref() {
            Some(value) => BackendKind::parse(value)?,
            None => BackendKind::Darknet,
        };
        let variant = match model_file.variant.as_deref() {
            Some(value) => ModelVariant::parse(value)?,
            None => ModelVariant::Tiny,
        };
        let mut model = ModelSettings {
            backend,
            variant,
            explicit_config: model_file.config_path.is_some(),
            explicit_weights: model_file.weights_path.is_some(),
            config_path: model_file.config_path.unwrap_or_default(),
            weights_path: model_file.weights_path.unwrap_or_default(),
            classes_path: model_file
                .classes_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLASSES_PATH)),
            input_width: model_file.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
            input_height: model_file.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
        };
        model.refresh_default_paths();

        let region = match file.region {
            Some(r) => Rect::new(r.x, r.y, r.width, r.height)?,
            None => DEFAULT_REGION,
        };
        let display_file = file.display.unwrap_or_default();
        let display = DisplaySettings {
            enabled: display_file.enabled.unwrap_or(true),
            wait_ms: display_file.wait_ms.unwrap_or(DEFAULT_WAIT_MS),
            quit_key: display_file.quit_key.unwrap_or(DEFAULT_QUIT_KEY),
        };

        Ok(Self {
            video_path: file
                .video_path
                .unwrap_or_else(|| DEFAULT_VIDEO_PATH.to_string()),
            target_class: file
                .target_class
                .unwrap_or_else(|| DEFAULT_TARGET_CLASS.to_string()),
            region,
            occupancy_threshold: file
                .occupancy_threshold
                .unwrap_or(DEFAULT_OCCUPANCY_THRESHOLD),
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            nms_threshold: file.nms_threshold.unwrap_or(DEFAULT_NMS_THRESHOLD),
            model,
            display,
            health_log_interval: Duration::from_secs(
                file.health_log_secs.unwrap_or(DEFAULT_HEALTH_LOG_SECS),
            ),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(video) = env_nonempty("BANCADA_VIDEO") {
            self.video_path = video;
        }
        if let Some(backend) = env_nonempty("BANCADA_BACKEND") {
            self.model.set_backend(BackendKind::parse(&backend)?);
        }
        if let Some(variant) = env_nonempty("BANCADA_MODEL_VARIANT") {
            self.model.set_variant(ModelVariant::parse(&variant)?);
        }
        if let Some(target) = env_nonempty("BANCADA_TARGET_CLASS") {
            self.target_class = target;
        }
        if let Some(region) = env_nonempty("BANCADA_REGION") {
            self.region = Rect::parse(&region)?;
        }
        if let Some(threshold) = env_nonempty("BANCADA_OCCUPANCY_THRESHOLD") {
            self.occupancy_threshold = threshold.trim().parse().map_err(|_| {
                anyhow!("BANCADA_OCCUPANCY_THRESHOLD must be a non-negative integer")
            })?;
        }
        if let Some(confidence) = env_nonempty("BANCADA_CONFIDENCE") {
            self.confidence_threshold = confidence
                .trim()
                .parse()
                .map_err(|_| anyhow!("BANCADA_CONFIDENCE must be a number"))?;
        }
        if let Some(nms) = env_nonempty("BANCADA_NMS") {
            self.nms_threshold = nms
                .trim()
                .parse()
                .map_err(|_| anyhow!("BANCADA_NMS must be a number"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.region.width <= 0 || self.region.height <= 0 {
            return Err(anyhow!("monitored region must have positive size"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be within 0..=1 (got {})",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(anyhow!(
                "nms threshold must be within 0..=1 (got {})",
                self.nms_threshold
            ));
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        if self.target_class.trim().is_empty() {
            return Err(anyhow!("target class must not be empty"));
        }
        Ok(())
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.video_path, "gato.mp4");
        assert_eq!(cfg.region, Rect::new(90, 180, 250, 180).unwrap());
        assert_eq!(cfg.occupancy_threshold, 1500);
        assert_eq!(cfg.confidence_threshold, 0.6);
        assert_eq!(cfg.nms_threshold, 0.3);
        assert_eq!(cfg.model.backend, BackendKind::Darknet);
        assert_eq!(cfg.model.config_path, PathBuf::from("yolov4-tiny.cfg"));
        assert_eq!(cfg.model.weights_path, PathBuf::from("yolov4-tiny.weights"));
        assert_eq!(cfg.model.classes_path, PathBuf::from("coco.names"));
        assert_eq!(cfg.model.input_width, 416);
        assert_eq!(cfg.display.wait_ms, 30);
        assert_eq!(cfg.display.quit_key, 'q');
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn full_variant_switches_default_paths() {
        let mut cfg = MonitorConfig::default();
        cfg.model.set_variant(ModelVariant::Full);
        assert_eq!(cfg.model.config_path, PathBuf::from("yolov4.cfg"));
        assert_eq!(cfg.model.weights_path, PathBuf::from("yolov4.weights"));
        cfg.model.set_backend(BackendKind::Tract);
        assert_eq!(cfg.model.weights_path, PathBuf::from("yolov4.onnx"));
    }

    #[test]
    fn explicit_paths_survive_variant_change() -> Result<()> {
        let file: MonitorConfigFile = serde_json::from_str(
            r#"{ "model": { "weights_path": "/models/custom.weights" } }"#,
        )?;
        let mut cfg = MonitorConfig::from_file(file)?;
        cfg.model.set_variant(ModelVariant::Full);
        assert_eq!(cfg.model.weights_path, PathBuf::from("/models/custom.weights"));
        assert_eq!(cfg.model.config_path, PathBuf::from("yolov4.cfg"));
        Ok(())
    }

    #[test]
    fn required_assets_depend_on_backend() {
        let mut cfg = MonitorConfig::default();
        assert_eq!(cfg.model.required_assets().len(), 3);
        cfg.model.set_backend(BackendKind::Tract);
        assert_eq!(cfg.model.required_assets().len(), 2);
        cfg.model.set_backend(BackendKind::Stub);
        assert_eq!(
            cfg.model.required_assets(),
            vec![PathBuf::from("coco.names")]
        );
    }

    #[test]
    fn rejects_bad_values() -> Result<()> {
        assert!(BackendKind::parse("cuda").is_err());
        assert!(ModelVariant::parse("huge").is_err());

        let file: MonitorConfigFile =
            serde_json::from_str(r#"{ "region": { "x": 0, "y": 0, "width": 0, "height": 5 } }"#)?;
        assert!(MonitorConfig::from_file(file).is_err());

        let mut cfg = MonitorConfig::default();
        cfg.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());
        Ok(())
    }
}
