use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use bancada_watch::config::{BackendKind, ModelVariant, MonitorConfig};
use bancada_watch::Rect;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "BANCADA_CONFIG",
        "BANCADA_VIDEO",
        "BANCADA_MODEL_VARIANT",
        "BANCADA_TARGET_CLASS",
        "BANCADA_REGION",
        "BANCADA_OCCUPANCY_THRESHOLD",
        "BANCADA_CONFIDENCE",
        "BANCADA_NMS",
        "BANCADA_BACKEND",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "video_path": "kitchen.mp4",
        "target_class": "dog",
        "region": { "x": 10, "y": 20, "width": 300, "height": 200 },
        "occupancy_threshold": 900,
        "model": {
            "backend": "darknet",
            "classes_path": "/models/coco.names"
        },
        "display": { "enabled": false, "wait_ms": 10, "quit_key": "x" }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("BANCADA_CONFIG", file.path());
    std::env::set_var("BANCADA_TARGET_CLASS", "cat");
    std::env::set_var("BANCADA_MODEL_VARIANT", "full");
    std::env::set_var("BANCADA_CONFIDENCE", "0.5");

    let cfg = MonitorConfig::load().expect("load config");

    assert_eq!(cfg.video_path, "kitchen.mp4");
    assert_eq!(cfg.target_class, "cat");
    assert_eq!(cfg.region, Rect::new(10, 20, 300, 200).unwrap());
    assert_eq!(cfg.occupancy_threshold, 900);
    assert_eq!(cfg.confidence_threshold, 0.5);
    assert_eq!(cfg.nms_threshold, 0.3);
    assert_eq!(cfg.model.backend, BackendKind::Darknet);
    assert_eq!(cfg.model.variant, ModelVariant::Full);
    assert_eq!(cfg.model.config_path, PathBuf::from("yolov4.cfg"));
    assert_eq!(cfg.model.weights_path, PathBuf::from("yolov4.weights"));
    assert_eq!(cfg.model.classes_path, PathBuf::from("/models/coco.names"));
    assert!(!cfg.display.enabled);
    assert_eq!(cfg.display.wait_ms, 10);
    assert_eq!(cfg.display.quit_key, 'x');

    clear_env();
}

#[test]
fn loads_toml_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        video_path = "stub://counter"
        nms_threshold = 0.45

        [model]
        backend = "stub"
    "#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("BANCADA_CONFIG", file.path());

    let cfg = MonitorConfig::load().expect("load config");
    assert_eq!(cfg.video_path, "stub://counter");
    assert_eq!(cfg.nms_threshold, 0.45);
    assert_eq!(cfg.model.backend, BackendKind::Stub);
    assert_eq!(
        cfg.model.required_assets(),
        vec![PathBuf::from("coco.names")]
    );

    clear_env();
}

#[test]
fn env_region_and_threshold_override_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    std::env::set_var("BANCADA_REGION", "5, 6, 70, 80");
    std::env::set_var("BANCADA_OCCUPANCY_THRESHOLD", "42");
    std::env::set_var("BANCADA_BACKEND", "tract");

    let cfg = MonitorConfig::load().expect("load config");
    assert_eq!(cfg.region, Rect::new(5, 6, 70, 80).unwrap());
    assert_eq!(cfg.occupancy_threshold, 42);
    assert_eq!(cfg.model.weights_path, PathBuf::from("yolov4-tiny.onnx"));

    clear_env();
}

#[test]
fn rejects_invalid_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    std::env::set_var("BANCADA_REGION", "1,2,0,4");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("BANCADA_REGION", "2147483600,0,100,100");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "region": { "x": 0, "y": 2147483000, "width": 10, "height": 1000 } }"#)
        .expect("write config");
    std::env::set_var("BANCADA_CONFIG", file.path());
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("BANCADA_NMS", "1.2");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("BANCADA_OCCUPANCY_THRESHOLD", "-3");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("BANCADA_CONFIG", "/nonexistent/bancada.json");
    assert!(MonitorConfig::load().is_err());
    clear_env();
}
