use std::sync::Mutex;

use tempfile::NamedTempFile;

use motion_sentry::config::SentryConfig;
use motion_sentry::StrategyKind;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SENTRY_CONFIG",
        "SENTRY_ADDR",
        "SENTRY_SOURCE_URL",
        "SENTRY_STRATEGY",
        "SENTRY_WEIGHT",
        "SENTRY_THRESHOLD",
        "SENTRY_WARMUP",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "url": "dir:///var/frames/front",
            "width": 800,
            "height": 600,
            "target_fps": 12
        },
        "detection": {
            "strategy": "adaptive",
            "weight": 0.25,
            "threshold": 30,
            "warmup_frames": 100,
            "target_width": 320,
            "kernel_size": 15,
            "history": 200
        },
        "stream": {
            "addr": "0.0.0.0:9000",
            "jpeg_quality": 60
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SENTRY_CONFIG", file.path());
    std::env::set_var("SENTRY_STRATEGY", "weighted");
    std::env::set_var("SENTRY_WARMUP", "25");

    let cfg = SentryConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "dir:///var/frames/front");
    assert_eq!(cfg.source.width, 800);
    assert_eq!(cfg.source.height, 600);
    assert_eq!(cfg.source.target_fps, 12);
    assert_eq!(cfg.detection.strategy, StrategyKind::Weighted);
    assert_eq!(cfg.detection.weight, 0.25);
    assert_eq!(cfg.detection.threshold, 30);
    assert_eq!(cfg.detection.warmup_frames, 25);
    assert_eq!(cfg.detection.target_width, 320);
    assert_eq!(cfg.detection.kernel_size, 15);
    assert_eq!(cfg.detection.history, 200);
    assert_eq!(cfg.stream.addr, "0.0.0.0:9000");
    assert_eq!(cfg.stream.jpeg_quality, 60);
    // Fields the file omits keep their defaults.
    assert_eq!(cfg.detection.erode_iterations, 3);
    assert_eq!(cfg.detection.dilate_iterations, 3);

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SentryConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "stub://front_camera");
    assert_eq!(cfg.detection.strategy, StrategyKind::Weighted);
    assert_eq!(cfg.detection.weight, 0.5);
    assert_eq!(cfg.detection.threshold, 25);
    assert_eq!(cfg.detection.warmup_frames, 50);
    assert_eq!(cfg.detection.target_width, 400);
    assert_eq!(cfg.detection.kernel_size, 20);
    assert_eq!(cfg.stream.addr, "127.0.0.1:5000");
    assert_eq!(cfg.stream.jpeg_quality, 80);
}

#[test]
fn invalid_env_values_are_errors() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SENTRY_WEIGHT", "not-a-number");
    assert!(SentryConfig::load().is_err());
    std::env::set_var("SENTRY_WEIGHT", "1.5");
    assert!(SentryConfig::load().is_err());

    clear_env();
    std::env::set_var("SENTRY_STRATEGY", "mog2");
    assert!(SentryConfig::load().is_err());

    clear_env();
}
