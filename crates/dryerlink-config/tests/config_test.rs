use std::time::Duration;

use dryerlink_config::{
    Config, ConfigError, Defaults, Profile, load_config_from, profile_to_engine_config,
    save_config_to,
};
use dryerlink_core::EngineConfig;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(cfg.active_profile_name(), "default");
    assert_eq!(cfg.engine_config(None).unwrap(), EngineConfig::default());
}

#[test]
fn profile_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "barn"

[defaults]
history_limit = 50

[profiles.barn]
offline_threshold_secs = 90
setpoint_max = 55.0
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    let engine = cfg.engine_config(None).unwrap();

    assert_eq!(engine.offline_threshold, Duration::from_secs(90));
    assert_eq!(engine.history_limit, 50);
    assert!((engine.setpoint_max - 55.0).abs() < f32::EPSILON);
    assert!((engine.setpoint_min - 30.0).abs() < f32::EPSILON);
}

#[test]
fn unknown_profile_is_an_error() {
    let cfg = Config::default();
    assert!(matches!(
        cfg.engine_config(Some("attic")),
        Err(ConfigError::UnknownProfile { profile }) if profile == "attic"
    ));
}

#[test]
fn inverted_setpoint_range_is_rejected() {
    let profile = Profile {
        setpoint_min: Some(70.0),
        ..Profile::default()
    };
    let err = profile_to_engine_config(&profile, &Defaults::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "setpoint"));
}

#[test]
fn zero_threshold_is_rejected() {
    let profile = Profile {
        offline_threshold_secs: Some(0),
        ..Profile::default()
    };
    assert!(profile_to_engine_config(&profile, &Defaults::default()).is_err());
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.profiles.insert(
        "default".into(),
        Profile {
            history_limit: Some(10),
            ..Profile::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.engine_config(None).unwrap().history_limit, 10);
}
