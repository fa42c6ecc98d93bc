use image::{Rgb, RgbImage};

use framewatch::{
    frame, CascadeKind, DetectionPipeline, DetectorRegistry, EngineConfig, MonitorApi,
    MonitorOptionKind, MonitoringConfiguration, Region, ScriptedBackend, Settings,
};

fn bare_api() -> MonitorApi {
    MonitorApi::with_pipeline(DetectionPipeline::new(DetectorRegistry::new(), None))
}

fn png_frame(width: u32, height: u32, value: u8) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
    frame::encode_png(&image).expect("encode test frame")
}

#[test]
fn cleanup_forgets_the_session_and_stats_read_fresh() -> anyhow::Result<()> {
    let api = bare_api();
    api.initialize_session("cam-1")?;

    let result = api.process_frame("cam-1", &png_frame(16, 16, 80), 0, 0);
    assert!(result.success);
    assert_eq!(api.get_stats("cam-1")?.total_frames_processed, 1);
    assert_eq!(api.active_sessions(), vec!["cam-1".to_string()]);

    api.cleanup_session("cam-1")?;
    assert!(api.active_sessions().is_empty());
    // An unknown identifier reads as defaults, not an error.
    assert_eq!(api.get_stats("cam-1")?.total_frames_processed, 0);
    Ok(())
}

#[test]
fn configured_default_fps_reaches_new_sessions() -> anyhow::Result<()> {
    let models = tempfile::tempdir()?;
    let config = EngineConfig {
        model_dir: models.path().to_path_buf(),
        default_target_fps: 15.0,
        ..EngineConfig::default()
    };
    let api = MonitorApi::new(&config);

    api.initialize_session("cam-1")?;
    assert_eq!(api.get_settings("cam-1")?.target_fps, 15.0);
    assert_eq!(api.frame_rate_info("cam-1")?.target_fps, 15.0);

    // The auto-create path on frame processing applies the same default.
    let result = api.process_frame("cam-2", &png_frame(16, 16, 80), 0, 0);
    assert!(result.success);
    assert_eq!(api.get_settings("cam-2")?.target_fps, 15.0);
    Ok(())
}

#[test]
fn reads_never_resurrect_a_cleaned_up_session() -> anyhow::Result<()> {
    let api = bare_api();
    api.initialize_session("cam-1")?;
    api.process_frame("cam-1", &png_frame(16, 16, 80), 0, 0);
    api.cleanup_session("cam-1")?;

    let settings = api.get_settings("cam-1")?;
    assert_eq!(settings.target_fps, 30.0);
    let config = api.get_monitoring_configuration("cam-1")?;
    assert_eq!(config.frame_rate.target_fps, 30.0);
    let rate = api.frame_rate_info("cam-1")?;
    assert_eq!(rate.actual_fps, 0.0);
    let camera = api.camera_movement_analysis("cam-1")?;
    assert_eq!(camera.stability, 100.0);
    assert_eq!(api.get_stats("cam-1")?.total_frames_processed, 0);

    // None of the reads re-created the session.
    assert!(api.active_sessions().is_empty());
    Ok(())
}

#[test]
fn processing_auto_creates_unknown_sessions() {
    let api = bare_api();
    let result = api.process_frame("never-initialized", &png_frame(16, 16, 80), 0, 0);
    assert!(result.success);
    assert_eq!(api.active_sessions(), vec!["never-initialized".to_string()]);
}

#[test]
fn empty_identifier_is_rejected_everywhere() {
    let api = bare_api();
    assert!(api.initialize_session("  ").is_err());
    assert!(api.get_stats("").is_err());

    let result = api.process_frame("", &png_frame(16, 16, 80), 0, 0);
    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.contains("missing session identifier")));
    assert!(api.active_sessions().is_empty());
}

#[test]
fn undecodable_payload_fails_without_touching_stats() -> anyhow::Result<()> {
    let api = bare_api();
    api.initialize_session("cam-1")?;
    api.process_frame("cam-1", &png_frame(16, 16, 80), 0, 0);

    let result = api.process_frame("cam-1", b"not an image", 1, 33);
    assert!(!result.success);
    assert!(result.image.is_none());
    assert_eq!(api.get_stats("cam-1")?.total_frames_processed, 1);
    Ok(())
}

#[test]
fn option_toggle_reaches_settings_and_configuration() -> anyhow::Result<()> {
    let api = bare_api();
    api.initialize_session("cam-1")?;

    api.set_option_enabled("cam-1", "face_detection", false)?;
    let settings = api.get_settings("cam-1")?;
    assert!(!settings.detectors.get(MonitorOptionKind::FaceDetection));
    assert!(settings.detectors.get(MonitorOptionKind::HandDetection));

    let config = api.get_monitoring_configuration("cam-1")?;
    let face_option = config
        .options
        .iter()
        .find(|o| o.name == "face_detection")
        .expect("catalog entry");
    assert!(!face_option.enabled);

    // Unknown names are ignored, not an error.
    api.set_option_enabled("cam-1", "sentiment_analysis", true)?;
    assert_eq!(
        api.get_settings("cam-1")?.detectors,
        settings.detectors
    );
    Ok(())
}

#[test]
fn configuration_update_cascades_and_schedules_skips() -> anyhow::Result<()> {
    let mut registry = DetectorRegistry::new();
    registry.register(
        CascadeKind::Face,
        ScriptedBackend::fixed(vec![Region::new(2, 2, 8, 8, 0.9)]),
    );
    let api = MonitorApi::with_pipeline(DetectionPipeline::new(registry, None));
    api.initialize_session("cam-1")?;

    let mut config = MonitoringConfiguration::default();
    config.frame_rate.target_fps = 500.0;
    config.frame_rate.frame_skip_count = 3;
    config.camera_movement.stability_threshold = 75.0;
    for option in &mut config.options {
        if option.name == "text_detection" {
            option.enabled = false;
        }
    }
    api.update_monitoring_configuration("cam-1", config)?;

    let settings = api.get_settings("cam-1")?;
    assert_eq!(settings.target_fps, 60.0);
    assert_eq!(settings.stability_threshold, 75.0);
    assert!(!settings.detectors.get(MonitorOptionKind::TextDetection));

    // The next three frames drain the configured skip budget.
    for n in 0..3u64 {
        let result = api.process_frame("cam-1", &png_frame(16, 16, 80), n, n * 16);
        assert!(result.success);
        assert!(result.image.is_none());
    }
    let accepted = api.process_frame("cam-1", &png_frame(16, 16, 80), 3, 48);
    assert!(accepted.image.is_some());
    assert_eq!(api.get_stats("cam-1")?.total_frames_processed, 1);
    Ok(())
}

#[test]
fn settings_replacement_is_normalized() -> anyhow::Result<()> {
    let api = bare_api();
    api.initialize_session("cam-1")?;

    let submitted = Settings {
        target_fps: 500.0,
        movement_threshold: 12.0,
        ..Settings::default()
    };
    api.update_settings("cam-1", submitted)?;

    let stored = api.get_settings("cam-1")?;
    assert_eq!(stored.target_fps, 60.0);
    assert_eq!(stored.movement_threshold, 12.0);

    // The configuration view reflects the replacement.
    let config = api.get_monitoring_configuration("cam-1")?;
    assert_eq!(config.frame_rate.target_fps, 60.0);
    Ok(())
}

#[test]
fn monitoring_catalog_names_every_option_once() {
    let catalog = MonitorApi::monitoring_options();
    let mut names: Vec<&str> = catalog.iter().map(|o| o.name.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "camera_movement",
            "eye_detection",
            "face_detection",
            "hand_detection",
            "motion_detection",
            "text_detection",
        ]
    );
}

#[test]
fn generated_session_ids_are_unique_and_prefixed() {
    let a = MonitorApi::generate_session_id();
    let b = MonitorApi::generate_session_id();
    assert_ne!(a, b);
    assert!(a.starts_with("session-"));
    assert_eq!(a.len(), "session-".len() + 16);
}

#[test]
fn frame_rate_info_reports_the_degraded_band_when_idle() -> anyhow::Result<()> {
    let api = bare_api();
    api.initialize_session("cam-1")?;
    let info = api.frame_rate_info("cam-1")?;
    assert_eq!(info.target_fps, 30.0);
    assert_eq!(info.actual_fps, 0.0);
    assert!(info.recommendation.contains("severely degraded"));
    Ok(())
}
