//! watchd - synthetic end-to-end run of the monitoring pipeline.
//!
//! Drives a handful of sessions with generated frames (a moving bright block
//! over a gradient background) through the full API boundary, using scripted
//! detector backends so the run shows detections without model files.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use image::{Rgb, RgbImage};

use framewatch::{
    CascadeKind, DetectionPipeline, DetectorRegistry, MonitorApi, Region, ScriptedBackend,
    ScriptedRecognizer,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of concurrent sessions to simulate.
    #[arg(long, default_value_t = 2)]
    sessions: u32,
    /// Frames pushed per second per session.
    #[arg(long, default_value_t = 20)]
    push_fps: u32,
    /// Session target FPS (governor setting).
    #[arg(long, default_value_t = 10.0)]
    target_fps: f64,
    /// Run duration in seconds.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Synthetic frame width.
    #[arg(long, default_value_t = 320)]
    width: u32,
    /// Synthetic frame height.
    #[arg(long, default_value_t = 240)]
    height: u32,
}

fn synthetic_frame(width: u32, height: u32, tick: u32) -> RgbImage {
    let mut frame = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    });
    // Moving bright block so motion and camera analysis have signal.
    let block = width / 8;
    let bx = (tick * 7) % width.saturating_sub(block).max(1);
    let by = (tick * 3) % height.saturating_sub(block).max(1);
    for y in by..(by + block).min(height) {
        for x in bx..(bx + block).min(width) {
            frame.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    frame
}

fn scripted_pipeline(width: u32, height: u32) -> DetectionPipeline {
    let mut registry = DetectorRegistry::new();
    // Faces come and go so edge-triggered notifications fire.
    registry.register(
        CascadeKind::Face,
        ScriptedBackend::new(vec![
            vec![],
            vec![],
            vec![Region::new(width / 4, height / 4, 60, 60, 0.92)],
            vec![
                Region::new(width / 4, height / 4, 60, 60, 0.93),
                Region::new(width / 2, height / 3, 52, 52, 0.88),
            ],
        ]),
    );
    registry.register(
        CascadeKind::Eye,
        ScriptedBackend::fixed(vec![
            Region::new(10, 18, 12, 8, 0.81),
            Region::new(34, 18, 12, 8, 0.79),
        ]),
    );
    registry.register(
        CascadeKind::Hand,
        ScriptedBackend::fixed(vec![Region::new(width / 2, height / 2, 48, 64, 0.7)]),
    );
    let text = ScriptedRecognizer::fixed("EXIT 12 - KEEP RIGHT", 0.84);
    DetectionPipeline::new(registry, Some(Box::new(text)))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let api = Arc::new(MonitorApi::with_pipeline(scripted_pipeline(
        args.width,
        args.height,
    )));

    let ids: Vec<String> = (0..args.sessions).map(|i| format!("demo-{i}")).collect();
    for id in &ids {
        api.initialize_session(id)?;
        api.set_target_fps(id, args.target_fps)?;
    }

    println!("watchd: {} session(s), pushing {} fps against a {} fps target",
        args.sessions, args.push_fps, args.target_fps);

    let spacing = Duration::from_secs_f64(1.0 / args.push_fps.max(1) as f64);
    let total_frames = args.push_fps as u64 * args.seconds;

    let mut handles = Vec::new();
    for id in ids.clone() {
        let api = api.clone();
        let running = running.clone();
        let (width, height) = (args.width, args.height);
        handles.push(thread::spawn(move || {
            let mut skipped = 0u64;
            let mut notified = 0u64;
            for n in 0..total_frames {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let frame = synthetic_frame(width, height, n as u32);
                let Ok(bytes) = framewatch::frame::encode_png(&frame) else {
                    continue;
                };
                let result = api.process_frame(&id, &bytes, n, n * 50);
                if result.image.is_none() && result.success {
                    skipped += 1;
                }
                notified += result.notifications.len() as u64;
                thread::sleep(spacing);
            }
            (id, skipped, notified)
        }));
    }

    for handle in handles {
        let (id, skipped, notified) = handle
            .join()
            .map_err(|_| anyhow::anyhow!("session thread panicked"))?;
        let stats = api.get_stats(&id)?;
        let rate = api.frame_rate_info(&id)?;
        let camera = api.camera_movement_analysis(&id)?;
        println!("-- session {id}");
        println!("   processed {} frames, {} skipped, {} notification(s)",
            stats.total_frames_processed, skipped, notified);
        println!("   fps {:.1}/{:.1} ({}), drop rate {:.0}%",
            rate.actual_fps, rate.target_fps, rate.recommendation,
            rate.estimated_drop_rate * 100.0);
        println!("   camera: {} ({})", camera.status, camera.recommendation);
    }

    for id in &ids {
        api.cleanup_session(id)?;
    }
    println!("watchd: done, {} active session(s) remain", api.active_sessions().len());
    Ok(())
}
