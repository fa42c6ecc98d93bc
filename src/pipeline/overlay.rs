//! Frame annotation drawing.
//!
//! All overlays degrade gracefully on tiny frames: anything that does not
//! fit is clipped or dropped rather than panicking. Labels render as
//! fixed per-category colors and gauges; no font asset is bundled.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::analysis::CameraMovement;
use crate::detect::Region;

pub const FACE_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
pub const EYE_COLOR: Rgb<u8> = Rgb([0, 120, 255]);
pub const HAND_COLOR: Rgb<u8> = Rgb([255, 140, 0]);
pub const TEXT_BADGE_COLOR: Rgb<u8> = Rgb([160, 0, 200]);

pub const FACE_THICKNESS: u32 = 2;
pub const EYE_THICKNESS: u32 = 1;
pub const HAND_THICKNESS: u32 = 2;

const METER_HEIGHT: u32 = 6;
const STATUS_STRIP_HEIGHT: u32 = 4;
const PANEL_WIDTH: u32 = 64;
const PANEL_HEIGHT: u32 = 18;

/// Draw a detection rectangle with the given thickness, clipped to frame.
pub fn draw_region(frame: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    let (fw, fh) = frame.dimensions();
    if region.width == 0 || region.height == 0 || region.x >= fw || region.y >= fh {
        return;
    }
    let w = region.width.min(fw - region.x);
    let h = region.height.min(fh - region.y);
    for t in 0..thickness {
        if w <= 2 * t || h <= 2 * t {
            break;
        }
        let rect = Rect::at((region.x + t) as i32, (region.y + t) as i32)
            .of_size(w - 2 * t, h - 2 * t);
        draw_hollow_rect_mut(frame, rect, color);
    }
}

/// Horizontal motion meter along the bottom edge, color-graded by intensity.
pub fn draw_motion_meter(frame: &mut RgbImage, movement_percent: f64) {
    let (fw, fh) = frame.dimensions();
    if fw < 4 || fh <= METER_HEIGHT {
        return;
    }
    let percent = movement_percent.clamp(0.0, 100.0);
    let fill = ((percent / 100.0) * fw as f64) as u32;
    if fill == 0 {
        return;
    }
    let color = if percent < 30.0 {
        Rgb([0, 200, 0])
    } else if percent < 60.0 {
        Rgb([230, 200, 0])
    } else {
        Rgb([220, 0, 0])
    };
    let rect = Rect::at(0, (fh - METER_HEIGHT) as i32).of_size(fill.min(fw), METER_HEIGHT);
    draw_filled_rect_mut(frame, rect, color);
}

fn movement_color(movement: CameraMovement) -> Rgb<u8> {
    match movement {
        CameraMovement::Stable => Rgb([0, 180, 0]),
        CameraMovement::SlowPan | CameraMovement::SlowTilt => Rgb([150, 200, 0]),
        CameraMovement::FastPan | CameraMovement::FastTilt => Rgb([230, 160, 0]),
        CameraMovement::Shaking => Rgb([220, 0, 0]),
    }
}

/// Camera-status strip along the top edge: color encodes the movement
/// classification, fill length encodes the stability score.
pub fn draw_camera_status(frame: &mut RgbImage, movement: CameraMovement, stability: f64) {
    let (fw, fh) = frame.dimensions();
    if fw < 4 || fh <= STATUS_STRIP_HEIGHT {
        return;
    }
    let fill = ((stability.clamp(0.0, 100.0) / 100.0) * fw as f64) as u32;
    if fill == 0 {
        return;
    }
    let rect = Rect::at(0, 0).of_size(fill.min(fw), STATUS_STRIP_HEIGHT);
    draw_filled_rect_mut(frame, rect, movement_color(movement));
}

/// Stats block in the top-left corner: dark panel with an FPS gauge
/// (current vs. target) and an optimal-state indicator square.
pub fn draw_stats_panel(frame: &mut RgbImage, current_fps: f64, target_fps: f64, optimal: bool) {
    let (fw, fh) = frame.dimensions();
    if fw < PANEL_WIDTH + 2 || fh < PANEL_HEIGHT + STATUS_STRIP_HEIGHT + 2 {
        return;
    }
    let top = (STATUS_STRIP_HEIGHT + 1) as i32;
    draw_filled_rect_mut(
        frame,
        Rect::at(1, top).of_size(PANEL_WIDTH, PANEL_HEIGHT),
        Rgb([30, 30, 30]),
    );

    let ratio = if target_fps > 0.0 {
        (current_fps / target_fps).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge = (ratio * (PANEL_WIDTH - 8) as f64) as u32;
    if gauge > 0 {
        draw_filled_rect_mut(
            frame,
            Rect::at(4, top + 4).of_size(gauge, 4),
            Rgb([0, 180, 220]),
        );
    }

    let indicator = if optimal {
        Rgb([0, 200, 0])
    } else {
        Rgb([220, 0, 0])
    };
    draw_filled_rect_mut(frame, Rect::at(4, top + 11).of_size(4, 4), indicator);
}

/// Fixed "text detected" badge under the stats panel position.
pub fn draw_text_badge(frame: &mut RgbImage) {
    let (fw, fh) = frame.dimensions();
    let top = STATUS_STRIP_HEIGHT + PANEL_HEIGHT + 3;
    if fw < 22 || fh < top + 8 {
        return;
    }
    draw_filled_rect_mut(frame, Rect::at(1, top as i32).of_size(20, 6), TEXT_BADGE_COLOR);
}
