mod camera;

pub use camera::{
    analyze, CameraMotionReport, CameraMovement, MovementVector, MIN_MOVEMENT_FLOOR,
};
