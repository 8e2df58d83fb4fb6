//! Canvas Host Contract
//!
//! Camera and input-surface operations the core needs from the canvas
//! engine: focus/zoom on a rectangle, screen↔page coordinate mapping and
//! re-dispatching wheel input on the host's interaction surface.
//!
//! [`HeadlessCanvas`] implements the contract without a renderer. It keeps a
//! camera (`screen = (page + camera) * zoom`) and records every request so the
//! simulator and tests can observe what the core asked for.

use crate::models::{Point, Rect};
use parking_lot::Mutex;
use std::time::Duration;

/// Wheel input to replay on the host's interaction surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    /// Screen-space position of the pointer
    pub position: Point,
    pub delta_y: f64,
    /// Pinch gestures arrive as ctrl+wheel
    pub ctrl_key: bool,
}

/// A camera focus request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRequest {
    pub bounds: Rect,
    pub zoom: f64,
    pub animation: Duration,
}

/// Camera and input operations of the canvas engine
pub trait CanvasHost: Send + Sync {
    /// Current camera zoom.
    fn zoom_level(&self) -> f64;

    /// Animate the camera onto `bounds` at `zoom`.
    fn zoom_to_bounds(&self, bounds: Rect, zoom: f64, animation: Duration);

    fn screen_to_page(&self, point: Point) -> Point;

    fn page_to_screen(&self, point: Point) -> Point;

    /// Replay a wheel event on the canvas interaction surface.
    fn dispatch_wheel(&self, input: WheelInput);
}

#[derive(Debug, Clone, Copy)]
struct Camera {
    x: f64,
    y: f64,
    z: f64,
}

/// Renderer-less canvas host
pub struct HeadlessCanvas {
    viewport: (f64, f64),
    camera: Mutex<Camera>,
    zoom_requests: Mutex<Vec<ZoomRequest>>,
    wheel_inputs: Mutex<Vec<WheelInput>>,
}

impl Default for HeadlessCanvas {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

impl HeadlessCanvas {
    /// Host with a viewport of the given screen size, camera at the origin
    /// and zoom 1.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: (width, height),
            camera: Mutex::new(Camera {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            }),
            zoom_requests: Mutex::new(Vec::new()),
            wheel_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Place the camera explicitly.
    pub fn set_camera(&self, x: f64, y: f64, zoom: f64) {
        *self.camera.lock() = Camera { x, y, z: zoom };
    }

    pub fn zoom_requests(&self) -> Vec<ZoomRequest> {
        self.zoom_requests.lock().clone()
    }

    pub fn wheel_inputs(&self) -> Vec<WheelInput> {
        self.wheel_inputs.lock().clone()
    }
}

impl CanvasHost for HeadlessCanvas {
    fn zoom_level(&self) -> f64 {
        self.camera.lock().z
    }

    fn zoom_to_bounds(&self, bounds: Rect, zoom: f64, animation: Duration) {
        {
            let mut camera = self.camera.lock();
            camera.z = zoom;
            camera.x = self.viewport.0 / (2.0 * zoom) - (bounds.x + bounds.w / 2.0);
            camera.y = self.viewport.1 / (2.0 * zoom) - (bounds.y + bounds.h / 2.0);
        }
        self.zoom_requests.lock().push(ZoomRequest {
            bounds,
            zoom,
            animation,
        });
    }

    fn screen_to_page(&self, point: Point) -> Point {
        let camera = self.camera.lock();
        Point::new(point.x / camera.z - camera.x, point.y / camera.z - camera.y)
    }

    fn page_to_screen(&self, point: Point) -> Point {
        let camera = self.camera.lock();
        Point::new((point.x + camera.x) * camera.z, (point.y + camera.y) * camera.z)
    }

    fn dispatch_wheel(&self, input: WheelInput) {
        if input.ctrl_key && input.delta_y != 0.0 {
            let anchor = self.screen_to_page(input.position);
            let mut camera = self.camera.lock();
            let factor = if input.delta_y < 0.0 { 1.1 } else { 1.0 / 1.1 };
            camera.z = (camera.z * factor).clamp(0.05, 8.0);
            // Keep the page point under the pointer fixed.
            camera.x = input.position.x / camera.z - anchor.x;
            camera.y = input.position.y / camera.z - anchor.y;
        }
        self.wheel_inputs.lock().push(input);
    }
}
