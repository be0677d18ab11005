// viewer.rs — 预览窗口的视图状态（控制器 + 显示缓动 + 缩放）

use std::time::{Duration, Instant};

use egui::CursorIcon;

use crate::config::PreviewConfig;
use crate::rotation::{Orientation, RotationConfig, RotationController, RotationState};
use crate::transition::DisplayTransition;

/// Frame interval requested while the display transition is still moving.
const TRANSITION_FRAME: Duration = Duration::from_millis(16);
const ZOOM_STEP: f32 = 0.1;

pub struct PreviewViewer {
    pub controller: RotationController,
    transition: DisplayTransition,
    last_update: Option<Instant>,
    pub zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    default_drag_sensitivity: f32,
    pub is_fullscreen: bool,
}

impl PreviewViewer {
    pub fn new(cfg: &PreviewConfig) -> Self {
        let controller = RotationController::new(cfg.rotation());
        let transition = DisplayTransition::new(cfg.transition(), controller.orientation());
        Self {
            controller,
            transition,
            last_update: None,
            zoom: 1.0f32.clamp(cfg.min_zoom, cfg.max_zoom),
            min_zoom: cfg.min_zoom,
            max_zoom: cfg.max_zoom,
            default_drag_sensitivity: cfg.drag_sensitivity,
            is_fullscreen: false,
        }
    }

    /// Orientation to draw this frame.
    pub fn shown(&self) -> Orientation {
        self.transition.shown()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.controller.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.controller.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    pub fn pointer_leave(&mut self) {
        self.controller.pointer_leave();
    }

    pub fn reset(&mut self) {
        self.controller.reset();
        self.zoom = 1.0f32.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn toggle_auto_rotate(&mut self) {
        self.controller.toggle_auto_rotate();
    }

    /// Wheel input in lines; positive zooms in.
    pub fn scroll(&mut self, lines: f32) {
        self.zoom = (self.zoom + lines * ZOOM_STEP).clamp(self.min_zoom, self.max_zoom);
    }

    pub fn drag_sensitivity(&self) -> f32 {
        self.controller.config().drag_sensitivity
    }

    pub fn default_drag_sensitivity(&self) -> f32 {
        self.default_drag_sensitivity
    }

    pub fn set_drag_sensitivity(&mut self, s: f32) {
        let cfg = RotationConfig {
            drag_sensitivity: s,
            ..*self.controller.config()
        };
        self.controller.set_config(cfg);
    }

    /// Advances ticker and transition to `now`. Returns whether the frame changed.
    ///
    /// The transition step is capped at one frame: after an idle gap
    /// (`ControlFlow::Wait`) the first update still starts the ease instead
    /// of landing on the target.
    pub fn update(&mut self, now: Instant) -> bool {
        let ticks = self.controller.advance(now);
        let dt = self
            .last_update
            .map(|t| now.saturating_duration_since(t).min(TRANSITION_FRAME))
            .unwrap_or_default();
        self.last_update = Some(now);

        let before = self.transition.shown();
        let after = self.transition.update(
            self.controller.orientation(),
            dt,
            self.controller.is_dragging(),
        );
        ticks > 0 || before != after
    }

    /// Next instant the host should wake up, or `None` to sleep until input.
    pub fn wake_at(&self, now: Instant) -> Option<Instant> {
        // 新建的定时器还没上弦，需要立刻 update 一次
        if self.controller.is_ticking() && self.controller.next_deadline().is_none() {
            return Some(now);
        }
        let frame = (!self.transition.is_settled(self.controller.orientation()))
            .then(|| now + TRANSITION_FRAME);
        match (self.controller.next_deadline(), frame) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn toggle_label_key(&self) -> &'static str {
        if self.controller.auto_rotate() {
            "view.stop_rotate"
        } else {
            "view.auto_rotate"
        }
    }

    /// Grab over the preview, grabbing while a drag session is open.
    pub fn cursor_icon(&self) -> CursorIcon {
        if self.controller.is_dragging() {
            CursorIcon::Grabbing
        } else {
            CursorIcon::Grab
        }
    }

    pub fn state_label_key(&self) -> &'static str {
        match self.controller.state() {
            RotationState::AutoRotating => "status.auto_rotating",
            RotationState::Stopped => "status.stopped",
            RotationState::Dragging => "status.dragging",
        }
    }
}
