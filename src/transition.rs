// transition.rs — 显示用的缓动：让画面平滑地追上控制器的角度

use std::time::Duration;

use crate::rotation::Orientation;

const SETTLE_EPSILON_DEG: f32 = 0.01;

/// Eases the displayed orientation toward the controller's orientation.
///
/// Snaps while dragging. Yaw follows the shortest arc so the `% 360` wrap of
/// an auto-rotate tick does not spin the cube backwards.
#[derive(Debug, Clone)]
pub struct DisplayTransition {
    duration: Duration,
    shown: Orientation,
}

impl DisplayTransition {
    pub fn new(duration: Duration, start: Orientation) -> Self {
        Self {
            duration,
            shown: start,
        }
    }

    pub fn shown(&self) -> Orientation {
        self.shown
    }

    pub fn snap(&mut self, target: Orientation) {
        self.shown = target;
    }

    pub fn is_settled(&self, target: Orientation) -> bool {
        (target.pitch - self.shown.pitch).abs() < SETTLE_EPSILON_DEG
            && shortest_arc(self.shown.yaw, target.yaw).abs() < SETTLE_EPSILON_DEG
    }

    pub fn update(&mut self, target: Orientation, dt: Duration, dragging: bool) -> Orientation {
        if dragging || self.duration.is_zero() {
            self.snap(target);
            return self.shown;
        }

        // 0.1s 的 ease-out：按 duration/4 作为时间常数做指数逼近，duration 结束时约剩 2%
        let tau = self.duration.as_secs_f32() / 4.0;
        let k = 1.0 - (-dt.as_secs_f32() / tau).exp();

        let d_pitch = target.pitch - self.shown.pitch;
        let d_yaw = shortest_arc(self.shown.yaw, target.yaw);

        self.shown.pitch += d_pitch * k;
        self.shown.yaw += d_yaw * k;

        if self.is_settled(target) {
            self.snap(target);
        }
        self.shown
    }
}

/// Signed difference `to - from` folded into `[-180, 180)`.
fn shortest_arc(from: f32, to: f32) -> f32 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}
