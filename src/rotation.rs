// rotation.rs — 旋转控制器：拖拽旋转 + 自动旋转状态机

use std::time::{Duration, Instant};

use crate::ticker::AutoRotateTicker;

/// Pitch/yaw pair in degrees. Unbounded; only `yaw % 360` matters for display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub pitch: f32,
    pub yaw: f32,
}

impl Orientation {
    pub const ZERO: Orientation = Orientation { pitch: 0.0, yaw: 0.0 };

    #[cfg(test)]
    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }
}

/// Pointer anchor of an open drag, moved to the latest pointer position on every move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    AutoRotating,
    Stopped,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationConfig {
    pub tick_period: Duration,
    pub yaw_step_deg: f32,
    /// Degrees per logical pixel of pointer travel.
    pub drag_sensitivity: f32,
    pub max_catch_up_ticks: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(30),
            yaw_step_deg: 0.5,
            drag_sensitivity: 0.5,
            max_catch_up_ticks: 16,
        }
    }
}

/// Owns the orientation and decides which input source may move it.
///
/// The ticker is live exactly when auto-rotate is on and no drag is open;
/// every transition ends in `sync_ticker` to keep that true.
#[derive(Debug)]
pub struct RotationController {
    config: RotationConfig,
    orientation: Orientation,
    auto_rotate: bool,
    drag: Option<DragSession>,
    ticker: Option<AutoRotateTicker>,
}

impl RotationController {
    pub fn new(config: RotationConfig) -> Self {
        let mut controller = Self {
            config,
            orientation: Orientation::ZERO,
            auto_rotate: true,
            drag: None,
            ticker: None,
        };
        controller.sync_ticker();
        controller
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RotationConfig) {
        let retime = config.tick_period != self.config.tick_period
            || config.max_catch_up_ticks != self.config.max_catch_up_ticks;
        self.config = config;
        if retime {
            // 周期变了，重建定时器
            self.ticker = None;
            self.sync_ticker();
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn state(&self) -> RotationState {
        match (self.drag.is_some(), self.auto_rotate) {
            (true, _) => RotationState::Dragging,
            (false, true) => RotationState::AutoRotating,
            (false, false) => RotationState::Stopped,
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.auto_rotate = false;
        self.drag = Some(DragSession { x, y });
        log::debug!("drag started at ({x}, {y})");
        self.sync_ticker();
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let Some(anchor) = self.drag.as_mut() else {
            return;
        };
        let dx = x - anchor.x;
        let dy = y - anchor.y;
        anchor.x = x;
        anchor.y = y;

        let s = self.config.drag_sensitivity;
        self.orientation.pitch += dy * s;
        self.orientation.yaw += dx * s;
    }

    pub fn pointer_up(&mut self) {
        self.end_drag();
    }

    pub fn pointer_leave(&mut self) {
        self.end_drag();
    }

    pub fn reset(&mut self) {
        self.orientation = Orientation::ZERO;
        self.auto_rotate = true;
        self.drag = None;
        log::debug!("rotation reset");
        self.sync_ticker();
    }

    pub fn toggle_auto_rotate(&mut self) {
        let on = !self.auto_rotate;
        self.set_auto_rotate(on);
    }

    /// While dragging only the flag changes; it decides the state once the drag ends.
    pub fn set_auto_rotate(&mut self, on: bool) {
        if self.auto_rotate == on {
            return;
        }
        self.auto_rotate = on;
        log::debug!("auto-rotate {}", if on { "on" } else { "off" });
        self.sync_ticker();
    }

    /// One tick. Ignored unless the ticker is live.
    ///
    /// The event loop drives ticks through [`advance`](Self::advance), which
    /// calls this once per due period.
    pub fn tick(&mut self) {
        if self.ticker.is_some() {
            self.apply_tick();
        }
    }

    /// Polls the owned ticker and applies every due tick. Returns how many were applied.
    pub fn advance(&mut self, now: Instant) -> u32 {
        let Some(ticker) = self.ticker.as_mut() else {
            return 0;
        };
        let due = ticker.poll(now);
        for _ in 0..due {
            self.tick();
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.ticker.as_ref().and_then(AutoRotateTicker::deadline)
    }

    fn apply_tick(&mut self) {
        self.orientation.yaw = (self.orientation.yaw + self.config.yaw_step_deg) % 360.0;
    }

    fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            log::debug!("drag ended");
            self.sync_ticker();
        }
    }

    fn sync_ticker(&mut self) {
        let want = self.auto_rotate && self.drag.is_none();
        match (want, self.ticker.is_some()) {
            (true, false) => {
                self.ticker = Some(AutoRotateTicker::new(
                    self.config.tick_period,
                    self.config.max_catch_up_ticks,
                ));
            }
            (false, true) => {
                self.ticker = None;
            }
            _ => {}
        }
    }
}

impl Default for RotationController {
    fn default() -> Self {
        Self::new(RotationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn assert_ticker_invariant(c: &RotationController) {
        assert_eq!(c.is_ticking(), c.auto_rotate() && !c.is_dragging());
    }

    #[test]
    fn starts_auto_rotating_at_origin() {
        let c = RotationController::default();
        assert_eq!(c.state(), RotationState::AutoRotating);
        assert_eq!(c.orientation(), Orientation::ZERO);
        assert!(c.auto_rotate());
        assert!(c.is_ticking());
    }

    #[test]
    fn ten_ticks_yaw_five_degrees() {
        let mut c = RotationController::default();
        for _ in 0..10 {
            c.tick();
        }
        assert_eq!(c.orientation(), Orientation::new(0.0, 5.0));
    }

    #[test]
    fn yaw_wraps_after_full_turn() {
        let mut c = RotationController::default();
        c.pointer_down(0.0, 0.0);
        c.pointer_move(25.0, 14.0);
        c.pointer_up();
        c.toggle_auto_rotate();
        let start = c.orientation();
        assert_eq!(start, Orientation::new(7.0, 12.5));

        for _ in 0..720 {
            c.tick();
            assert_eq!(c.orientation().pitch, start.pitch);
        }
        assert_eq!(c.orientation(), start);
    }

    #[test]
    fn drag_scenario() {
        let mut c = RotationController::default();
        c.pointer_down(100.0, 100.0);
        c.pointer_move(110.0, 104.0);
        c.pointer_up();

        assert_eq!(c.orientation(), Orientation::new(2.0, 5.0));
        assert!(!c.auto_rotate());
        assert_eq!(c.state(), RotationState::Stopped);
        assert_ticker_invariant(&c);
    }

    #[test]
    fn drag_is_incremental_regardless_of_batching() {
        let path = [(3.0, -2.0), (10.0, 7.0), (-4.0, 12.0), (20.0, 20.0)];

        let mut fine = RotationController::default();
        fine.pointer_down(0.0, 0.0);
        for (x, y) in path {
            fine.pointer_move(x, y);
        }
        fine.pointer_up();

        let mut coarse = RotationController::default();
        coarse.pointer_down(0.0, 0.0);
        coarse.pointer_move(20.0, 20.0);
        coarse.pointer_up();

        assert_eq!(fine.orientation(), coarse.orientation());
        assert_eq!(fine.orientation(), Orientation::new(10.0, 10.0));
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let mut c = RotationController::default();
        c.pointer_move(50.0, 50.0);
        c.pointer_down(0.0, 0.0);
        c.pointer_leave();
        c.pointer_move(80.0, 80.0);
        assert_eq!(c.orientation(), Orientation::ZERO);
    }

    #[test]
    fn pointer_down_stops_ticker() {
        let t0 = Instant::now();
        let mut c = RotationController::default();
        c.advance(t0);
        assert_eq!(c.advance(t0 + ms(30)), 1);

        c.pointer_down(0.0, 0.0);
        assert!(!c.is_ticking());
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.advance(t0 + ms(300)), 0);
        c.tick();
        assert_eq!(c.orientation(), Orientation::new(0.0, 0.5));

        c.pointer_up();
        assert_eq!(c.advance(t0 + ms(600)), 0);
        assert_eq!(c.orientation(), Orientation::new(0.0, 0.5));
    }

    #[test]
    fn reset_from_any_state() {
        let mut dragging = RotationController::default();
        dragging.pointer_down(0.0, 0.0);
        dragging.pointer_move(40.0, -12.0);

        let mut stopped = RotationController::default();
        stopped.toggle_auto_rotate();

        let mut rotating = RotationController::default();
        rotating.tick();

        for mut c in [dragging, stopped, rotating] {
            c.reset();
            assert_eq!(c.orientation(), Orientation::ZERO);
            assert!(c.auto_rotate());
            assert_eq!(c.state(), RotationState::AutoRotating);
            c.reset();
            assert_eq!(c.state(), RotationState::AutoRotating);
            assert_ticker_invariant(&c);
        }
    }

    #[test]
    fn toggle_never_touches_orientation() {
        let mut c = RotationController::default();
        c.tick();
        c.tick();
        let before = c.orientation();

        c.toggle_auto_rotate();
        assert_eq!(c.state(), RotationState::Stopped);
        assert!(!c.is_ticking());
        c.tick();
        c.toggle_auto_rotate();
        assert_eq!(c.state(), RotationState::AutoRotating);
        assert_eq!(c.orientation(), before);
        assert_ticker_invariant(&c);
    }

    #[test]
    fn toggle_during_drag_decides_post_drag_state() {
        let mut c = RotationController::default();
        c.pointer_down(0.0, 0.0);
        c.toggle_auto_rotate();
        assert!(c.auto_rotate());
        assert_eq!(c.state(), RotationState::Dragging);
        assert!(!c.is_ticking());

        c.pointer_up();
        assert_eq!(c.state(), RotationState::AutoRotating);
        assert!(c.is_ticking());
    }

    #[test]
    fn at_most_one_ticker_across_repeated_commands() {
        let t0 = Instant::now();
        let mut c = RotationController::default();
        c.advance(t0);
        for _ in 0..5 {
            c.set_auto_rotate(true);
            assert_ticker_invariant(&c);
        }
        // 重复开启不会重置已有的计时
        assert_eq!(c.next_deadline(), Some(t0 + ms(30)));

        for _ in 0..5 {
            c.toggle_auto_rotate();
            assert_ticker_invariant(&c);
        }
        assert_eq!(c.state(), RotationState::Stopped);
    }

    #[test]
    fn set_config_restarts_live_ticker() {
        let t0 = Instant::now();
        let mut c = RotationController::default();
        c.advance(t0);

        c.set_config(RotationConfig {
            tick_period: ms(10),
            yaw_step_deg: 2.0,
            ..RotationConfig::default()
        });
        assert!(c.is_ticking());
        assert_eq!(c.next_deadline(), None);

        c.advance(t0);
        assert_eq!(c.advance(t0 + ms(20)), 2);
        assert_eq!(c.orientation(), Orientation::new(0.0, 4.0));
    }

    #[test]
    fn set_config_keeps_phase_when_timing_unchanged() {
        let t0 = Instant::now();
        let mut c = RotationController::default();
        c.advance(t0);

        c.set_config(RotationConfig {
            drag_sensitivity: 1.0,
            ..RotationConfig::default()
        });
        assert_eq!(c.next_deadline(), Some(t0 + ms(30)));
    }
}
