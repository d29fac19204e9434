//! Steering torque rate limiting and EPS acceptance mitigation.
//!
//! The EPS refuses the assist command unless the commanded torque respects the
//! acceptance envelope:
//!   * never beyond the configured max magnitude,
//!   * bounded rate of change, yielding toward driver input past the allowance,
//!   * never the exact same value for longer than the stuck-torque window,
//!   * never uninterrupted steering beyond the steering time limit.
//! The rack resets the uninterrupted-steering timer after a single cycle of
//! disabled output, so any zero-output cycle clears the timer here as well.

use crate::types::{clip, VehicleLimits};

#[derive(Debug, Clone, Copy)]
pub struct TorqueOutput {
    /// Commanded torque, torque units.
    pub torque: i32,
    /// Whether the assist is actively steering this cycle.
    pub enabled: bool,
}

/// Driver-override torque limiting: bounded magnitude and rate, yielding toward
/// measured driver torque beyond the allowance.
pub fn apply_driver_torque_limits(
    desired: i32,
    last: i32,
    driver_torque: f32,
    limits: &VehicleLimits,
) -> i32 {
    let steer_max = limits.steer_max as f32;
    let allowance = limits.steer_driver_allowance as f32;
    let factor = limits.steer_driver_factor as f32;
    let multiplier = limits.steer_driver_multiplier as f32;

    let driver_max = steer_max + (allowance + driver_torque * factor) * multiplier;
    let driver_min = -steer_max + (-allowance + driver_torque * factor) * multiplier;
    let max_allowed = steer_max.min(driver_max).max(0.0);
    let min_allowed = (-steer_max).max(driver_min).min(0.0);

    let mut apply = clip(desired as f32, min_allowed, max_allowed);

    // Slow the rate when torque grows in magnitude, faster when unwinding.
    let up = limits.steer_delta_up as f32;
    let down = limits.steer_delta_down as f32;
    let last_f = last as f32;
    if last > 0 {
        apply = clip(apply, (last_f - down).max(-up), last_f + up);
    } else {
        apply = clip(apply, last_f - up, (last_f + down).min(up));
    }
    apply.round() as i32
}

#[derive(Debug, Default)]
pub struct TorqueLimiter {
    apply_torque_last: i32,
    cycles_running: u64,
    cycles_same_torque: u64,
    soft_disable_alert: bool,
}

impl TorqueLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One steering-cadence step of the torque state machine.
    pub fn apply(
        &mut self,
        desired_norm: f32,
        driver_torque: f32,
        lat_active: bool,
        eps_ready: bool,
        limits: &VehicleLimits,
    ) -> TorqueOutput {
        let (enabled, torque) = if lat_active && eps_ready {
            let desired = (clip(desired_norm, -1.0, 1.0) * limits.steer_max as f32).round() as i32;
            let mut apply =
                apply_driver_torque_limits(desired, self.apply_torque_last, driver_torque, limits);
            self.cycles_running += limits.steer_step;
            if self.apply_torque_last == apply {
                self.cycles_same_torque += limits.steer_step;
                if self.cycles_same_torque > limits.stuck_torque_cycles() {
                    // Nudge one unit toward zero so the EPS never sees the exact
                    // value outlive its stuck-torque window.
                    apply -= if apply < 0 { -1 } else { 1 };
                    self.cycles_same_torque = 0;
                }
            } else {
                self.cycles_same_torque = 0;
            }
            (apply != 0, apply)
        } else {
            (false, 0)
        };

        if !enabled {
            self.cycles_running = 0;
        }
        self.soft_disable_alert = self.cycles_running > limits.steer_alert_cycles();
        self.apply_torque_last = torque;
        TorqueOutput { torque, enabled }
    }

    /// Last committed torque, torque units.
    pub fn last_torque(&self) -> i32 {
        self.apply_torque_last
    }

    /// Uninterrupted-steering timer is past the alert threshold.
    pub fn soft_disable_alert(&self) -> bool {
        self.soft_disable_alert
    }

    pub fn uninterrupted_cycles(&self) -> u64 {
        self.cycles_running
    }
}

/// Simulated driver-torque overlay for the EPS frame: a low-amplitude triangle
/// wave keyed to the cycle counter, clamped to twice the last commanded torque,
/// folded into the measured driver torque against its sign. Defeats the stock
/// driver-inactivity heuristic while assist torque is flowing.
pub fn eps_overlay_torque(
    cycle: u64,
    driver_torque: f32,
    apply_torque_last: i32,
    stock_driver_monitoring: bool,
    limits: &VehicleLimits,
) -> f32 {
    let segment = limits.ea_overlay_segment_cycles.max(1);
    let phase = cycle % (2 * segment);
    let wave = if phase < segment {
        phase
    } else {
        2 * segment - phase
    } as f32;

    let mut simulated = wave.min((2 * apply_torque_last.abs()) as f32);
    if stock_driver_monitoring {
        simulated = 0.0;
    }
    let sign = if driver_torque >= 0.0 { 1.0 } else { -1.0 };
    let steer_max = limits.steer_max as f32;
    clip(driver_torque - sign * simulated, -steer_max, steer_max)
}
