//! Longitudinal command synthesis and lead-distance display encoding.

use crate::platform::PlatformCodec;
use crate::types::{
    clip, ButtonEvent, DriveIntent, LongControlPhase, VehicleLimits, VehicleStateSnapshot,
};

/// Cycle-scoped longitudinal plan threaded into the acceleration, status and
/// HUD frames.
#[derive(Debug, Clone, Copy)]
pub struct LongPlan {
    /// Final clamped acceleration, m/s^2; 0 unless active and not overriding.
    pub accel: f32,
    /// ACC control mode code: 7 faulted, 4 overriding, 3 active, 2 available, 0 off.
    pub control: u8,
    pub active: bool,
    pub overriding: bool,
    pub cancel_pressed: bool,
    pub near_stop: bool,
    pub starting: bool,
    pub esp_hold: bool,
    pub lead_accel: Option<f32>,
    pub stopping_distance: Option<f32>,
}

impl LongPlan {
    pub fn compute(
        intent: &DriveIntent,
        snapshot: &VehicleStateSnapshot,
        limits: &VehicleLimits,
        codec: &dyn PlatformCodec,
    ) -> Self {
        let cancel_pressed = intent.button_pressed(ButtonEvent::Cancel);

        // The extra conditions keep the downstream safety filter from dropping
        // frames; the stock ACC faults after a run of missing messages.
        let active = intent.long_active && !snapshot.brake_pressed && !cancel_pressed;
        let overriding = (intent.cruise_override || (active && snapshot.gas_pressed))
            && !snapshot.brake_pressed
            && !cancel_pressed;
        let control = codec.acc_control_value(
            snapshot.cruise_available,
            overriding,
            snapshot.acc_faulted,
            active,
        );

        let accel = if active && !overriding {
            clip(intent.accel, limits.accel_min, limits.accel_max)
        } else {
            0.0
        };

        let stopping = intent.long_phase == LongControlPhase::Stopping;
        let near_stop = stopping && snapshot.v_ego < limits.v_ego_stopping;
        let starting = intent.long_phase == LongControlPhase::Pid
            && (snapshot.esp_hold_confirmation || snapshot.v_ego < limits.v_ego_stopping);

        let lead_accel = intent.hud.lead_accel.filter(|a| !a.is_nan());
        let stopping_distance = intent
            .hud
            .lead_distance
            .map(|d| (d - limits.stop_distance_offset).max(0.0));

        Self {
            accel,
            control,
            active,
            overriding,
            cancel_pressed,
            near_stop,
            starting,
            esp_hold: snapshot.esp_hold_confirmation,
            lead_accel,
            stopping_distance,
        }
    }
}

// Following-time calibration window mapped onto the display scale.
const MIN_RELATIVE_TIME_S: f32 = 0.8333;
const MAX_RELATIVE_TIME_S: f32 = 3.1667;
/// Speed floor for the following-time division near standstill.
const V_EGO_FLOOR: f32 = 2.5;

/// Hysteresis filter mapping continuous following distance onto the discrete
/// cluster display index.
#[derive(Debug, Default)]
pub struct LeadDistanceFilter {
    last_value: f32,
}

impl LeadDistanceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(
        &mut self,
        v_ego: f32,
        lead_visible: bool,
        lead_distance: Option<f32>,
        upscale: bool,
    ) -> u16 {
        let (min_value, max_value) = if upscale { (64.0, 1023.0) } else { (1.0, 15.0) };

        match lead_distance {
            Some(distance) if distance > 0.0 => {
                let t_lead = distance / v_ego.max(V_EGO_FLOOR);
                let fraction =
                    (t_lead - MIN_RELATIVE_TIME_S) / (MAX_RELATIVE_TIME_S - MIN_RELATIVE_TIME_S);
                let mut value = clip(fraction, 0.0, 1.0) * (max_value - min_value) + min_value;
                // Hysteresis against oscillation around a bin boundary.
                if (value - self.last_value).abs() > 0.5 {
                    self.last_value = value;
                } else {
                    value = self.last_value;
                }
                value.round() as u16
            }
            _ => {
                if lead_visible {
                    max_value as u16
                } else {
                    0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn following_time_maps_onto_display_scale() {
        let mut filter = LeadDistanceFilter::new();
        // 20 m at 10 m/s: 2.0 s following time, half way up the window.
        let value = filter.encode(10.0, true, Some(20.0), false);
        assert_eq!(value, 8);
        // Saturates at the top of the window.
        let mut filter = LeadDistanceFilter::new();
        assert_eq!(filter.encode(10.0, true, Some(40.0), false), 15);
    }

    #[test]
    fn hysteresis_repeats_previous_index() {
        let mut filter = LeadDistanceFilter::new();
        let first = filter.encode(10.0, true, Some(20.0), false);
        // A nudge below the 0.5 threshold keeps the previous value exactly.
        let second = filter.encode(10.0, true, Some(20.05), false);
        assert_eq!(first, second);
        // A large change moves the index.
        let third = filter.encode(10.0, true, Some(30.0), false);
        assert_ne!(first, third);
    }

    #[test]
    fn no_lead_distance_uses_visibility_fallback() {
        let mut filter = LeadDistanceFilter::new();
        assert_eq!(filter.encode(10.0, true, None, false), 15);
        assert_eq!(filter.encode(10.0, false, None, false), 0);
        assert_eq!(filter.encode(10.0, true, None, true), 1023);
    }

    #[test]
    fn speed_floor_avoids_divide_by_zero_at_standstill() {
        let mut filter = LeadDistanceFilter::new();
        let value = filter.encode(0.0, true, Some(10.0), false);
        // 10 m at the 2.5 m/s floor: 4.0 s following time, clamped to max.
        assert_eq!(value, 15);
    }
}
