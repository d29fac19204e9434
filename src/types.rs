use heapless::{FnvIndexMap, Vec};
use serde::{Deserialize, Serialize};

/// Decoded signal values of a single observed message, keyed by signal name.
pub type FieldMap = FnvIndexMap<&'static str, f32, 32>;

/// Last observed field values per message name, refreshed by the inbound decoder.
pub type StockValues = FnvIndexMap<&'static str, FieldMap, 16>;

pub const MAX_FRAMES_PER_CYCLE: usize = 16;
pub const MAX_BUTTON_EVENTS: usize = 8;
pub const MAX_PAYLOAD_BYTES: usize = 64;

pub type PayloadBuf = Vec<u8, MAX_PAYLOAD_BYTES>;
pub type FrameList = Vec<OutgoingFrame, MAX_FRAMES_PER_CYCLE>;
pub type ButtonEvents = Vec<ButtonEvent, MAX_BUTTON_EVENTS>;

/// Sequence counter signal name shared by all counter-carrying messages.
pub const COUNTER_FIELD: &str = "COUNTER";
/// Checksum signal name; always stripped before re-pack, the packer recomputes it.
pub const CHECKSUM_FIELD: &str = "CHECKSUM";

pub const MS_TO_KPH: f32 = 3.6;

// Literal bus sentinels. The receiving ECUs interpret these exact values, so they
// must never be coerced to zero or an absent field.
/// "No set speed" on the ACC HUD speed signal (km/h).
pub const SET_SPEED_NONE_KPH: f32 = 327.36;
/// "No acceleration request" on the ACC accel signals (m/s^2).
pub const ACCEL_NONE: f32 = 3.01;
/// "No lead vehicle acceleration estimate" (m/s^2).
pub const LEAD_ACCEL_NONE: f32 = 3.02;
/// "No stopping target" stopping distance (m).
pub const STOPPING_DISTANCE_FREE: f32 = 20.46;
/// Fallback stopping distance when stopping with no measured lead distance (m).
pub const STOPPING_DISTANCE_NO_TARGET: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bus {
    /// Powertrain bus.
    Pt,
    /// Extended / camera bus.
    Cam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LongControlPhase {
    Off,
    Pid,
    Stopping,
    Starting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonEvent {
    Cancel,
    SetCruise,
    ResumeCruise,
    AccelCruise,
    DecelCruise,
    GapAdjust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualAlert {
    None,
    SteerRequired,
    LaneDepartureWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudibleAlert {
    None,
    Prompt,
    PromptRepeat,
    PromptDistracted,
    WarningSoft,
    WarningImmediate,
}

/// Lateral-assist availability reported to the cluster LEDs and lane icons.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LatStatus {
    pub available: bool,
    pub enabled: bool,
    pub active: bool,
}

/// Instrument-cluster directives produced by the planning stack.
#[derive(Debug, Clone, Serialize)]
pub struct HudDirectives {
    /// Cruise set speed, m/s.
    pub set_speed: f32,
    pub lead_visible: bool,
    /// Measured distance to the lead vehicle, m.
    pub lead_distance: Option<f32>,
    /// Lead vehicle acceleration estimate, m/s^2.
    pub lead_accel: Option<f32>,
    /// Driver-selected following-distance setting, 1..=4.
    pub lead_distance_bars: u8,
    pub lanes_visible: bool,
    pub left_lane_visible: bool,
    pub right_lane_visible: bool,
    pub left_lane_depart: bool,
    pub right_lane_depart: bool,
    pub visual_alert: VisualAlert,
    pub audible_alert: AudibleAlert,
    pub lat_status: LatStatus,
}

impl Default for HudDirectives {
    fn default() -> Self {
        Self {
            set_speed: 0.0,
            lead_visible: false,
            lead_distance: None,
            lead_accel: None,
            lead_distance_bars: 2,
            lanes_visible: false,
            left_lane_visible: false,
            right_lane_visible: false,
            left_lane_depart: false,
            right_lane_depart: false,
            visual_alert: VisualAlert::None,
            audible_alert: AudibleAlert::None,
            lat_status: LatStatus::default(),
        }
    }
}

/// High-level driving intent for one control cycle. Produced fresh each cycle by
/// the planning stack; immutable for the duration of the cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DriveIntent {
    /// Desired normalized steering torque, [-1, 1].
    pub torque: f32,
    /// Desired acceleration, m/s^2.
    pub accel: f32,
    pub long_phase: LongControlPhase,
    pub lat_active: bool,
    pub long_active: bool,
    pub cruise_cancel: bool,
    pub cruise_resume: bool,
    pub cruise_override: bool,
    /// Stock-ACC override is armed (about to hand control back to the stock ECU).
    pub stock_acc_override_armed: bool,
    /// Stock-ACC override is active (stock ECU should track our target speed).
    pub stock_acc_override_active: bool,
    /// Stock driver monitoring is in charge; suppress the EPS overlay wave.
    pub stock_driver_monitoring: bool,
    pub button_events: ButtonEvents,
    pub hud: HudDirectives,
}

impl Default for DriveIntent {
    fn default() -> Self {
        Self {
            torque: 0.0,
            accel: 0.0,
            long_phase: LongControlPhase::Off,
            lat_active: false,
            long_active: false,
            cruise_cancel: false,
            cruise_resume: false,
            cruise_override: false,
            stock_acc_override_armed: false,
            stock_acc_override_active: false,
            stock_driver_monitoring: false,
            button_events: Vec::new(),
            hud: HudDirectives::default(),
        }
    }
}

impl DriveIntent {
    pub fn button_pressed(&self, event: ButtonEvent) -> bool {
        self.button_events.iter().any(|be| *be == event)
    }
}

/// Per-cycle read of decoded vehicle state. Owned and refreshed by the inbound
/// decoder; read-only here.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleStateSnapshot {
    /// Ego speed, m/s.
    pub v_ego: f32,
    /// Ego acceleration, m/s^2.
    pub a_ego: f32,
    /// Measured driver torque at the EPS, in torque units.
    pub steering_torque: f32,
    pub brake_pressed: bool,
    pub gas_pressed: bool,
    pub cruise_available: bool,
    pub acc_faulted: bool,
    /// Non-critical car fault (e.g. Emergency Assist active): fault-forward mode.
    pub car_faulted_non_critical: bool,
    pub esp_hold_confirmation: bool,
    pub eps_init_complete: bool,
    /// Radar/ACC variant code echoed into the accel command frames.
    pub acc_type: u8,
    /// Set speed currently held by the stock ACC, km/h.
    pub stock_acc_set_speed: Option<f32>,
    /// The stock ACC is currently overriding (tracking our coerced set speed).
    pub stock_acc_override: bool,
    /// Platform encodes the lead-distance index on the wide scale.
    pub upscale_lead_signal: bool,
    pub stock_values: StockValues,
}

impl Default for VehicleStateSnapshot {
    fn default() -> Self {
        Self {
            v_ego: 0.0,
            a_ego: 0.0,
            steering_torque: 0.0,
            brake_pressed: false,
            gas_pressed: false,
            cruise_available: false,
            acc_faulted: false,
            car_faulted_non_critical: false,
            esp_hold_confirmation: false,
            eps_init_complete: true,
            acc_type: 0,
            stock_acc_set_speed: None,
            stock_acc_override: false,
            upscale_lead_signal: false,
            stock_values: FnvIndexMap::new(),
        }
    }
}

impl VehicleStateSnapshot {
    pub fn observed(&self, message: &str) -> Option<&FieldMap> {
        self.stock_values.get(message)
    }
}

/// Static-per-drive configuration, loaded once from vehicle identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleLimits {
    /// Max commanded torque magnitude, torque units (0.01 Nm).
    pub steer_max: i32,
    /// Max torque increase per steering cycle, torque units.
    pub steer_delta_up: i32,
    /// Max torque decrease per steering cycle, torque units.
    pub steer_delta_down: i32,
    pub steer_driver_allowance: i32,
    pub steer_driver_multiplier: i32,
    pub steer_driver_factor: i32,
    /// EPS rejects uninterrupted steering beyond this many seconds.
    pub steer_time_max_s: f32,
    /// Soft-disable alert threshold, strictly below `steer_time_max_s`.
    pub steer_time_alert_s: f32,
    /// EPS rejects a bit-identical torque held longer than this, seconds.
    pub steer_time_stuck_torque_s: f32,
    /// Half-period of the simulated driver-torque overlay wave, cycles.
    pub ea_overlay_segment_cycles: u64,
    pub accel_min: f32,
    pub accel_max: f32,
    /// Below this ego speed a `Stopping` phase counts as near-stop, m/s.
    pub v_ego_stopping: f32,
    /// Offset subtracted from lead distance for the stopping-distance field, m.
    pub stop_distance_offset: f32,
    /// Steering command cadence, cycles.
    pub steer_step: u64,
    /// Lane-assist HUD cadence, cycles.
    pub ldw_step: u64,
    /// How long an emulated button press is held, cycles.
    pub button_hold_cycles: u64,
    /// Set-speed grid of the stock ACC stepping buttons, km/h.
    pub set_speed_step_kph: f32,
    pub set_speed_min_kph: f32,
    pub set_speed_max_kph: f32,
    /// Control cycle period, seconds.
    pub cycle_period_s: f32,
    pub long_control: bool,
    pub pcm_cruise: bool,
    pub stock_hca_present: bool,
}

impl VehicleLimits {
    /// Production calibration for the MQB platform family.
    pub fn mqb() -> Self {
        Self {
            steer_max: 300,
            steer_delta_up: 4,
            steer_delta_down: 10,
            steer_driver_allowance: 80,
            steer_driver_multiplier: 3,
            steer_driver_factor: 1,
            steer_time_max_s: 360.0,
            steer_time_alert_s: 350.0,
            steer_time_stuck_torque_s: 1.9,
            ea_overlay_segment_cycles: 100,
            accel_min: -3.5,
            accel_max: 2.0,
            v_ego_stopping: 0.5,
            stop_distance_offset: 3.5,
            steer_step: 2,
            ldw_step: 10,
            button_hold_cycles: 5,
            set_speed_step_kph: 1.0,
            set_speed_min_kph: 30.0,
            set_speed_max_kph: 210.0,
            cycle_period_s: 0.01,
            long_control: true,
            pcm_cruise: false,
            stock_hca_present: true,
        }
    }

    /// Cycles after which an unchanged commanded torque must be nudged.
    pub fn stuck_torque_cycles(&self) -> u64 {
        (self.steer_time_stuck_torque_s / self.cycle_period_s).round() as u64
    }

    /// Cycles of uninterrupted steering after which the soft-disable alert raises.
    pub fn steer_alert_cycles(&self) -> u64 {
        (self.steer_time_alert_s / self.cycle_period_s).round() as u64
    }
}

/// One synthesized or relayed bus frame, handed straight to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingFrame {
    pub bus: Bus,
    pub message: &'static str,
    pub payload: PayloadBuf,
}

/// Result of one control cycle: the ordered frame list plus the actuator values
/// actually sent, echoed back to the planning stack.
#[derive(Debug, Default)]
pub struct CycleOutput {
    pub frames: FrameList,
    /// Normalized torque actually commanded, [-1, 1].
    pub torque_applied: f32,
    /// Acceleration actually commanded, m/s^2.
    pub accel_applied: f32,
    /// Uninterrupted-steering timer is approaching the EPS hard limit.
    pub steer_soft_disable_alert: bool,
}

/// Clamp that is total over NaN: a NaN input lands on the lower bound instead of
/// propagating into the bus payload.
pub fn clip(value: f32, lo: f32, hi: f32) -> f32 {
    value.max(lo).min(hi)
}

/// Linear interpolation of `x` between two calibration points, clamped at the ends.
pub fn interp(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    if x <= x0 {
        y0
    } else if x >= x1 {
        y1
    } else {
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }
}
