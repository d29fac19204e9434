//! Per-platform field encodings.
//!
//! Each vehicle sub-platform encodes the same logical commands with different
//! signal tables and checksum variants. The controller selects one codec at
//! construction and holds it as a trait object; it is never re-dispatched per
//! call inside a cycle.

use crate::checksum::ChecksumKind;
use crate::relay::TransformOutcome;
use crate::types::{AudibleAlert, FieldMap, HudDirectives, VisualAlert};

pub mod mqb;

pub use mqb::MqbCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSpec {
    pub name: &'static str,
    pub address: u32,
    pub checksum: ChecksumKind,
}

/// The outgoing message catalog of one platform.
#[derive(Debug)]
pub struct MessageCatalog {
    pub steering: MessageSpec,
    pub eps: MessageSpec,
    pub lka_hud: MessageSpec,
    pub acc_buttons: MessageSpec,
    pub acc_1: MessageSpec,
    pub acc_2: MessageSpec,
    pub tsk: MessageSpec,
    pub acc_hud_1: MessageSpec,
    pub acc_hud_2: MessageSpec,
    pub acc_hud_3: MessageSpec,
}

impl MessageCatalog {
    pub fn all(&self) -> [&MessageSpec; 10] {
        [
            &self.steering,
            &self.eps,
            &self.lka_hud,
            &self.acc_buttons,
            &self.acc_1,
            &self.acc_2,
            &self.tsk,
            &self.acc_hud_1,
            &self.acc_hud_2,
            &self.acc_hud_3,
        ]
    }

    pub fn find(&self, name: &str) -> Option<&MessageSpec> {
        self.all().into_iter().find(|spec| spec.name == name)
    }
}

/// How the cruise-button frame handles its sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode {
    /// Advance the observed counter by one; used when we originate the press.
    Advance,
    /// Leave the observed counter untouched; the relay gate paces emission.
    Stock,
}

#[derive(Debug, Clone, Copy)]
pub struct ButtonsCommand {
    pub counter_mode: CounterMode,
    /// Emulated press code: 0 none, 1 accel step, 2 decel step, 3 resume, 4 set.
    pub buttons: u8,
    pub cancel: bool,
    pub resume: bool,
    pub stock_gap_control: bool,
}

/// Longitudinal command fields shared by both acceleration frames.
#[derive(Debug, Clone, Copy)]
pub struct AccCommand {
    pub acc_type: u8,
    /// Final clamped acceleration, m/s^2.
    pub accel: f32,
    /// ACC control mode code (0/2/3/4/7).
    pub control: u8,
    pub near_stop: bool,
    pub starting: bool,
    pub esp_hold: bool,
    pub lead_accel: Option<f32>,
    pub stopping_distance: Option<f32>,
    pub v_ego: f32,
    pub a_ego: f32,
}

impl AccCommand {
    pub fn enabled(&self) -> bool {
        matches!(self.control, 3 | 4)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccHudCommand {
    pub status: u8,
    pub set_speed_kph: f32,
    pub set_speed_reached: bool,
    pub lead_distance: u16,
    pub distance_bars: u8,
}

impl AccHudCommand {
    pub fn engaged(&self) -> bool {
        matches!(self.status, 3 | 4)
    }
}

/// Field encoders for one platform. All methods are pure over their inputs.
pub trait PlatformCodec: core::fmt::Debug {
    fn catalog(&self) -> &'static MessageCatalog;

    fn acc_control_value(
        &self,
        cruise_available: bool,
        overriding: bool,
        acc_faulted: bool,
        long_active: bool,
    ) -> u8;

    fn acc_hud_status_value(
        &self,
        cruise_available: bool,
        overriding: bool,
        acc_faulted: bool,
        long_active: bool,
    ) -> u8;

    /// Display code for the lane-assist takeover text, 0 when nothing to show.
    fn lka_alert_code(&self, visual: VisualAlert, audible: AudibleAlert) -> u8;

    fn steering_control(&self, values: &mut FieldMap, apply_torque: i32, enabled: bool);
    fn eps_update(&self, values: &mut FieldMap, simulated_torque: f32);
    fn tsk_update(&self, values: &mut FieldMap, stock_acc_1: Option<&FieldMap>)
        -> TransformOutcome;
    fn lka_hud(&self, values: &mut FieldMap, alert_code: u8, hud: &HudDirectives);
    fn acc_buttons(&self, values: &mut FieldMap, cmd: &ButtonsCommand);
    fn acc_accel_1(&self, values: &mut FieldMap, cmd: &AccCommand);
    fn acc_accel_2(&self, values: &mut FieldMap, cmd: &AccCommand);
    fn acc_hud_1(&self, values: &mut FieldMap, cmd: &AccHudCommand);
    fn acc_hud_2(&self, values: &mut FieldMap, cmd: &AccHudCommand);
    fn acc_hud_3(&self, values: &mut FieldMap, cmd: &AccHudCommand);
}

pub(crate) fn set(values: &mut FieldMap, key: &'static str, value: f32) {
    let inserted = values.insert(key, value);
    debug_assert!(inserted.is_ok(), "field map capacity exceeded for `{key}`");
}

pub(crate) fn set_bool(values: &mut FieldMap, key: &'static str, value: bool) {
    set(values, key, if value { 1.0 } else { 0.0 });
}

pub(crate) fn get(values: &FieldMap, key: &str) -> Option<f32> {
    values.get(key).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_an_existing_field_without_consuming_capacity() {
        let mut values = FieldMap::new();
        set(&mut values, "ACC_Status_ACC", 2.0);
        set(&mut values, "ACC_Status_ACC", 3.0);
        assert_eq!(get(&values, "ACC_Status_ACC"), Some(3.0));
        assert_eq!(values.len(), 1);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "field map capacity exceeded")]
    fn set_flags_a_field_dropped_at_capacity() {
        const FILLER: [&str; 32] = [
            "f00", "f01", "f02", "f03", "f04", "f05", "f06", "f07", "f08", "f09", "f10", "f11",
            "f12", "f13", "f14", "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23",
            "f24", "f25", "f26", "f27", "f28", "f29", "f30", "f31",
        ];
        let mut values = FieldMap::new();
        for key in FILLER {
            set(&mut values, key, 0.0);
        }
        set(&mut values, "one_field_too_many", 0.0);
    }
}
