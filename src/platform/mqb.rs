//! MQB signal tables and field encoders.

use super::{
    get, set, set_bool, AccCommand, AccHudCommand, ButtonsCommand, CounterMode, MessageCatalog,
    MessageSpec, PlatformCodec,
};
use crate::checksum::ChecksumKind;
use crate::relay::TransformOutcome;
use crate::types::{
    clip, interp, AudibleAlert, FieldMap, HudDirectives, VisualAlert, ACCEL_NONE, COUNTER_FIELD,
    LEAD_ACCEL_NONE, SET_SPEED_NONE_KPH, STOPPING_DISTANCE_FREE, STOPPING_DISTANCE_NO_TARGET,
};

pub static MQB_CATALOG: MessageCatalog = MessageCatalog {
    steering: MessageSpec {
        name: "HCA_01",
        address: 0x126,
        checksum: ChecksumKind::Crc8h2f,
    },
    eps: MessageSpec {
        name: "LH_EPS_03",
        address: 0x09F,
        checksum: ChecksumKind::Crc8h2f,
    },
    lka_hud: MessageSpec {
        name: "LDW_02",
        address: 0x30B,
        checksum: ChecksumKind::Crc8h2f,
    },
    acc_buttons: MessageSpec {
        name: "GRA_ACC_01",
        address: 0x12B,
        checksum: ChecksumKind::Crc8h2f,
    },
    acc_1: MessageSpec {
        name: "ACC_06",
        address: 0x122,
        checksum: ChecksumKind::Crc8h2f,
    },
    acc_2: MessageSpec {
        name: "ACC_07",
        address: 0x12E,
        checksum: ChecksumKind::Crc8h2f,
    },
    tsk: MessageSpec {
        name: "TSK_06",
        address: 0x120,
        checksum: ChecksumKind::Crc8h2f,
    },
    acc_hud_1: MessageSpec {
        name: "ACC_02",
        address: 0x30C,
        checksum: ChecksumKind::Crc8h2f,
    },
    acc_hud_2: MessageSpec {
        name: "ACC_04",
        address: 0x324,
        checksum: ChecksumKind::Crc8h2f,
    },
    acc_hud_3: MessageSpec {
        name: "ACC_13",
        address: 0x65F,
        checksum: ChecksumKind::Crc8h2f,
    },
};

// LDW_02 takeover text codes.
const LDW_TAKE_OVER_SILENT: u8 = 8;
const LDW_TAKE_OVER_CHIME: u8 = 7;
const LDW_TAKE_OVER_URGENT: u8 = 4;

#[derive(Debug, Default)]
pub struct MqbCodec;

impl MqbCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Lane icon state: 0 unavailable, 1 standby, 2 outline, 3 tracking.
fn lernmodus_value(available: bool, active: bool, lane_visible: bool, lane_depart: bool) -> f32 {
    if lane_depart {
        2.0
    } else if !available {
        0.0
    } else if active {
        if lane_visible {
            3.0
        } else {
            2.0
        }
    } else {
        1.0
    }
}

impl PlatformCodec for MqbCodec {
    fn catalog(&self) -> &'static MessageCatalog {
        &MQB_CATALOG
    }

    fn acc_control_value(
        &self,
        cruise_available: bool,
        overriding: bool,
        acc_faulted: bool,
        long_active: bool,
    ) -> u8 {
        if acc_faulted {
            7
        } else if overriding {
            4
        } else if long_active {
            3
        } else if cruise_available {
            2
        } else {
            0
        }
    }

    fn acc_hud_status_value(
        &self,
        cruise_available: bool,
        overriding: bool,
        acc_faulted: bool,
        long_active: bool,
    ) -> u8 {
        // Happens to match the control value on this platform.
        self.acc_control_value(cruise_available, overriding, acc_faulted, long_active)
    }

    fn lka_alert_code(&self, visual: VisualAlert, audible: AudibleAlert) -> u8 {
        match visual {
            VisualAlert::SteerRequired | VisualAlert::LaneDepartureWarning => match audible {
                AudibleAlert::None
                | AudibleAlert::Prompt
                | AudibleAlert::PromptRepeat
                | AudibleAlert::PromptDistracted => LDW_TAKE_OVER_SILENT,
                AudibleAlert::WarningImmediate => LDW_TAKE_OVER_URGENT,
                AudibleAlert::WarningSoft => LDW_TAKE_OVER_CHIME,
            },
            VisualAlert::None => 0,
        }
    }

    fn steering_control(&self, values: &mut FieldMap, apply_torque: i32, enabled: bool) {
        if get(values, "EA_ACC_Wunschgeschwindigkeit").is_none() {
            set(values, "EA_ACC_Wunschgeschwindigkeit", SET_SPEED_NONE_KPH);
        }
        set(values, "HCA_01_Status_HCA", if enabled { 5.0 } else { 3.0 });
        set(values, "HCA_01_LM_Offset", apply_torque.abs() as f32);
        set_bool(values, "HCA_01_LM_OffSign", apply_torque < 0);
        set(values, "HCA_01_Vib_Freq", 18.0);
        set_bool(values, "HCA_01_Sendestatus", enabled);
    }

    fn eps_update(&self, values: &mut FieldMap, simulated_torque: f32) {
        // Absolute driver torque input and sign, with the inactivity overlay folded in.
        set(values, "EPS_Lenkmoment", simulated_torque.abs());
        set_bool(values, "EPS_VZ_Lenkmoment", simulated_torque < 0.0);
    }

    fn tsk_update(
        &self,
        values: &mut FieldMap,
        stock_acc_1: Option<&FieldMap>,
    ) -> TransformOutcome {
        // Simulate the drivetrain coordinator confirming the stock ACC status.
        // Without a stock acceleration frame there is nothing to reconcile against.
        let Some(acc_1) = stock_acc_1 else {
            return TransformOutcome::Skip;
        };
        let (Some(actual_status), Some(stock_status), Some(stock_accel), Some(stock_band)) = (
            get(values, "TSK_Status"),
            get(acc_1, "ACC_Status_ACC"),
            get(acc_1, "ACC_Sollbeschleunigung_02"),
            get(acc_1, "ACC_zul_Regelabw_unten"),
        ) else {
            return TransformOutcome::Skip;
        };

        let actual = actual_status as u8;
        let stock = stock_status as u8;
        let simulated = if !matches!(actual, 2..=5) {
            actual_status
        } else if matches!(stock, 0 | 2) || (matches!(stock, 3..=5) && stock_accel > 3.005) {
            // Standby, init, or active with no accel request.
            2.0
        } else if matches!(stock, 1 | 3..=5) {
            actual_status
        } else {
            // Fault codes pass through.
            stock_status
        };
        set(values, "TSK_Status", simulated);
        set(values, "TSK_zul_Regelabw", stock_band);
        TransformOutcome::Emit
    }

    fn lka_hud(&self, values: &mut FieldMap, alert_code: u8, hud: &HudDirectives) {
        let lat = hud.lat_status;
        let left_visible = hud.lanes_visible && hud.left_lane_visible;
        let right_visible = hud.lanes_visible && hud.right_lane_visible;
        set_bool(values, "LDW_Status_LED_gelb", lat.enabled && !lat.active);
        set_bool(values, "LDW_Status_LED_gruen", lat.active);
        set(
            values,
            "LDW_Lernmodus_links",
            lernmodus_value(lat.available, lat.active, left_visible, hud.left_lane_depart),
        );
        set(
            values,
            "LDW_Lernmodus_rechts",
            lernmodus_value(lat.available, lat.active, right_visible, hud.right_lane_depart),
        );
        if alert_code > 0 {
            set(values, "LDW_Texte", alert_code as f32);
        }
    }

    fn acc_buttons(&self, values: &mut FieldMap, cmd: &ButtonsCommand) {
        let accel_cruise = cmd.buttons == 1;
        let decel_cruise = cmd.buttons == 2;
        let resume_cruise = cmd.buttons == 3;
        let set_cruise = cmd.buttons == 4;

        if cmd.counter_mode == CounterMode::Advance {
            // Mask to the counter nibble first; a malformed stock value must not
            // overflow the advance.
            let counter = get(values, COUNTER_FIELD).unwrap_or(0.0) as u8 & 0x0F;
            set(values, COUNTER_FIELD, f32::from((counter + 1) % 16));
        }

        set_bool(values, "GRA_Abbrechen", cmd.cancel);
        set_bool(values, "GRA_Tip_Wiederaufnahme", cmd.resume || resume_cruise);
        set_bool(values, "GRA_Tip_Setzen", set_cruise);
        set_bool(values, "GRA_Tip_Runter", decel_cruise);
        set_bool(values, "GRA_Tip_Hoch", accel_cruise);

        if !cmd.stock_gap_control {
            set(values, "GRA_Verstellung_Zeitluecke", 0.0);
        }
    }

    fn acc_accel_1(&self, values: &mut FieldMap, cmd: &AccCommand) {
        let enabled = cmd.enabled();

        let startstop: f32 = if enabled && !cmd.esp_hold {
            if cmd.starting {
                2.0
            } else {
                1.0
            }
        } else {
            0.0
        };

        let pos_jerk = if !enabled {
            0.0
        } else if cmd.esp_hold {
            4.0
        } else if cmd.near_stop {
            2.0
        } else {
            let floor = if cmd.lead_accel.is_some() { 0.6 } else { 0.3 };
            let jerk = interp(cmd.v_ego, 4.0, 6.0, 1.8, floor);
            // Best-effort floor so the bound never forbids the requested decel.
            jerk.max(-cmd.a_ego + 0.3)
        };

        let not_stopping = enabled && !cmd.near_stop;
        // The stock radar may know better about start/stop transitions.
        let stock_startstop = get(values, "ACC_StartStopp_Info").unwrap_or(0.0);
        let counter = get(values, COUNTER_FIELD);

        values.clear();
        if let Some(counter) = counter {
            set(values, COUNTER_FIELD, counter);
        }
        set(values, "ACC_Typ", f32::from(cmd.acc_type));
        set(values, "ACC_Status_ACC", f32::from(cmd.control));
        set(values, "ACC_StartStopp_Info", startstop.max(stock_startstop));
        set(
            values,
            "ACC_Sollbeschleunigung_02",
            if enabled { cmd.accel } else { ACCEL_NONE },
        );
        set(
            values,
            "ACC_zul_Regelabw_unten",
            if not_stopping {
                clip(cmd.accel + 0.2, 0.0, 0.2)
            } else {
                0.0
            },
        );
        set(
            values,
            "ACC_zul_Regelabw_oben",
            if not_stopping {
                clip((cmd.accel + 1.5) * (0.125 / 1.5), 0.0, 0.125)
            } else {
                0.0
            },
        );
        set(
            values,
            "ACC_neg_Sollbeschl_Grad_02",
            if enabled { 4.0 } else { 0.0 },
        );
        set(values, "ACC_pos_Sollbeschl_Grad_02", pos_jerk);
        set_bool(values, "ACC_Anfahren", cmd.starting);
        set_bool(values, "ACC_Anhalten", cmd.near_stop);
    }

    fn acc_accel_2(&self, values: &mut FieldMap, cmd: &AccCommand) {
        let enabled = cmd.enabled();

        let hold_type = if cmd.starting {
            4.0 // hold release / startup
        } else if cmd.esp_hold {
            1.0 // hold request
        } else if cmd.near_stop {
            3.0 // hold standby
        } else {
            0.0
        };

        let stopping_distance = match cmd.stopping_distance {
            Some(d) => d.min(20.0),
            None => STOPPING_DISTANCE_NO_TARGET,
        };
        let counter = get(values, COUNTER_FIELD);

        values.clear();
        if let Some(counter) = counter {
            set(values, COUNTER_FIELD, counter);
        }
        set(
            values,
            "ACC_Anhalteweg",
            if cmd.near_stop {
                stopping_distance
            } else {
                STOPPING_DISTANCE_FREE
            },
        );
        set(values, "ACC_Freilauf_Info", if enabled { 2.0 } else { 0.0 });
        set(
            values,
            "ACC_Folgebeschl",
            match cmd.lead_accel {
                Some(a) => clip(a, -4.6, 2.99),
                None => LEAD_ACCEL_NONE,
            },
        );
        set(
            values,
            "ACC_Sollbeschleunigung_02",
            if enabled { cmd.accel } else { ACCEL_NONE },
        );
        set(values, "ACC_Anforderung_HMS", hold_type);
        set_bool(values, "ACC_Anfahren", cmd.starting);
        set_bool(values, "ACC_Anhalten", cmd.near_stop);
    }

    fn acc_hud_1(&self, values: &mut FieldMap, cmd: &AccHudCommand) {
        let set_speed_known = cmd.set_speed_kph < 250.0;
        let display_prio = if cmd.engaged() { 2.0 } else { 3.0 };
        let stock_prio = get(values, "ACC_Display_Prio").unwrap_or(display_prio);
        set(values, "ACC_Status_Anzeige", f32::from(cmd.status));
        set(
            values,
            "ACC_Wunschgeschw_02",
            if set_speed_known {
                cmd.set_speed_kph
            } else {
                SET_SPEED_NONE_KPH
            },
        );
        set_bool(
            values,
            "ACC_Wunschgeschw_erreicht",
            cmd.status == 3 && set_speed_known && cmd.set_speed_reached,
        );
        set(values, "ACC_Gesetzte_Zeitluecke", f32::from(cmd.distance_bars));
        set(values, "ACC_Display_Prio", display_prio.min(stock_prio));
        set(values, "ACC_Abstandsindex", f32::from(cmd.lead_distance));
        set_bool(values, "ACC_Tachokranz", cmd.engaged());
    }

    fn acc_hud_2(&self, values: &mut FieldMap, cmd: &AccHudCommand) {
        set(
            values,
            "ACC_Status_Zusatzanz",
            if cmd.engaged() && cmd.lead_distance > 0 {
                2.0
            } else {
                0.0
            },
        );
    }

    fn acc_hud_3(&self, values: &mut FieldMap, cmd: &AccHudCommand) {
        set_bool(values, "ACC_Tachokranz", cmd.engaged());
    }
}
