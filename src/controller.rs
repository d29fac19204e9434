//! Per-cycle command synthesis orchestrator.
//!
//! Owns every piece of cross-cycle state and sequences the sub-components once
//! per control cycle: steering before the EPS overlay (the overlay reads the
//! freshly committed torque), longitudinal before the ACC HUD (the HUD derives
//! from the control-mode code). All outgoing messages leave through the
//! forwarding relay.

use tracing::debug;

use crate::buttons::{ButtonContext, ButtonEmulator};
use crate::longitudinal::{LeadDistanceFilter, LongPlan};
use crate::packer::CanPacker;
use crate::platform::{
    AccCommand, AccHudCommand, ButtonsCommand, CounterMode, MqbCodec, PlatformCodec,
};
use crate::relay::{ForwardOptions, ForwardingRelay, SynthesisError, TransformOutcome};
use crate::steering::{eps_overlay_torque, TorqueLimiter};
use crate::types::{
    Bus, ButtonEvent, CycleOutput, DriveIntent, VehicleLimits, VehicleStateSnapshot, MS_TO_KPH,
};

/// Set speeds above this display value mean "no target" to the stock ACC.
const MAX_TARGET_SET_SPEED_KPH: f32 = 250.0;
/// Display tolerance for the "set speed reached" checkmark, km/h.
const SET_SPEED_REACHED_BAND_KPH: f32 = 3.0;

pub struct CommandController {
    limits: VehicleLimits,
    codec: Box<dyn PlatformCodec>,
    cycle: u64,
    steering: TorqueLimiter,
    lead_filter: LeadDistanceFilter,
    buttons: ButtonEmulator,
    relay: ForwardingRelay,
}

impl CommandController {
    pub fn new(limits: VehicleLimits, codec: Box<dyn PlatformCodec>) -> Self {
        Self {
            limits,
            codec,
            cycle: 0,
            steering: TorqueLimiter::new(),
            lead_filter: LeadDistanceFilter::new(),
            buttons: ButtonEmulator::new(),
            relay: ForwardingRelay::new(),
        }
    }

    pub fn mqb() -> Self {
        Self::new(VehicleLimits::mqb(), Box::new(MqbCodec::new()))
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn limits(&self) -> &VehicleLimits {
        &self.limits
    }

    /// One control cycle: intent and snapshot in, frame list and actuator echo out.
    pub fn update(
        &mut self,
        intent: &DriveIntent,
        snapshot: &VehicleStateSnapshot,
        packer: &dyn CanPacker,
    ) -> Result<CycleOutput, SynthesisError> {
        if snapshot.car_faulted_non_critical {
            return self.fault_forward(snapshot, packer);
        }

        let mut output = CycleOutput::default();
        let limits = &self.limits;
        let codec = self.codec.as_ref();
        let catalog = codec.catalog();
        let relay = &mut self.relay;
        let cycle = self.cycle;

        // **** Steering controls ******************************************** //

        if cycle % limits.steer_step == 0 {
            let command = self.steering.apply(
                intent.torque,
                snapshot.steering_torque,
                intent.lat_active,
                snapshot.eps_init_complete,
                limits,
            );
            relay.relay_with(
                snapshot,
                catalog.steering.name,
                Bus::Pt,
                ForwardOptions::synthesized(),
                packer,
                &mut output.frames,
                |values| {
                    codec.steering_control(values, command.torque, command.enabled);
                    TransformOutcome::Emit
                },
            )?;
        }

        if limits.stock_hca_present && relay.can_forward(snapshot, catalog.eps.name) {
            // Keep the stock driver-inactivity heuristic satisfied while assist
            // torque is flowing.
            let simulated = eps_overlay_torque(
                cycle,
                snapshot.steering_torque,
                self.steering.last_torque(),
                intent.stock_driver_monitoring,
                limits,
            );
            relay.relay_with(
                snapshot,
                catalog.eps.name,
                Bus::Cam,
                ForwardOptions::default(),
                packer,
                &mut output.frames,
                |values| {
                    codec.eps_update(values, simulated);
                    TransformOutcome::Emit
                },
            )?;
        }

        // **** Acceleration controls **************************************** //

        let plan = LongPlan::compute(intent, snapshot, limits, codec);
        if limits.long_control {
            let acc = AccCommand {
                acc_type: snapshot.acc_type,
                accel: plan.accel,
                control: plan.control,
                near_stop: plan.near_stop,
                starting: plan.starting,
                esp_hold: plan.esp_hold,
                lead_accel: plan.lead_accel,
                stopping_distance: plan.stopping_distance,
                v_ego: snapshot.v_ego,
                a_ego: snapshot.a_ego,
            };
            relay.relay_with(
                snapshot,
                catalog.acc_1.name,
                Bus::Pt,
                ForwardOptions::default(),
                packer,
                &mut output.frames,
                |values| {
                    codec.acc_accel_1(values, &acc);
                    TransformOutcome::Emit
                },
            )?;
            relay.relay_with(
                snapshot,
                catalog.acc_2.name,
                Bus::Pt,
                ForwardOptions::default(),
                packer,
                &mut output.frames,
                |values| {
                    codec.acc_accel_2(values, &acc);
                    TransformOutcome::Emit
                },
            )?;
            let stock_acc_1 = snapshot.observed(catalog.acc_1.name);
            relay.relay_with(
                snapshot,
                catalog.tsk.name,
                Bus::Cam,
                ForwardOptions::default(),
                packer,
                &mut output.frames,
                |values| codec.tsk_update(values, stock_acc_1),
            )?;
            output.accel_applied = plan.accel;
        }

        // **** HUD controls ************************************************* //

        if cycle % limits.ldw_step == 0 && relay.can_forward(snapshot, catalog.lka_hud.name) {
            let alert = codec.lka_alert_code(intent.hud.visual_alert, intent.hud.audible_alert);
            relay.relay_with(
                snapshot,
                catalog.lka_hud.name,
                Bus::Pt,
                ForwardOptions::default(),
                packer,
                &mut output.frames,
                |values| {
                    codec.lka_hud(values, alert, &intent.hud);
                    TransformOutcome::Emit
                },
            )?;
        }

        if limits.long_control {
            if intent.stock_acc_override_armed || snapshot.stock_acc_override {
                // Hand the cluster back to the stock ACC while its override runs.
                for spec in [&catalog.acc_hud_1, &catalog.acc_hud_2, &catalog.acc_hud_3] {
                    relay.relay(
                        snapshot,
                        spec.name,
                        Bus::Pt,
                        ForwardOptions::default(),
                        packer,
                        &mut output.frames,
                    )?;
                }
            } else if relay.can_forward(snapshot, catalog.acc_hud_1.name)
                || relay.can_forward(snapshot, catalog.acc_hud_2.name)
                || relay.can_forward(snapshot, catalog.acc_hud_3.name)
            {
                let lead_distance = self.lead_filter.encode(
                    snapshot.v_ego,
                    intent.hud.lead_visible,
                    intent.hud.lead_distance,
                    snapshot.upscale_lead_signal,
                );
                let set_speed_kph = intent.hud.set_speed * MS_TO_KPH;
                let current_speed_kph = snapshot.v_ego * MS_TO_KPH;
                let hud = AccHudCommand {
                    status: codec.acc_hud_status_value(
                        snapshot.cruise_available,
                        plan.overriding,
                        snapshot.acc_faulted,
                        plan.active,
                    ),
                    set_speed_kph,
                    set_speed_reached: (set_speed_kph - current_speed_kph).abs()
                        <= SET_SPEED_REACHED_BAND_KPH,
                    lead_distance,
                    distance_bars: intent.hud.lead_distance_bars,
                };
                relay.relay_with(
                    snapshot,
                    catalog.acc_hud_1.name,
                    Bus::Pt,
                    ForwardOptions::default(),
                    packer,
                    &mut output.frames,
                    |values| {
                        codec.acc_hud_1(values, &hud);
                        TransformOutcome::Emit
                    },
                )?;
                relay.relay_with(
                    snapshot,
                    catalog.acc_hud_2.name,
                    Bus::Pt,
                    ForwardOptions::default(),
                    packer,
                    &mut output.frames,
                    |values| {
                        codec.acc_hud_2(values, &hud);
                        TransformOutcome::Emit
                    },
                )?;
                relay.relay_with(
                    snapshot,
                    catalog.acc_hud_3.name,
                    Bus::Pt,
                    ForwardOptions::default(),
                    packer,
                    &mut output.frames,
                    |values| {
                        codec.acc_hud_3(values, &hud);
                        TransformOutcome::Emit
                    },
                )?;
            }
        }

        // **** Stock ACC button controls ************************************ //

        if limits.pcm_cruise && (intent.cruise_cancel || intent.cruise_resume) {
            let cmd = ButtonsCommand {
                counter_mode: CounterMode::Advance,
                buttons: 0,
                cancel: intent.cruise_cancel,
                resume: intent.cruise_resume,
                stock_gap_control: true,
            };
            relay.relay_with(
                snapshot,
                catalog.acc_buttons.name,
                Bus::Cam,
                ForwardOptions::default(),
                packer,
                &mut output.frames,
                |values| {
                    codec.acc_buttons(values, &cmd);
                    TransformOutcome::Emit
                },
            )?;
        } else if limits.long_control {
            let set_speed_kph = intent.hud.set_speed * MS_TO_KPH;
            let target_set_speed =
                (set_speed_kph <= MAX_TARGET_SET_SPEED_KPH).then_some(set_speed_kph);
            let can_switch_acc = !snapshot.brake_pressed && !plan.cancel_pressed;
            let context = ButtonContext {
                cruise_available: snapshot.cruise_available,
                stock_set_speed: snapshot.stock_acc_set_speed,
                stock_overriding: snapshot.stock_acc_override,
                set_pressed: intent.button_pressed(ButtonEvent::SetCruise),
                target_set_speed,
                override_requested: intent.stock_acc_override_active && can_switch_acc,
            };
            let button = self.buttons.update(cycle, &context, limits);
            let cmd = ButtonsCommand {
                counter_mode: CounterMode::Stock,
                buttons: button,
                cancel: snapshot.stock_acc_override && !intent.stock_acc_override_active,
                resume: false,
                stock_gap_control: intent.stock_acc_override_armed || snapshot.stock_acc_override,
            };
            relay.relay_with(
                snapshot,
                catalog.acc_buttons.name,
                Bus::Cam,
                ForwardOptions::default(),
                packer,
                &mut output.frames,
                |values| {
                    codec.acc_buttons(values, &cmd);
                    TransformOutcome::Emit
                },
            )?;
        }

        output.torque_applied = self.steering.last_torque() as f32 / limits.steer_max as f32;
        output.steer_soft_disable_alert = self.steering.soft_disable_alert();
        self.cycle += 1;
        Ok(output)
    }

    /// Degraded passthrough: relay every known-observed message verbatim so the
    /// vehicle's own systems stay in control, with a zeroed actuator echo.
    fn fault_forward(
        &mut self,
        snapshot: &VehicleStateSnapshot,
        packer: &dyn CanPacker,
    ) -> Result<CycleOutput, SynthesisError> {
        debug!("non-critical car fault: forwarding stock frames verbatim");
        let mut output = CycleOutput::default();
        let limits = &self.limits;
        let catalog = self.codec.catalog();
        let relay = &mut self.relay;
        let options = ForwardOptions::ungated();

        relay.relay(
            snapshot,
            catalog.steering.name,
            Bus::Pt,
            options,
            packer,
            &mut output.frames,
        )?;
        if limits.stock_hca_present {
            relay.relay(
                snapshot,
                catalog.eps.name,
                Bus::Cam,
                options,
                packer,
                &mut output.frames,
            )?;
        }
        if limits.long_control {
            for (spec, bus) in [
                (&catalog.acc_1, Bus::Pt),
                (&catalog.acc_2, Bus::Pt),
                (&catalog.tsk, Bus::Cam),
                (&catalog.acc_hud_1, Bus::Pt),
                (&catalog.acc_hud_2, Bus::Pt),
                (&catalog.acc_hud_3, Bus::Pt),
            ] {
                relay.relay(snapshot, spec.name, bus, options, packer, &mut output.frames)?;
            }
        }
        relay.relay(
            snapshot,
            catalog.lka_hud.name,
            Bus::Pt,
            options,
            packer,
            &mut output.frames,
        )?;
        relay.relay(
            snapshot,
            catalog.acc_buttons.name,
            Bus::Cam,
            options,
            packer,
            &mut output.frames,
        )?;

        self.cycle += 1;
        Ok(output)
    }
}

impl core::fmt::Debug for CommandController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandController")
            .field("cycle", &self.cycle)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
