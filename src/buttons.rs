//! Stock cruise-button emulation.
//!
//! When the stock ACC cannot be commanded directly, its set speed is coerced
//! toward the target by emulating steering-wheel button presses: accel/decel
//! steps walk the set-speed grid, RESUME re-engages, and a literal driver SET
//! press is forwarded as-is so non-stepped target speeds survive unrounded.

pub const BUTTON_NONE: u8 = 0;
pub const BUTTON_ACCEL: u8 = 1;
pub const BUTTON_DECEL: u8 = 2;
pub const BUTTON_RESUME: u8 = 3;
pub const BUTTON_SET: u8 = 4;

use crate::types::VehicleLimits;

#[derive(Debug, Clone, Copy)]
struct Press {
    code: u8,
    cycle: u64,
}

/// Inputs for one tick of the press state machine.
#[derive(Debug, Clone, Copy)]
pub struct ButtonContext {
    pub cruise_available: bool,
    /// Set speed currently held by the stock ACC, km/h.
    pub stock_set_speed: Option<f32>,
    /// The stock ACC is already tracking our coerced set speed.
    pub stock_overriding: bool,
    /// The driver physically pressed SET this cycle.
    pub set_pressed: bool,
    /// Target set speed, km/h; `None` when no target is known.
    pub target_set_speed: Option<f32>,
    /// Upstream requests the stock-ACC override.
    pub override_requested: bool,
}

#[derive(Debug, Default)]
pub struct ButtonEmulator {
    press: Option<Press>,
}

impl ButtonEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Button code to put on the bus this cycle.
    pub fn update(&mut self, cycle: u64, ctx: &ButtonContext, limits: &VehicleLimits) -> u8 {
        if !ctx.cruise_available {
            // Nothing to press against, but the press state must survive.
            return BUTTON_NONE;
        }

        let step = limits.set_speed_step_kph;
        let step_up = ctx
            .stock_set_speed
            .map(|s| ((s + 0.1) / step).ceil() * step)
            .unwrap_or(limits.set_speed_min_kph)
            .min(limits.set_speed_max_kph);
        let step_down = ctx
            .stock_set_speed
            .map(|s| ((s - 0.1) / step).floor() * step)
            .unwrap_or(limits.set_speed_min_kph)
            .max(limits.set_speed_min_kph);

        if let Some(press) = self.press {
            // Require a few cycles of non-pressing before a new press: the ECU's
            // own state update races the button logic otherwise.
            if cycle > press.cycle + 4 * limits.button_hold_cycles {
                self.press = None;
            } else if cycle > press.cycle + limits.button_hold_cycles {
                return BUTTON_NONE;
            } else {
                return press.code;
            }
        }

        if ctx.set_pressed && ctx.override_requested {
            // Forward SET directly so non-stepped speeds are not rounded.
            return self.press(BUTTON_SET, cycle);
        }

        let Some(target) = ctx.target_set_speed else {
            return BUTTON_NONE;
        };

        match ctx.stock_set_speed {
            None => self.press(BUTTON_ACCEL, cycle),
            Some(stock) => {
                if (step_up - target).abs() < (stock - target).abs() {
                    self.press(BUTTON_ACCEL, cycle)
                } else if (step_down - target).abs() < (stock - target).abs() {
                    self.press(BUTTON_DECEL, cycle)
                } else if !ctx.stock_overriding && ctx.override_requested {
                    self.press(BUTTON_RESUME, cycle)
                } else {
                    BUTTON_NONE
                }
            }
        }
    }

    fn press(&mut self, code: u8, cycle: u64) -> u8 {
        self.press = Some(Press { code, cycle });
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VehicleLimits;

    fn ctx() -> ButtonContext {
        ButtonContext {
            cruise_available: true,
            stock_set_speed: Some(100.0),
            stock_overriding: true,
            set_pressed: false,
            target_set_speed: Some(103.0),
            override_requested: true,
        }
    }

    fn limits() -> VehicleLimits {
        let mut limits = VehicleLimits::mqb();
        limits.set_speed_step_kph = 2.0;
        limits
    }

    #[test]
    fn steps_up_toward_target_then_debounces() {
        let mut emulator = ButtonEmulator::new();
        let limits = limits();
        let hold = limits.button_hold_cycles;

        // stock 100, target 103, step 2: step_up 102 is strictly closer.
        assert_eq!(emulator.update(10, &ctx(), &limits), BUTTON_ACCEL);
        // Held for the hold window.
        for cycle in 11..=10 + hold {
            assert_eq!(emulator.update(cycle, &ctx(), &limits), BUTTON_ACCEL);
        }
        // Neutral through the debounce window.
        for cycle in 10 + hold + 1..=10 + 4 * hold {
            assert_eq!(emulator.update(cycle, &ctx(), &limits), BUTTON_NONE);
        }
        // First cycle past the debounce window clears the state and may press
        // again immediately.
        assert_eq!(emulator.update(10 + 4 * hold + 1, &ctx(), &limits), BUTTON_ACCEL);
    }

    #[test]
    fn unavailable_cruise_short_circuits_without_corrupting_state() {
        let mut emulator = ButtonEmulator::new();
        let limits = limits();
        assert_eq!(emulator.update(10, &ctx(), &limits), BUTTON_ACCEL);

        let mut off = ctx();
        off.cruise_available = false;
        assert_eq!(emulator.update(11, &off, &limits), BUTTON_NONE);
        // Press state survived the unavailable cycle.
        assert_eq!(emulator.update(12, &ctx(), &limits), BUTTON_ACCEL);
    }

    #[test]
    fn driver_set_press_is_forwarded_exactly() {
        let mut emulator = ButtonEmulator::new();
        let limits = limits();
        let mut context = ctx();
        context.set_pressed = true;
        assert_eq!(emulator.update(5, &context, &limits), BUTTON_SET);
    }

    #[test]
    fn steps_down_when_grid_point_below_is_closer() {
        let mut emulator = ButtonEmulator::new();
        let limits = limits();
        let mut context = ctx();
        context.target_set_speed = Some(97.0);
        assert_eq!(emulator.update(0, &context, &limits), BUTTON_DECEL);
    }

    #[test]
    fn resume_pressed_when_on_target_but_not_overriding() {
        let mut emulator = ButtonEmulator::new();
        let limits = limits();
        let mut context = ctx();
        context.target_set_speed = Some(100.0);
        context.stock_overriding = false;
        assert_eq!(emulator.update(0, &context, &limits), BUTTON_RESUME);
    }

    #[test]
    fn no_target_reports_neutral() {
        let mut emulator = ButtonEmulator::new();
        let limits = limits();
        let mut context = ctx();
        context.target_set_speed = None;
        assert_eq!(emulator.update(0, &context, &limits), BUTTON_NONE);
    }

    #[test]
    fn unknown_stock_speed_presses_accel_to_seed_the_grid() {
        let mut emulator = ButtonEmulator::new();
        let limits = limits();
        let mut context = ctx();
        context.stock_set_speed = None;
        assert_eq!(emulator.update(0, &context, &limits), BUTTON_ACCEL);
    }
}
