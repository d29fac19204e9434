use carcmd::steering::TorqueLimiter;
use carcmd::types::VehicleLimits;

#[test]
fn commanded_torque_never_exceeds_the_configured_max() {
    let limits = VehicleLimits::mqb();
    let mut limiter = TorqueLimiter::new();

    // Saturating requests with alternating sign and heavy driver input.
    for cycle in 0..2000_u64 {
        let desired = if (cycle / 50) % 2 == 0 { 1.0 } else { -1.0 };
        let driver = 150.0 * ((cycle % 7) as f32 - 3.0);
        let out = limiter.apply(desired, driver, true, true, &limits);
        assert!(out.torque.abs() <= limits.steer_max);
    }
}

#[test]
fn rate_limit_holds_between_consecutive_cycles() {
    let limits = VehicleLimits::mqb();
    let mut limiter = TorqueLimiter::new();
    let mut last = 0;

    for _ in 0..500 {
        let out = limiter.apply(1.0, 0.0, true, true, &limits);
        let delta = out.torque - last;
        assert!(delta <= limits.steer_delta_up);
        assert!(delta >= -limits.steer_delta_down);
        last = out.torque;
    }
}

#[test]
fn stuck_torque_is_nudged_toward_zero_and_the_window_restarts() {
    let limits = VehicleLimits::mqb();
    let mut limiter = TorqueLimiter::new();

    // Ramp up to saturation, where the commanded value stops changing.
    let mut torque = 0;
    for _ in 0..200 {
        torque = limiter.apply(1.0, 0.0, true, true, &limits).torque;
    }
    assert_eq!(torque, limits.steer_max);

    // The command must never sit bit-identical past the stuck-torque window.
    let window_steps = limits.stuck_torque_cycles() / limits.steer_step;
    let mut same_run = 0_u64;
    let mut nudged = false;
    for _ in 0..3 * window_steps {
        let next = limiter.apply(1.0, 0.0, true, true, &limits).torque;
        if next == torque {
            same_run += 1;
            assert!(same_run * limits.steer_step <= limits.stuck_torque_cycles());
        } else {
            // A nudge steps one unit toward zero; the rate limiter then walks
            // straight back to saturation.
            assert_eq!((next - torque).abs(), 1);
            same_run = 0;
            if next < torque {
                nudged = true;
            }
        }
        torque = next;
    }
    assert!(nudged);
}

#[test]
fn disable_resets_the_uninterrupted_steering_timer_in_the_same_cycle() {
    let limits = VehicleLimits::mqb();
    let mut limiter = TorqueLimiter::new();

    for _ in 0..100 {
        limiter.apply(1.0, 0.0, true, true, &limits);
    }
    assert!(limiter.uninterrupted_cycles() > 0);

    let out = limiter.apply(1.0, 0.0, false, true, &limits);
    assert_eq!(out.torque, 0);
    assert!(!out.enabled);
    assert_eq!(limiter.uninterrupted_cycles(), 0);
}

#[test]
fn zero_output_with_lat_active_also_resets_the_timer() {
    let limits = VehicleLimits::mqb();
    let mut limiter = TorqueLimiter::new();

    for _ in 0..100 {
        limiter.apply(1.0, 0.0, true, true, &limits);
    }
    // Wind back down to zero; the cycle that lands on zero disables output.
    for _ in 0..100 {
        limiter.apply(0.0, 0.0, true, true, &limits);
    }
    assert_eq!(limiter.last_torque(), 0);
    assert_eq!(limiter.uninterrupted_cycles(), 0);
}

#[test]
fn soft_disable_alert_raises_before_the_eps_time_limit() {
    let limits = VehicleLimits::mqb();
    let mut limiter = TorqueLimiter::new();

    let alert_steps = limits.steer_alert_cycles() / limits.steer_step;
    for _ in 0..alert_steps {
        limiter.apply(1.0, 0.0, true, true, &limits);
        assert!(!limiter.soft_disable_alert());
    }
    limiter.apply(1.0, 0.0, true, true, &limits);
    assert!(limiter.soft_disable_alert());

    // Any interruption clears the alert.
    limiter.apply(0.0, 0.0, false, true, &limits);
    assert!(!limiter.soft_disable_alert());
}

#[test]
fn eps_not_ready_forces_output_off() {
    let limits = VehicleLimits::mqb();
    let mut limiter = TorqueLimiter::new();
    let out = limiter.apply(1.0, 0.0, true, false, &limits);
    assert_eq!(out.torque, 0);
    assert!(!out.enabled);
}
