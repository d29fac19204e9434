use carcmd::packer::CapturePacker;
use carcmd::platform::mqb::MQB_CATALOG;
use carcmd::types::{
    DriveIntent, LatStatus, LongControlPhase, VehicleStateSnapshot, COUNTER_FIELD,
};
use carcmd::CommandController;
use clap::{App, Arg};
use colored::*;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time;
use tracing::{info, warn};

const DEFAULT_CYCLES: &str = "500";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let matches = App::new("carcmd-replay")
        .version("0.1.0")
        .about("🚗 Drive-cycle replay harness for the outbound command synthesis stack")
        .arg(
            Arg::with_name("cycles")
                .short("n")
                .long("cycles")
                .value_name("CYCLES")
                .help("Number of 10 ms control cycles to replay")
                .takes_value(true)
                .default_value(DEFAULT_CYCLES)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Cycle count must be a valid number".into()),
                }),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Per-cycle frame output format")
                .takes_value(true)
                .possible_values(&["summary", "json"])
                .default_value("summary"),
        )
        .arg(
            Arg::with_name("fast")
                .long("fast")
                .help("Run without pacing the control cycle to wall time"),
        )
        .get_matches();

    let cycles: u64 = matches.value_of("cycles").unwrap_or(DEFAULT_CYCLES).parse()?;
    let json_frames = matches.value_of("format") == Some("json");
    let fast = matches.is_present("fast");

    println!("🚗 Outbound Command Replay");
    println!("==========================");

    let mut controller = CommandController::mqb();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let period = controller.limits().cycle_period_s;
    let mut interval = time::interval(Duration::from_secs_f32(period));

    let mut frames_per_message: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut peak_torque: f32 = 0.0;
    let mut alert_cycles: u64 = 0;

    for cycle in 0..cycles {
        if !fast {
            interval.tick().await;
        }

        let intent = scripted_intent(cycle);
        let snapshot = scripted_snapshot(cycle);
        let output = match controller.update(&intent, &snapshot, &packer) {
            Ok(output) => output,
            Err(e) => {
                warn!("❌ Cycle {cycle} synthesis error: {e}");
                break;
            }
        };

        for frame in &output.frames {
            *frames_per_message.entry(frame.message).or_insert(0) += 1;
            if json_frames {
                println!("{}", serde_json::to_string(frame)?);
            }
        }
        peak_torque = peak_torque.max(output.torque_applied.abs());
        if output.steer_soft_disable_alert {
            alert_cycles += 1;
        }

        if cycle % 100 == 0 {
            info!(
                "cycle {cycle}: {} frames, torque {:+.3}, accel {:+.2} m/s^2",
                output.frames.len(),
                output.torque_applied,
                output.accel_applied,
            );
        }
    }

    println!();
    println!("{}", "Replay summary".bold());
    println!("  cycles:        {}", cycles.to_string().cyan());
    println!(
        "  pack calls:    {}",
        packer.record_count().to_string().cyan()
    );
    println!(
        "  peak |torque|: {}",
        format!("{peak_torque:.3}").cyan()
    );
    let alert = if alert_cycles > 0 {
        alert_cycles.to_string().red()
    } else {
        alert_cycles.to_string().green()
    };
    println!("  alert cycles:  {alert}");
    for (message, count) in &frames_per_message {
        println!("  {:12} {}", message, count.to_string().yellow());
    }

    Ok(())
}

/// A gentle lane-keep drive: assist engages early, a lead appears mid-run, and
/// the driver taps the brake near the end.
fn scripted_intent(cycle: u64) -> DriveIntent {
    let engaged = cycle >= 50;
    let braking = (400..420).contains(&cycle);
    let mut intent = DriveIntent {
        torque: 0.4 * (cycle as f32 * 0.02).sin(),
        accel: if engaged { 0.5 } else { 0.0 },
        long_phase: if engaged {
            LongControlPhase::Pid
        } else {
            LongControlPhase::Off
        },
        lat_active: engaged,
        long_active: engaged && !braking,
        ..DriveIntent::default()
    };
    intent.hud.set_speed = 27.0;
    intent.hud.lat_status = LatStatus {
        available: true,
        enabled: true,
        active: engaged,
    };
    intent.hud.lanes_visible = engaged;
    intent.hud.left_lane_visible = engaged;
    intent.hud.right_lane_visible = engaged;
    if cycle >= 250 {
        intent.hud.lead_visible = true;
        intent.hud.lead_distance = Some(35.0);
        intent.hud.lead_accel = Some(-0.2);
    }
    intent
}

fn scripted_snapshot(cycle: u64) -> VehicleStateSnapshot {
    let mut snapshot = VehicleStateSnapshot {
        v_ego: (cycle as f32 * 0.05).min(25.0),
        a_ego: 0.1,
        steering_torque: 20.0 * (cycle as f32 * 0.01).sin(),
        brake_pressed: (400..420).contains(&cycle),
        cruise_available: true,
        acc_type: 0,
        stock_acc_set_speed: Some(100.0),
        ..VehicleStateSnapshot::default()
    };

    // Stock frames arrive at realistic rates; the counters pace the relay.
    let full_rate = f32::from((cycle % 16) as u8);
    let half_rate = f32::from(((cycle / 2) % 16) as u8);
    for (message, counter, fields) in [
        (
            "LH_EPS_03",
            full_rate,
            &[("EPS_Lenkmoment", 1.5_f32), ("EPS_VZ_Lenkmoment", 0.0)][..],
        ),
        (
            "ACC_06",
            half_rate,
            &[
                ("ACC_Status_ACC", 3.0),
                ("ACC_Sollbeschleunigung_02", 0.4),
                ("ACC_zul_Regelabw_unten", 0.2),
                ("ACC_StartStopp_Info", 0.0),
            ][..],
        ),
        ("ACC_07", half_rate, &[("ACC_Anhalteweg", 20.46)][..]),
        ("TSK_06", half_rate, &[("TSK_Status", 3.0)][..]),
        ("GRA_ACC_01", half_rate, &[("GRA_Verstellung_Zeitluecke", 2.0)][..]),
        (
            "ACC_02",
            half_rate,
            &[("ACC_Wunschgeschw_02", 100.0), ("ACC_Display_Prio", 3.0)][..],
        ),
        ("ACC_04", half_rate, &[][..]),
        ("ACC_13", half_rate, &[][..]),
        ("LDW_02", half_rate, &[][..]),
    ] {
        let mut values = carcmd::types::FieldMap::new();
        let _ = values.insert(COUNTER_FIELD, counter);
        for &(key, value) in fields {
            let _ = values.insert(key, value);
        }
        let _ = snapshot.stock_values.insert(message, values);
    }
    snapshot
}
