use carcmd::packer::CapturePacker;
use carcmd::platform::mqb::MQB_CATALOG;
use carcmd::relay::{ForwardOptions, ForwardingRelay, TransformOutcome};
use carcmd::types::{
    Bus, FieldMap, FrameList, VehicleStateSnapshot, CHECKSUM_FIELD, COUNTER_FIELD,
};

fn snapshot_with(message: &'static str, counter: f32, extra: &[(&'static str, f32)]) -> VehicleStateSnapshot {
    let mut snapshot = VehicleStateSnapshot::default();
    let mut values = FieldMap::new();
    let _ = values.insert(COUNTER_FIELD, counter);
    let _ = values.insert(CHECKSUM_FIELD, 0xAA as f32);
    for &(key, value) in extra {
        let _ = values.insert(key, value);
    }
    let _ = snapshot.stock_values.insert(message, values);
    snapshot
}

#[test]
fn counter_gate_suppresses_repeats_and_tracks_advances() {
    let mut relay = ForwardingRelay::new();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let mut frames = FrameList::new();

    // Counters 5, 5, 6, 7, 7: only the first sighting of each value emits.
    let mut emitted = Vec::new();
    for counter in [5.0, 5.0, 6.0, 7.0, 7.0] {
        let snapshot = snapshot_with("LDW_02", counter, &[]);
        let sent = relay
            .relay(
                &snapshot,
                "LDW_02",
                Bus::Pt,
                ForwardOptions::default(),
                &packer,
                &mut frames,
            )
            .unwrap();
        emitted.push(sent);
    }
    assert_eq!(emitted, [true, false, true, true, false]);
    assert_eq!(frames.len(), 3);
    assert_eq!(packer.record_count(), 3);
}

#[test]
fn checksum_field_is_stripped_before_packing() {
    let mut relay = ForwardingRelay::new();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let mut frames = FrameList::new();

    let snapshot = snapshot_with("LDW_02", 3.0, &[("LDW_Texte", 8.0)]);
    relay
        .relay(
            &snapshot,
            "LDW_02",
            Bus::Pt,
            ForwardOptions::default(),
            &packer,
            &mut frames,
        )
        .unwrap();

    let records = packer.records_for("LDW_02");
    assert_eq!(records.len(), 1);
    assert!(records[0].values.get(CHECKSUM_FIELD).is_none());
    // Gated relay keeps the stock counter for the pack step.
    assert_eq!(records[0].values.get(COUNTER_FIELD), Some(&3.0));
    assert_eq!(records[0].values.get("LDW_Texte"), Some(&8.0));
}

#[test]
fn bypassed_gate_drops_the_counter_field() {
    let mut relay = ForwardingRelay::new();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let mut frames = FrameList::new();

    let snapshot = snapshot_with("LDW_02", 3.0, &[]);
    relay
        .relay(
            &snapshot,
            "LDW_02",
            Bus::Pt,
            ForwardOptions::ungated(),
            &packer,
            &mut frames,
        )
        .unwrap();

    let records = packer.records_for("LDW_02");
    assert!(records[0].values.get(COUNTER_FIELD).is_none());
}

#[test]
fn ungated_relay_still_records_the_observed_counter() {
    let mut relay = ForwardingRelay::new();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let mut frames = FrameList::new();

    // Ungated forward of counter 4, then a gated forward of the same counter
    // must be suppressed: the bypass still updates the dedup table.
    let snapshot = snapshot_with("LDW_02", 4.0, &[]);
    assert!(relay
        .relay(&snapshot, "LDW_02", Bus::Pt, ForwardOptions::ungated(), &packer, &mut frames)
        .unwrap());
    assert!(!relay
        .relay(&snapshot, "LDW_02", Bus::Pt, ForwardOptions::default(), &packer, &mut frames)
        .unwrap());
}

#[test]
fn missing_stock_frame_skips_unless_synthesized() {
    let mut relay = ForwardingRelay::new();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let mut frames = FrameList::new();
    let snapshot = VehicleStateSnapshot::default();

    let sent = relay
        .relay(
            &snapshot,
            "LDW_02",
            Bus::Pt,
            ForwardOptions::default(),
            &packer,
            &mut frames,
        )
        .unwrap();
    assert!(!sent);
    assert!(frames.is_empty());

    let sent = relay
        .relay_with(
            &snapshot,
            "HCA_01",
            Bus::Pt,
            ForwardOptions::synthesized(),
            &packer,
            &mut frames,
            |values| {
                let _ = values.insert("HCA_01_Status_HCA", 3.0);
                TransformOutcome::Emit
            },
        )
        .unwrap();
    assert!(sent);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].message, "HCA_01");
}

#[test]
fn transform_veto_emits_nothing_but_still_consumes_the_counter() {
    let mut relay = ForwardingRelay::new();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let mut frames = FrameList::new();

    let snapshot = snapshot_with("TSK_06", 9.0, &[]);
    let sent = relay
        .relay_with(
            &snapshot,
            "TSK_06",
            Bus::Cam,
            ForwardOptions::default(),
            &packer,
            &mut frames,
            |_| TransformOutcome::Skip,
        )
        .unwrap();
    assert!(!sent);
    assert!(frames.is_empty());
    assert_eq!(packer.record_count(), 0);
    // The counter was consumed; the same observation stays suppressed.
    assert!(!relay.can_forward(&snapshot, "TSK_06"));
}

#[test]
fn can_forward_matches_gated_relay_behavior() {
    let mut relay = ForwardingRelay::new();
    let packer = CapturePacker::new(&MQB_CATALOG);
    let mut frames = FrameList::new();

    let snapshot = snapshot_with("ACC_02", 1.0, &[]);
    assert!(relay.can_forward(&snapshot, "ACC_02"));
    relay
        .relay(&snapshot, "ACC_02", Bus::Pt, ForwardOptions::default(), &packer, &mut frames)
        .unwrap();
    assert!(!relay.can_forward(&snapshot, "ACC_02"));

    let advanced = snapshot_with("ACC_02", 2.0, &[]);
    assert!(relay.can_forward(&advanced, "ACC_02"));
    // Never-observed messages are never forwardable.
    assert!(!relay.can_forward(&snapshot, "GRA_ACC_01"));
}
