//! Integration tests for the full capture-to-display workflow
//!
//! These tests run real capture threads:
//! - Capture device frames reach every filter stage
//! - The run loop executes scripted commands and stops cleanly
//! - Snapshots of every window land on disk

mod common;

use common::builders::{ConfigBuilder, FrameBuilder};
use common::mock_helpers::{RecordingSink, SinkEvent, StillCamera};
use common::{test_timeout, wait_until};
use serial_test::serial;
use std::time::Duration;
use vision_rs::capture::{SyntheticCamera, SyntheticPattern};
use vision_rs::display::SnapshotSink;
use vision_rs::orchestrator::{Command, Feature, Orchestrator, ScriptedCommands, TaskKind};

#[test]
#[serial]
fn test_capture_feeds_every_stage() {
    let sink = RecordingSink::new();
    let config = ConfigBuilder::new().capture_fps(200).build();
    let mut orch = Orchestrator::new(&config, Box::new(sink.clone()));

    let camera = StillCamera::new(FrameBuilder::new(32, 24).with_vertical_edge().build());
    let rate = camera.rate.clone();
    orch.attach_capture(camera).unwrap();

    for feature in Feature::ALL {
        if !orch.is_live(feature.primary()) {
            orch.dispatch(Command::Toggle(feature));
        }
    }
    for kind in TaskKind::ALL {
        assert!(orch.is_live(kind), "{:?} should be live", kind);
    }

    assert!(wait_until(test_timeout(), || {
        TaskKind::ALL.iter().all(|kind| {
            orch.output_channel(kind.name())
                .map(|c| !c.read().is_empty())
                .unwrap_or(false)
        })
    }));
    assert_eq!(*rate.lock().unwrap(), Some(200));
    assert!(orch.frames_captured().unwrap() > 0);

    orch.display_all();
    assert_eq!(sink.shown("Camera"), 1);
    assert_eq!(sink.shown("Cartoonize"), 1);

    orch.shutdown();
    assert_eq!(sink.events().last(), Some(&SinkEvent::CloseAll));
}

#[test]
#[serial]
fn test_run_loop_with_synthetic_camera() {
    let sink = RecordingSink::new();
    let config = ConfigBuilder::new().capture_fps(60).build();
    let mut orch = Orchestrator::new(&config, Box::new(sink.clone()));
    orch.attach_capture(SyntheticCamera::new(40, 30, SyntheticPattern::Bars))
        .unwrap();

    let mut commands = ScriptedCommands::from_keys("g").with_pace(Duration::from_millis(2));
    assert!(orch.step(&mut commands));
    assert!(wait_until(test_timeout(), || {
        orch.display_all();
        sink.shown("Grayscale") > 0
    }));

    commands.push(Command::QueryTelemetry);
    commands.push(Command::Shutdown);
    orch.run(&mut commands);

    assert!(orch.is_shut_down());
    assert!(sink.shown("Camera") > 0);
    assert_eq!(sink.events().last(), Some(&SinkEvent::CloseAll));
}

#[test]
#[serial]
fn test_iteration_limit_ends_run() {
    let config = ConfigBuilder::new().max_iterations(20).build();
    let mut orch = Orchestrator::new(&config, Box::new(RecordingSink::new()));
    orch.attach_capture(SyntheticCamera::new(16, 16, SyntheticPattern::Noise))
        .unwrap();

    let mut commands = ScriptedCommands::from_keys("sq");
    orch.run(&mut commands);

    assert!(orch.is_shut_down());
    assert!(orch.live_tasks().is_empty());
}

#[test]
#[serial]
fn test_snapshots_written_for_each_window() {
    let dir = tempfile::tempdir().unwrap();
    let sink = SnapshotSink::new(dir.path(), Duration::ZERO).unwrap();
    let camera_path = sink.path_for("Camera");
    let negative_path = sink.path_for("Negative");

    let mut orch = Orchestrator::new(&ConfigBuilder::new().build(), Box::new(sink));
    orch.attach_capture(StillCamera::new(FrameBuilder::new(8, 8).build()))
        .unwrap();
    orch.dispatch(Command::Toggle(Feature::Negative));

    assert!(wait_until(test_timeout(), || {
        orch.display_all();
        camera_path.exists() && negative_path.exists()
    }));

    let saved = image::open(&negative_path).unwrap().to_rgb8();
    assert_eq!(saved.get_pixel(0, 0).0, [127, 127, 127]);
}

#[test]
#[serial]
fn test_second_capture_device_rejected() {
    let mut orch = Orchestrator::new(&ConfigBuilder::new().build(), Box::new(RecordingSink::new()));
    orch.attach_capture(StillCamera::new(FrameBuilder::new(2, 2).build()))
        .unwrap();
    assert!(orch
        .attach_capture(StillCamera::new(FrameBuilder::new(2, 2).build()))
        .is_err());
}
