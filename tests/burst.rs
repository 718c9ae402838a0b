//! # Burst capture tests
//!
//! Timing is checked against a manual clock, reads on the fake device cost a fixed amount of
//! clock time.

mod common;

use std::fs;
use std::time::Duration;

use vision_camera::prelude::*;
use vision_camera::SystemClock;

use common::{open_session, scratch_dir, session_with, FakeBackend, ManualClock};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn burst_requires_an_open_session() {
    let clock = ManualClock::new();
    let backend = FakeBackend::new(&[0]);
    let state = backend.state();
    let mut session = session_with(backend, &clock);
    let dir = scratch_dir("burst_closed");

    match session.burst(&BurstRequest::new(&dir).count(3)) {
        Err(e @ Error::NotOpen) => assert!(e.saved_paths().is_empty()),
        other => panic!("Expected NotOpen, got {:?}", other),
    }

    assert!(!dir.exists());
    assert_eq!(state.reads(), 0);
}

#[test]
fn burst_of_five_frames() {
    let clock = ManualClock::new();
    let backend = FakeBackend::new(&[0]).timed(&clock, ms(10));
    let mut session = open_session(backend, &clock);
    let dir = scratch_dir("burst_five");

    let report = session
        .burst(&BurstRequest::new(&dir).count(5).period_ms(100).duration_ms(0))
        .expect("Burst failed");

    assert_eq!(report.n, 5);
    assert_eq!(report.paths.len(), 5);
    assert_eq!(report.mime, "image/jpeg");
    assert_eq!((report.width, report.height), (1280, 720));
    assert_eq!(report.period_ms, 100);
    assert_eq!(report.duration_ms, 0);
    assert_eq!(report.save_dir, dir);

    for (i, path) in report.paths.iter().enumerate() {
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("burst_"));
        assert!(name.ends_with(&format!("_{:02}.jpg", i)), "unexpected name {}", name);
    }

    let indices: Vec<Option<u32>> = report.frames.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);

    for pair in report.frames.windows(2) {
        assert!(pair[0].elapsed <= pair[1].elapsed);
    }

    assert_eq!(fs::read_dir(&dir).unwrap().count(), 5);
}

#[test]
fn duration_sets_the_frame_count() {
    let clock = ManualClock::new();
    let mut session = open_session(FakeBackend::new(&[0]), &clock);

    let report = session
        .burst(
            &BurstRequest::new(scratch_dir("burst_duration"))
                .count(2)
                .period_ms(200)
                .duration_ms(1000),
        )
        .expect("Burst failed");
    assert_eq!(report.n, 5);
    assert_eq!(report.paths.len(), 5);
    assert_eq!(report.duration_ms, 1000);

    let report = session
        .burst(
            &BurstRequest::new(scratch_dir("burst_short"))
                .count(9)
                .period_ms(200)
                .duration_ms(250),
        )
        .expect("Burst failed");
    assert_eq!(report.n, 1);
    assert_eq!(report.paths.len(), 1);
}

#[test]
fn zero_count_takes_one_frame() {
    let clock = ManualClock::new();
    let mut session = open_session(FakeBackend::new(&[0]), &clock);

    let report = session
        .burst(&BurstRequest::new(scratch_dir("burst_zero")).count(0))
        .expect("Burst failed");

    assert_eq!(report.paths.len(), 1);
}

#[test]
fn failed_read_aborts_with_partial_paths() {
    let clock = ManualClock::new();
    let mut session = open_session(FakeBackend::new(&[0]).fail_reads(&[2]), &clock);
    let dir = scratch_dir("burst_fail");

    let err = session
        .burst(&BurstRequest::new(&dir).count(5).period_ms(100).warmup(0))
        .expect_err("Burst should fail");

    match &err {
        Error::BurstAborted {
            index,
            cause,
            saved,
        } => {
            assert_eq!(*index, 2);
            assert!(matches!(**cause, Error::FrameReadError(_)));
            assert_eq!(saved.len(), 2);
            assert!(saved[0].to_string_lossy().ends_with("_00.jpg"));
            assert!(saved[1].to_string_lossy().ends_with("_01.jpg"));
            assert!(saved.iter().all(|p| p.exists()));
        }
        other => panic!("Expected BurstAborted, got {:?}", other),
    }

    assert_eq!(err.saved_paths().len(), 2);
    assert!(session.is_open());
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
}

#[test]
fn warmup_failures_are_ignored() {
    let clock = ManualClock::new();
    let backend = FakeBackend::new(&[0]).fail_reads(&[0, 1, 2]);
    let state = backend.state();
    let mut session = open_session(backend, &clock);

    let report = session
        .burst(
            &BurstRequest::new(scratch_dir("burst_warmup"))
                .count(2)
                .period_ms(50)
                .warmup(3),
        )
        .expect("Warmup failures should not fail the burst");

    assert_eq!(report.paths.len(), 2);
    assert_eq!(state.reads(), 5);
}

#[test]
fn frames_are_anchored_to_the_burst_start() {
    let clock = ManualClock::new();
    let backend = FakeBackend::new(&[0]).timed(&clock, ms(30));
    let state = backend.state();
    let mut session = open_session(backend, &clock);

    session
        .burst(
            &BurstRequest::new(scratch_dir("burst_anchor"))
                .count(5)
                .period_ms(100)
                .warmup(2),
        )
        .expect("Burst failed");

    // Two warmup reads at 0 and 30 ms, timing starts once they're done
    let reads = state.read_times();
    assert_eq!(reads.len(), 7);
    assert_eq!(&reads[..2], &[ms(0), ms(30)]);

    let t0 = ms(60);
    let offsets: Vec<Duration> = reads[2..].iter().map(|r| *r - t0).collect();
    assert_eq!(offsets, vec![ms(0), ms(100), ms(200), ms(300), ms(400)]);

    // Each wait only covers what is left of the period after the 30 ms read
    assert_eq!(clock.sleeps(), vec![ms(70); 4]);
}

#[test]
fn late_frames_are_taken_immediately() {
    let clock = ManualClock::new();
    let backend = FakeBackend::new(&[0]).timed(&clock, ms(150));
    let state = backend.state();
    let mut session = open_session(backend, &clock);

    session
        .burst(
            &BurstRequest::new(scratch_dir("burst_late"))
                .count(4)
                .period_ms(100)
                .warmup(0),
        )
        .expect("Burst failed");

    assert_eq!(state.read_times(), vec![ms(0), ms(150), ms(300), ms(450)]);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn buffering_is_reduced_before_warmup() {
    let clock = ManualClock::new();

    for backend in vec![FakeBackend::new(&[0]), FakeBackend::new(&[0]).supports_buffering()] {
        let state = backend.state();
        let mut session = open_session(backend, &clock);
        let report = session
            .burst(&BurstRequest::new(scratch_dir("burst_buffering")).count(2).warmup(3))
            .expect("Burst failed");

        assert_eq!(report.paths.len(), 2);
        assert_eq!(state.buffering_requests(), vec![0]);
        assert_eq!(state.reads(), 5);
    }
}

#[test]
fn zero_period_with_duration_is_rejected() {
    let clock = ManualClock::new();
    let backend = FakeBackend::new(&[0]);
    let state = backend.state();
    let mut session = open_session(backend, &clock);

    let request = BurstRequest::new(scratch_dir("burst_zero_period"))
        .period_ms(0)
        .duration_ms(500);

    match session.burst(&request) {
        Err(Error::InvalidBurstPlan(_)) => (),
        other => panic!("Expected InvalidBurstPlan, got {:?}", other),
    }

    assert_eq!(state.reads(), 0);
    assert!(session.is_open());
}

#[test]
fn real_clock_spaces_frames() {
    let mut session = CameraSessionBuilder::new()
        .backend(FakeBackend::new(&[0]))
        .clock(SystemClock)
        .build()
        .expect("Failed to build session");
    session.open(&OpenRequest::new(0)).expect("Failed to open");

    let report = session
        .burst(
            &BurstRequest::new(scratch_dir("burst_real"))
                .count(3)
                .period_ms(20)
                .warmup(1)
                .format("png"),
        )
        .expect("Burst failed");

    assert_eq!(report.mime, "image/png");
    assert!(report.frames[2].elapsed >= ms(40));
}

#[test]
fn huge_count_is_not_preallocated() {
    let clock = ManualClock::new();
    let mut session = open_session(FakeBackend::new(&[0]).fail_reads(&[3]), &clock);

    let request = BurstRequest::new(scratch_dir("burst_huge"))
        .count(u32::MAX)
        .period_ms(0)
        .warmup(0);

    match session.burst(&request) {
        Err(Error::BurstAborted { index, saved, .. }) => {
            assert_eq!(index, 3);
            assert_eq!(saved.len(), 3);
        }
        other => panic!("Expected BurstAborted, got {:?}", other),
    }

    assert!(session.is_open());
}
