mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::DVec3;
use orbis_lod::{
    BuildScheduler, InlineScheduler, LodDriver, LodSettings, NodeState, PlanetFrame,
    ThreadedScheduler,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::*;

fn stress_settings() -> LodSettings {
    LodSettings {
        arena_capacity: 48,
        patch_resolution: 5,
        max_depth: 4,
        max_pending_builds: 16,
        ..Default::default()
    }
}

fn random_camera(rng: &mut StdRng) -> DVec3 {
    let dir = DVec3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    )
    .try_normalize()
    .unwrap_or(DVec3::Y);
    dir * (RADIUS + rng.random_range(0.5..3_000.0))
}

fn planet_driver<S: BuildScheduler>(scheduler: S) -> LodDriver<S> {
    LodDriver::new(
        stress_settings(),
        PlanetFrame::at_origin(RADIUS),
        Arc::new(Hills),
        scheduler,
    )
    .expect("valid settings")
}

/// Fly away from the planet until every merge has landed.
fn settle<S: BuildScheduler>(driver: &mut LodDriver<S>, sink: &mut RecordingSink) {
    let start = Instant::now();
    loop {
        sink.begin_frame();
        driver.frame(&far_away(), sink).expect("frame");
        assert_invariants(driver.forest());
        let stats = driver.stats();
        if stats.pending_builds == 0
            && stats.parked == 0
            && stats.merging == 0
            && stats.building_leaves == 0
            && stats.internal == 0
        {
            return;
        }
        assert!(start.elapsed() < Duration::from_secs(30), "forest never settled: {stats}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn assert_settled_on_roots<S: BuildScheduler>(driver: &LodDriver<S>, sink: &RecordingSink) {
    assert_draws_partition_slots(driver.forest(), sink);
    assert_eq!(sink.draws.len(), 6);
    for &root in driver.forest().roots() {
        assert_eq!(driver.forest().node(root).map(|n| n.state()), Some(NodeState::ReadyLeaf));
    }
}

#[test]
fn test_random_flight_inline() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut driver = planet_driver(InlineScheduler::new());
    let mut sink = RecordingSink::default();
    let mut camera = random_camera(&mut rng);

    for frame in 0..400 {
        if frame % 7 == 0 {
            camera = random_camera(&mut rng);
        }
        sink.begin_frame();
        driver.frame(&camera, &mut sink).expect("frame");
        assert_invariants(driver.forest());
    }
    assert_eq!(driver.stats().stale_completions, 0);

    settle(&mut driver, &mut sink);
    assert_settled_on_roots(&driver, &sink);

    driver.refresh();
    assert_eq!(driver.arena().free_count(), driver.arena().capacity());
}

#[test]
fn test_random_flight_with_out_of_order_completions() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut driver = planet_driver(InlineScheduler::held());
    let mut sink = RecordingSink::default();
    let mut camera = random_camera(&mut rng);

    for frame in 0..400 {
        if frame % 5 == 0 {
            camera = random_camera(&mut rng);
        }
        let mut coin = StdRng::seed_from_u64(frame);
        driver.scheduler_mut().release_where(|_| coin.random_bool(0.4));
        sink.begin_frame();
        driver.frame(&camera, &mut sink).expect("frame");
        assert_invariants(driver.forest());
    }

    driver.scheduler_mut().set_held(false);
    driver.scheduler_mut().release_all();
    settle(&mut driver, &mut sink);
    assert_settled_on_roots(&driver, &sink);
}

#[test]
fn test_random_flight_threaded() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut driver = planet_driver(ThreadedScheduler::new(4, 32));
    let mut sink = RecordingSink::default();
    let mut camera = random_camera(&mut rng);

    for frame in 0..300 {
        if frame % 10 == 0 {
            camera = random_camera(&mut rng);
        }
        sink.begin_frame();
        driver.frame(&camera, &mut sink).expect("frame");
        assert_invariants(driver.forest());
        if frame % 3 == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
    assert_eq!(driver.stats().stale_completions, 0);

    settle(&mut driver, &mut sink);
    assert_settled_on_roots(&driver, &sink);

    driver.refresh();
    assert_eq!(driver.arena().allocated_count(), 0);
    driver.scheduler_mut().shutdown();
}
