mod common;

use common::{spy_registry, write_sequence};
use std::sync::atomic::Ordering;
use toaeval_core::{CameraIntrinsics, Combination};
use toaeval_pipeline::{CancelFlag, Experiment, ExperimentError, Limits};
use toaeval_store::Store;

fn camera() -> CameraIntrinsics {
    CameraIntrinsics::from_rows(&[[500.0, 0.0, 32.0], [0.0, 500.0, 24.0], [0.0, 0.0, 1.0]])
}

fn experiment(
    store: &Store,
    dir: &std::path::Path,
    combination: Combination,
    limits: Limits,
) -> Experiment {
    let (registry, _) = spy_registry();
    let resolved = registry.resolve(&combination).expect("resolve");
    Experiment::new(store, "S1", dir, "png", resolved, limits).expect("experiment")
}

#[test]
fn views_and_matches_are_cached_once() {
    let tmp = tempfile::tempdir().unwrap();
    let images = write_sequence(tmp.path(), "S1", 3);
    let store = Store::open_in_memory().unwrap();
    let (registry, calls) = spy_registry();

    for round in 0..2 {
        let resolved = registry.resolve(&Combination::new("FAST", "SIFT")).unwrap();
        let mut exp =
            Experiment::new(&store, "S1", &images, "png", resolved, Limits::default()).unwrap();
        let views = exp.create_views(&store).unwrap();
        let pairs = exp.create_matches(&store).unwrap();

        assert_eq!(views.views, 3);
        assert_eq!(views.keypoints, 15);
        assert_eq!(pairs.pairs, 3);
        assert_eq!(pairs.matches, 15);
        if round == 0 {
            assert_eq!(views.computed, 3);
            assert_eq!(pairs.computed, 3);
        } else {
            assert_eq!(views.computed, 0);
            assert_eq!(pairs.computed, 0);
        }
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.feature_count().unwrap(), 3);
    assert_eq!(store.match_count().unwrap(), 3);
}

#[test]
fn match_keys_are_later_then_earlier() {
    let tmp = tempfile::tempdir().unwrap();
    let images = write_sequence(tmp.path(), "S1", 3);
    let store = Store::open_in_memory().unwrap();
    let mut exp = experiment(&store, &images, Combination::new("FAST", "SIFT"), Limits::default());
    exp.create_views(&store).unwrap();
    exp.create_matches(&store).unwrap();

    let keys: Vec<(usize, usize)> = exp.matches().keys().copied().collect();
    assert_eq!(keys, vec![(1, 0), (2, 0), (2, 1)]);

    let views = exp.views();
    assert!(store
        .get_match(views[2].feature_id, views[0].feature_id)
        .unwrap()
        .is_some());
    assert!(store
        .get_match(views[0].feature_id, views[2].feature_id)
        .unwrap()
        .is_none());

    for block in exp.matches().values() {
        assert!(block.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(block.iter().all(|m| m.query_index == m.train_index));
    }
}

#[test]
fn limits_keep_strongest_features_and_best_matches() {
    let tmp = tempfile::tempdir().unwrap();
    let images = write_sequence(tmp.path(), "S1", 2);
    let store = Store::open_in_memory().unwrap();
    let limits = Limits {
        max_features: 3,
        max_matches: 2,
    };
    let mut exp = experiment(&store, &images, Combination::new("FAST", "SIFT"), limits);
    exp.create_views(&store).unwrap();
    exp.create_matches(&store).unwrap();

    let responses: Vec<f32> = exp.views()[0]
        .features
        .keypoints
        .iter()
        .map(|k| k.response)
        .collect();
    assert_eq!(responses, vec![4.0, 3.0, 2.0]);
    assert_eq!(exp.views()[0].features.descriptors.rows(), 3);
    assert_eq!(exp.matches()[&(1, 0)].len(), 2);

    let stats = store.correspondence_stats().unwrap();
    assert_eq!(stats[0].feature_count, 10, "pre-truncation counts are recorded");
    assert_eq!(stats[0].descriptor_size, 2 * 3 * 4 * 4);
    assert_eq!(stats[0].matches_count, 3);
}

#[test]
fn placeholder_detector_keeps_its_own_cache_key() {
    let tmp = tempfile::tempdir().unwrap();
    let images = write_sequence(tmp.path(), "S1", 2);
    let store = Store::open_in_memory().unwrap();

    let mut exp = experiment(&store, &images, Combination::new("None", "SIFT"), Limits::default());
    assert_eq!(exp.combination().effective_detector(), "FAST");
    exp.create_views(&store).unwrap();
    exp.create_matches(&store).unwrap();

    let stats = store.correspondence_stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].combination, Combination::new("None", "SIFT"));
}

#[test]
fn export_writes_one_camera_and_all_views() {
    let tmp = tempfile::tempdir().unwrap();
    let images = write_sequence(tmp.path(), "S1", 3);
    let store = Store::open_in_memory().unwrap();
    let mut exp = experiment(&store, &images, Combination::new("FAST", "SIFT"), Limits::default());
    exp.create_views(&store).unwrap();
    exp.create_matches(&store).unwrap();

    let db = tmp.path().join("databases").join("S1_FAST_SIFT.sqlite");
    std::fs::create_dir_all(db.parent().unwrap()).unwrap();
    std::fs::write(&db, b"stale").unwrap();
    let summary = exp.export(&db, &camera()).unwrap();
    assert_eq!(summary.cameras, 1);
    assert_eq!(summary.images, 3);
    assert_eq!(summary.match_blocks, 3);

    let conn = rusqlite::Connection::open(&db).unwrap();
    let (model, width, height, params): (i64, i64, i64, Vec<u8>) = conn
        .query_row("SELECT model, width, height, params FROM cameras", [], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
        })
        .unwrap();
    assert_eq!((model, width, height), (1, 64, 48));
    assert_eq!(&params[..8], &500.0f64.to_le_bytes());

    let names: Vec<String> = conn
        .prepare("SELECT name FROM images ORDER BY image_id")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(names, vec!["000.png", "001.png", "002.png"]);

    let (rows, cols, len): (i64, i64, i64) = conn
        .query_row(
            "SELECT rows, cols, LENGTH(data) FROM descriptors WHERE image_id = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!((rows, cols, len), (5, 128, 5 * 128));

    // view pair (1, 0) is stored under image ids (1, 2)
    let pair: i64 = 2_147_483_647 + 2;
    let (rows, data): (i64, Vec<u8>) = conn
        .query_row("SELECT rows, data FROM matches WHERE pair_id = ?1", [pair], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(rows, 5);
    assert_eq!(data.len(), 5 * 2 * 4);
}

#[test]
fn cancelled_experiment_stops_before_first_view() {
    let tmp = tempfile::tempdir().unwrap();
    let images = write_sequence(tmp.path(), "S1", 2);
    let store = Store::open_in_memory().unwrap();
    let flag = CancelFlag::new();
    flag.cancel();
    let mut exp = experiment(&store, &images, Combination::new("FAST", "SIFT"), Limits::default())
        .with_cancel_flag(flag);
    assert!(matches!(exp.create_views(&store), Err(ExperimentError::Cancelled)));
    assert_eq!(store.feature_count().unwrap(), 0);
}
