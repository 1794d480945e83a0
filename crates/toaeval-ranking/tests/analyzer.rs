use approx::assert_relative_eq;
use std::path::Path;
use toaeval_core::{Combination, ReconstructionStats};
use toaeval_ranking::{Analyzer, ModelError, ModelReader, POINTS3D_FILE};
use toaeval_store::{AnalysisStore, Store};

fn write_model(root: &Path, artifact: &str, errors: &[f64]) {
    let model = root.join(artifact).join("0");
    std::fs::create_dir_all(&model).unwrap();
    let mut buf = Vec::new();
    buf.extend_from_slice(&(errors.len() as u64).to_le_bytes());
    for (id, error) in errors.iter().enumerate() {
        buf.extend_from_slice(&(id as u64).to_le_bytes());
        buf.extend_from_slice(&[0u8; 3 * 8 + 3]);
        buf.extend_from_slice(&error.to_le_bytes());
        buf.extend_from_slice(&2u64.to_le_bytes());
        buf.extend_from_slice(&[0u8; 2 * 8]);
    }
    std::fs::write(model.join(POINTS3D_FILE), buf).unwrap();
}

#[test]
fn two_combinations_produce_mirrored_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "S1_A_X", &[0.5; 100]);
    write_model(dir.path(), "S1_B_X", &[0.8; 60]);

    let store = Store::open_in_memory().unwrap();
    let mut analysis = AnalysisStore::open_in_memory().unwrap();
    let summary = Analyzer::new(dir.path())
        .analyze(&store, &mut analysis)
        .unwrap();
    assert_eq!(summary.sequences, 1);
    assert_eq!(summary.comparisons, 2);
    assert_eq!(summary.sentinels, 0);

    let rows = analysis.comparisons().unwrap();
    assert_eq!(rows.len(), 2);
    let ab = rows
        .iter()
        .find(|r| r.first == Combination::new("A", "X"))
        .unwrap();
    assert_eq!((ab.points1, ab.points2), (60, 60));
    assert_relative_eq!(ab.error1, 0.5);
    assert_relative_eq!(ab.error2, 0.8);
    let ba = rows
        .iter()
        .find(|r| r.first == Combination::new("B", "X"))
        .unwrap();
    assert_relative_eq!(ba.error1, 0.8);
    assert_relative_eq!(ba.error2, 0.5);

    let scores: Vec<(String, u64)> = analysis
        .ranking()
        .unwrap()
        .into_iter()
        .map(|s| (s.combination.to_string(), s.score))
        .collect();
    assert!(scores.contains(&("A_X".to_string(), 1)));
    assert!(scores.contains(&("B_X".to_string(), 0)));
}

#[test]
fn missing_and_expected_models_become_sentinels() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "S1_FAST_BRIEF", &[1.2, 0.4, 0.9]);
    // failed run: directory without a model
    std::fs::create_dir_all(dir.path().join("S1_CHESS_BRIEF")).unwrap();
    std::fs::create_dir_all(dir.path().join("not-a-combination")).unwrap();

    let analyzer = Analyzer::new(dir.path()).with_expected(vec![
        Combination::new("FAST", "BRIEF"),
        Combination::new("FAST", "PATCH"),
    ]);
    let sequences = analyzer.collect().unwrap();
    let s1 = &sequences["S1"];
    assert_eq!(s1.len(), 3);
    assert_eq!(
        s1[&Combination::new("FAST", "BRIEF")].as_slice(),
        &[0.4, 0.9, 1.2]
    );
    assert!(s1[&Combination::new("CHESS", "BRIEF")].is_sentinel());
    assert!(s1[&Combination::new("FAST", "PATCH")].is_sentinel());

    let store = Store::open_in_memory().unwrap();
    let mut analysis = AnalysisStore::open_in_memory().unwrap();
    let summary = analyzer.analyze(&store, &mut analysis).unwrap();
    assert_eq!(summary.comparisons, 6);
    assert_eq!(summary.sentinels, 2);

    let fast_brief = analysis
        .ranking()
        .unwrap()
        .into_iter()
        .find(|s| s.combination == Combination::new("FAST", "BRIEF"))
        .unwrap();
    assert_eq!(fast_brief.score, 2);
}

#[test]
fn reconstructions_are_copied_from_the_store() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "S1_FAST_BRIEF", &[0.3]);

    let store = Store::open_in_memory().unwrap();
    let stats = ReconstructionStats {
        points: 1200,
        observations: 3400,
        mean_reprojection_error: 0.85,
    };
    store
        .put_reconstruction("S1", &Combination::new("FAST", "BRIEF"), &stats)
        .unwrap();

    let mut analysis = AnalysisStore::open_in_memory().unwrap();
    Analyzer::new(dir.path())
        .analyze(&store, &mut analysis)
        .unwrap();
    let copied = analysis.reconstructions().unwrap();
    assert_eq!(copied.len(), 1);
    assert_eq!(copied[0].stats, stats);
}

struct FailingReader;

impl ModelReader for FailingReader {
    fn point_errors(&self, model: &Path) -> Result<Vec<f64>, ModelError> {
        Err(ModelError::Truncated {
            path: model.to_path_buf(),
            point: 0,
        })
    }
}

#[test]
fn unreadable_models_lose_like_missing_ones() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "S1_FAST_BRIEF", &[0.3]);
    let sequences = Analyzer::new(dir.path())
        .with_reader(FailingReader)
        .collect()
        .unwrap();
    assert!(sequences["S1"][&Combination::new("FAST", "BRIEF")].is_sentinel());
}

#[test]
fn missing_root_is_a_scan_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Analyzer::new(dir.path().join("absent")).collect().unwrap_err();
    assert!(err.to_string().contains("absent"));
}
