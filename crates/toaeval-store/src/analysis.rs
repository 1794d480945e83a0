use crate::error::StoreResult;
use crate::records::{
    BestCombination, BestOf, CombinationScore, CorrespondenceStats, GroupScore,
    ReconstructionRecord, SequenceScore,
};
use crate::schema;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use toaeval_core::{Combination, PairwiseComparison, ReconstructionStats};

/// Output database of one analysis run.
///
/// Holds the tournament rows, copies of the per-combination statistics and
/// the ranking views derived from them.
pub struct AnalysisStore {
    conn: Connection,
}

impl AnalysisStore {
    /// Create a fresh analysis database at `path`, replacing any previous one.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open an existing analysis database without touching its contents.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        schema::initialize_analysis(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert_comparisons(&mut self, rows: &[PairwiseComparison]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ranking(sequence, detector_type1, feature_type1,
                    detector_type2, feature_type2, points1, points2, error1, error2)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.sequence,
                    row.first.detector,
                    row.first.descriptor,
                    row.second.detector,
                    row.second.descriptor,
                    row.points1 as i64,
                    row.points2 as i64,
                    row.error1,
                    row.error2
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_reconstructions(&mut self, rows: &[ReconstructionRecord]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO reconstruction(sequence, detector_type, feature_type,
                    points, observations, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.sequence,
                    row.combination.detector,
                    row.combination.descriptor,
                    row.stats.points as i64,
                    row.stats.observations as i64,
                    row.stats.mean_reprojection_error
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_correspondence(&mut self, rows: &[CorrespondenceStats]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO correspondence(sequence, detector_type, feature_type,
                    feature_count, descriptor_size, descriptor_compressed_size,
                    extraction_time, matches_count, matching_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.sequence,
                    row.combination.detector,
                    row.combination.descriptor,
                    row.feature_count as i64,
                    row.descriptor_size as i64,
                    row.descriptor_compressed_size as i64,
                    row.extraction_time,
                    row.matches_count as i64,
                    row.matching_time
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Tournament rows in insertion order.
    pub fn comparisons(&self) -> StoreResult<Vec<PairwiseComparison>> {
        self.collect(
            "SELECT sequence, detector_type1, feature_type1, detector_type2, feature_type2,
                points1, points2, error1, error2
             FROM ranking ORDER BY id",
            |row| {
                Ok(PairwiseComparison {
                    sequence: row.get(0)?,
                    first: combination(row, 1)?,
                    second: combination(row, 3)?,
                    points1: row.get::<_, i64>(5)? as usize,
                    points2: row.get::<_, i64>(6)? as usize,
                    error1: row.get(7)?,
                    error2: row.get(8)?,
                })
            },
        )
    }

    pub fn reconstructions(&self) -> StoreResult<Vec<ReconstructionRecord>> {
        self.collect(
            "SELECT sequence, detector_type, feature_type, points, observations, error
             FROM reconstruction ORDER BY id",
            |row| {
                Ok(ReconstructionRecord {
                    sequence: row.get(0)?,
                    combination: combination(row, 1)?,
                    stats: ReconstructionStats {
                        points: row.get::<_, i64>(3)? as u64,
                        observations: row.get::<_, i64>(4)? as u64,
                        mean_reprojection_error: row.get(5)?,
                    },
                })
            },
        )
    }

    pub fn correspondence(&self) -> StoreResult<Vec<CorrespondenceStats>> {
        self.collect(
            "SELECT sequence, detector_type, feature_type, feature_count, descriptor_size,
                descriptor_compressed_size, extraction_time, matches_count, matching_time
             FROM correspondence ORDER BY id",
            |row| {
                Ok(CorrespondenceStats {
                    sequence: row.get(0)?,
                    combination: combination(row, 1)?,
                    feature_count: row.get::<_, i64>(3)? as u64,
                    descriptor_size: row.get::<_, i64>(4)? as u64,
                    descriptor_compressed_size: row.get::<_, i64>(5)? as u64,
                    extraction_time: row.get(6)?,
                    matches_count: row.get::<_, i64>(7)? as u64,
                    matching_time: row.get(8)?,
                })
            },
        )
    }

    /// `ranking_q`: wins per (sequence, combination), best first.
    pub fn ranking(&self) -> StoreResult<Vec<SequenceScore>> {
        self.collect(
            "SELECT sequence, detector_type, feature_type, score FROM ranking_q
             ORDER BY sequence, score DESC, detector_type, feature_type",
            |row| {
                Ok(SequenceScore {
                    sequence: row.get(0)?,
                    combination: combination(row, 1)?,
                    score: row.get::<_, i64>(3)? as u64,
                })
            },
        )
    }

    /// `ranking_by_feature_q`: average score per descriptor.
    pub fn ranking_by_feature(&self) -> StoreResult<Vec<GroupScore>> {
        self.collect(
            "SELECT feature_type, score FROM ranking_by_feature_q
             ORDER BY score DESC, feature_type",
            group_score,
        )
    }

    /// `ranking_by_detector_q`: average score per detector.
    pub fn ranking_by_detector(&self) -> StoreResult<Vec<GroupScore>> {
        self.collect(
            "SELECT detector_type, score FROM ranking_by_detector_q
             ORDER BY score DESC, detector_type",
            group_score,
        )
    }

    /// `ranking_by_feature_detector_q`: average score per combination,
    /// grouped by descriptor.
    pub fn ranking_by_feature_detector(&self) -> StoreResult<Vec<CombinationScore>> {
        self.collect(
            "SELECT detector_type, feature_type, score FROM ranking_by_feature_detector_q
             ORDER BY feature_type, score DESC, detector_type",
            |row| {
                Ok(CombinationScore {
                    combination: combination(row, 0)?,
                    score: row.get(2)?,
                })
            },
        )
    }

    /// `best_detector_by_feature_q`: one row per descriptor.
    pub fn best_detector_by_feature(&self) -> StoreResult<Vec<BestOf>> {
        self.collect(
            "SELECT feature_type, best_detector, best_score FROM best_detector_by_feature_q
             ORDER BY feature_type",
            best_of,
        )
    }

    /// `best_feature_by_detector_q`: one row per detector.
    pub fn best_feature_by_detector(&self) -> StoreResult<Vec<BestOf>> {
        self.collect(
            "SELECT detector_type, best_feature, best_score FROM best_feature_by_detector_q
             ORDER BY detector_type",
            best_of,
        )
    }

    /// `best_detector_feature_by_sequence_q`: one row per sequence.
    pub fn best_detector_feature_by_sequence(&self) -> StoreResult<Vec<BestCombination>> {
        self.collect(
            "SELECT sequence, best_detector, best_feature, best_score
             FROM best_detector_feature_by_sequence_q
             ORDER BY sequence",
            |row| {
                Ok(BestCombination {
                    sequence: row.get(0)?,
                    combination: combination(row, 1)?,
                    score: row.get::<_, i64>(3)? as u64,
                })
            },
        )
    }

    fn collect<T, F>(&self, sql: &str, map: F) -> StoreResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], map)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn combination(row: &Row<'_>, first_column: usize) -> rusqlite::Result<Combination> {
    Ok(Combination::new(
        row.get::<_, String>(first_column)?,
        row.get::<_, String>(first_column + 1)?,
    ))
}

fn group_score(row: &Row<'_>) -> rusqlite::Result<GroupScore> {
    Ok(GroupScore {
        name: row.get(0)?,
        score: row.get(1)?,
    })
}

fn best_of(row: &Row<'_>) -> rusqlite::Result<BestOf> {
    Ok(BestOf {
        group: row.get(0)?,
        best: row.get(1)?,
        score: row.get(2)?,
    })
}
