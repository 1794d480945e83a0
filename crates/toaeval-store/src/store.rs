use crate::codec;
use crate::error::{is_constraint_violation, StoreError, StoreResult};
use crate::records::{CorrespondenceStats, ReconstructionRecord};
use crate::schema;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use toaeval_core::{Combination, CorrespondenceRecord, FeatureSet, ReconstructionStats};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(pub i64);

/// Id of a detector or descriptor name; both roles share one namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureTypeId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchId(pub i64);

/// Identity of a feature record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    pub image: ImageId,
    pub detector: FeatureTypeId,
    pub descriptor: FeatureTypeId,
}

/// Data written with a new feature record.
#[derive(Clone, Copy, Debug)]
pub struct FeatureEntry<'a> {
    /// Keypoints found before truncation.
    pub count: usize,
    /// Raw size of the stored descriptor rows in bytes.
    pub size: usize,
    pub elapsed: Duration,
    pub features: &'a FeatureSet,
}

/// Data written with a new match record.
#[derive(Clone, Copy, Debug)]
pub struct MatchEntry<'a> {
    /// Correspondences found before truncation.
    pub count: usize,
    pub elapsed: Duration,
    pub matches: &'a [CorrespondenceRecord],
}

/// Memoization cache for features, matches and reconstruction outcomes.
///
/// Writes open a transaction lazily; [`Store::commit`] makes everything
/// written since the previous commit durable. Dropping the store without
/// committing discards the pending writes.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::initialize_store(&conn)?;
        Ok(Self { conn })
    }

    fn begin(&self) -> StoreResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Make all pending writes durable. A no-op when nothing is pending.
    pub fn commit(&self) -> StoreResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Commit and close.
    pub fn close(self) -> StoreResult<()> {
        self.commit()?;
        self.conn.close().map_err(|(_, err)| StoreError::from(err))
    }

    fn named_id(&self, table: &str, name: &str) -> StoreResult<i64> {
        let select = format!("SELECT id FROM {table} WHERE name = ?1");
        if let Some(id) = self
            .conn
            .query_row(&select, params![name], |row| row.get(0))
            .optional()?
        {
            return Ok(id);
        }
        self.begin()?;
        self.conn
            .execute(&format!("INSERT INTO {table}(name) VALUES (?1)"), params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Id of the sequence called `name`, created on first reference.
    pub fn sequence_id(&self, name: &str) -> StoreResult<SequenceId> {
        self.named_id("sequence", name).map(SequenceId)
    }

    /// Id of the detector/descriptor name, created on first reference.
    pub fn feature_type_id(&self, name: &str) -> StoreResult<FeatureTypeId> {
        self.named_id("feature_type", name).map(FeatureTypeId)
    }

    /// Id of the image at `path` within `sequence`, created on first reference.
    pub fn image_id(&self, path: &str, sequence: SequenceId) -> StoreResult<ImageId> {
        if let Some(id) = self
            .conn
            .query_row(
                "SELECT id FROM image WHERE name = ?1 AND sequence = ?2",
                params![path, sequence.0],
                |row| row.get(0),
            )
            .optional()?
        {
            return Ok(ImageId(id));
        }
        self.begin()?;
        self.conn.execute(
            "INSERT INTO image(name, sequence) VALUES (?1, ?2)",
            params![path, sequence.0],
        )?;
        Ok(ImageId(self.conn.last_insert_rowid()))
    }

    /// Cached features for `key`, or `None` on a miss.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn get_feature(&self, key: &FeatureKey) -> StoreResult<Option<(FeatureId, FeatureSet)>> {
        let row: Option<(i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT id, data FROM image_feature
                 WHERE image = ?1 AND detector_type = ?2 AND feature_type = ?3",
                params![key.image.0, key.detector.0, key.descriptor.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((id, blob)) => Ok(Some((FeatureId(id), codec::decode(&blob)?))),
            None => Ok(None),
        }
    }

    /// Insert a feature record. Fails with [`StoreError::DuplicateFeature`]
    /// when one already exists for `key`.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, entry)))]
    pub fn put_feature(&self, key: &FeatureKey, entry: FeatureEntry<'_>) -> StoreResult<FeatureId> {
        let blob = codec::encode(entry.features)?;
        self.begin()?;
        let inserted = self.conn.execute(
            "INSERT INTO image_feature(image, detector_type, feature_type, count, size, time, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                key.image.0,
                key.detector.0,
                key.descriptor.0,
                entry.count as i64,
                entry.size as i64,
                entry.elapsed.as_secs_f64(),
                blob
            ],
        );
        match inserted {
            Ok(_) => Ok(FeatureId(self.conn.last_insert_rowid())),
            Err(err) if is_constraint_violation(&err) => Err(StoreError::DuplicateFeature {
                image: key.image.0,
                detector: key.detector.0,
                descriptor: key.descriptor.0,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Cached matches for the ordered pair `(first, second)`. The reverse
    /// pair is a different key.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn get_match(
        &self,
        first: FeatureId,
        second: FeatureId,
    ) -> StoreResult<Option<(MatchId, Vec<CorrespondenceRecord>)>> {
        let row: Option<(i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT id, data FROM feature_match WHERE feature1 = ?1 AND feature2 = ?2",
                params![first.0, second.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((id, blob)) => Ok(Some((MatchId(id), codec::decode(&blob)?))),
            None => Ok(None),
        }
    }

    /// Insert a match record for the ordered pair `(first, second)`.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, entry)))]
    pub fn put_match(
        &self,
        first: FeatureId,
        second: FeatureId,
        entry: MatchEntry<'_>,
    ) -> StoreResult<MatchId> {
        let blob = codec::encode(entry.matches)?;
        self.begin()?;
        let inserted = self.conn.execute(
            "INSERT INTO feature_match(feature1, feature2, count, time, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                first.0,
                second.0,
                entry.count as i64,
                entry.elapsed.as_secs_f64(),
                blob
            ],
        );
        match inserted {
            Ok(_) => Ok(MatchId(self.conn.last_insert_rowid())),
            Err(err) if is_constraint_violation(&err) => Err(StoreError::DuplicateMatch {
                first: first.0,
                second: second.0,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Record the reconstruction outcome of `combination` on `sequence`.
    pub fn put_reconstruction(
        &self,
        sequence: &str,
        combination: &Combination,
        stats: &ReconstructionStats,
    ) -> StoreResult<()> {
        let sequence = self.sequence_id(sequence)?;
        let detector = self.feature_type_id(&combination.detector)?;
        let descriptor = self.feature_type_id(&combination.descriptor)?;
        self.begin()?;
        self.conn.execute(
            "INSERT INTO analysis(sequence, detector_type, feature_type, points, observations, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                sequence.0,
                detector.0,
                descriptor.0,
                stats.points as i64,
                stats.observations as i64,
                stats.mean_reprojection_error
            ],
        )?;
        Ok(())
    }

    /// All reconstruction outcomes, ordered by sequence and combination name.
    pub fn reconstructions(&self) -> StoreResult<Vec<ReconstructionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT sequence.name, detector_type.name, feature_type.name,
                analysis.points, analysis.observations, analysis.error
             FROM analysis
                INNER JOIN sequence ON analysis.sequence = sequence.id
                INNER JOIN feature_type AS detector_type ON analysis.detector_type = detector_type.id
                INNER JOIN feature_type ON analysis.feature_type = feature_type.id
             ORDER BY sequence.name, detector_type.name, feature_type.name, analysis.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ReconstructionRecord {
                sequence: row.get(0)?,
                combination: Combination::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                stats: ReconstructionStats {
                    points: row.get::<_, i64>(3)? as u64,
                    observations: row.get::<_, i64>(4)? as u64,
                    mean_reprojection_error: row.get(5)?,
                },
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Feature and match statistics summed per (sequence, detector, descriptor).
    ///
    /// Matches are attributed through their first feature. Combinations with
    /// features but no matches report zero matches.
    pub fn correspondence_stats(&self) -> StoreResult<Vec<CorrespondenceStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT sequence.name, detector_type.name, feature_type.name,
                F.feature_count, F.descriptor_size, F.compressed_size, F.extraction_time,
                COALESCE(M.matches_count, 0), COALESCE(M.matching_time, 0.0)
             FROM (
                SELECT image.sequence AS sequence,
                    image_feature.detector_type AS detector_type,
                    image_feature.feature_type AS feature_type,
                    SUM(image_feature.count) AS feature_count,
                    SUM(image_feature.size) AS descriptor_size,
                    SUM(LENGTH(image_feature.data)) AS compressed_size,
                    SUM(image_feature.time) AS extraction_time
                FROM image_feature
                    INNER JOIN image ON image_feature.image = image.id
                GROUP BY image.sequence, image_feature.detector_type, image_feature.feature_type
             ) AS F
             LEFT JOIN (
                SELECT image.sequence AS sequence,
                    image_feature.detector_type AS detector_type,
                    image_feature.feature_type AS feature_type,
                    SUM(feature_match.count) AS matches_count,
                    SUM(feature_match.time) AS matching_time
                FROM feature_match
                    INNER JOIN image_feature ON feature_match.feature1 = image_feature.id
                    INNER JOIN image ON image_feature.image = image.id
                GROUP BY image.sequence, image_feature.detector_type, image_feature.feature_type
             ) AS M
                ON F.sequence = M.sequence
                AND F.detector_type = M.detector_type
                AND F.feature_type = M.feature_type
             INNER JOIN sequence ON F.sequence = sequence.id
             INNER JOIN feature_type AS detector_type ON F.detector_type = detector_type.id
             INNER JOIN feature_type ON F.feature_type = feature_type.id
             ORDER BY sequence.name, detector_type.name, feature_type.name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CorrespondenceStats {
                sequence: row.get(0)?,
                combination: Combination::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                feature_count: row.get::<_, i64>(3)? as u64,
                descriptor_size: row.get::<_, i64>(4)? as u64,
                descriptor_compressed_size: row.get::<_, i64>(5)? as u64,
                extraction_time: row.get(6)?,
                matches_count: row.get::<_, i64>(7)? as u64,
                matching_time: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Number of stored feature records.
    pub fn feature_count(&self) -> StoreResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM image_feature", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Number of stored match records.
    pub fn match_count(&self) -> StoreResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM feature_match", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toaeval_core::{Descriptors, KeypointRecord};

    fn features(n: usize) -> FeatureSet {
        let keypoints = (0..n).map(|i| KeypointRecord::new(i as f32, 1.0)).collect();
        let descriptors = Descriptors::Binary {
            width: 4,
            data: vec![7u8; 4 * n],
        };
        FeatureSet::new(keypoints, descriptors).unwrap()
    }

    fn key(store: &Store, image: &str) -> FeatureKey {
        let sequence = store.sequence_id("S1").unwrap();
        FeatureKey {
            image: store.image_id(image, sequence).unwrap(),
            detector: store.feature_type_id("FAST").unwrap(),
            descriptor: store.feature_type_id("BRIEF").unwrap(),
        }
    }

    fn put(store: &Store, key: &FeatureKey, set: &FeatureSet) -> StoreResult<FeatureId> {
        store.put_feature(
            key,
            FeatureEntry {
                count: set.len(),
                size: set.descriptors.nbytes(),
                elapsed: Duration::from_millis(5),
                features: set,
            },
        )
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let a = store.sequence_id("S1").unwrap();
        assert_eq!(store.sequence_id("S1").unwrap(), a);
        assert_ne!(store.sequence_id("S2").unwrap(), a);

        let fast = store.feature_type_id("FAST").unwrap();
        assert_eq!(store.feature_type_id("FAST").unwrap(), fast);

        let img = store.image_id("/data/S1/0.jpg", a).unwrap();
        assert_eq!(store.image_id("/data/S1/0.jpg", a).unwrap(), img);
        let other = store.sequence_id("S2").unwrap();
        assert_ne!(store.image_id("/data/S1/0.jpg", other).unwrap(), img);
    }

    #[test]
    fn feature_round_trip_and_miss() {
        let store = Store::open_in_memory().unwrap();
        let key = key(&store, "/a.jpg");
        assert!(store.get_feature(&key).unwrap().is_none());

        let set = features(3);
        let id = put(&store, &key, &set).unwrap();
        let (found, loaded) = store.get_feature(&key).unwrap().expect("hit");
        assert_eq!(found, id);
        assert_eq!(loaded, set);
    }

    #[test]
    fn duplicate_feature_fails_loudly() {
        let store = Store::open_in_memory().unwrap();
        let key = key(&store, "/a.jpg");
        put(&store, &key, &features(2)).unwrap();
        let err = put(&store, &key, &features(5)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateFeature { .. }));
        let (_, kept) = store.get_feature(&key).unwrap().unwrap();
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn match_lookup_is_ordered() {
        let store = Store::open_in_memory().unwrap();
        let a = put(&store, &key(&store, "/a.jpg"), &features(2)).unwrap();
        let b = put(&store, &key(&store, "/b.jpg"), &features(2)).unwrap();

        let matches = vec![CorrespondenceRecord::new(0, 1, 3.0)];
        store
            .put_match(
                b,
                a,
                MatchEntry {
                    count: 1,
                    elapsed: Duration::from_millis(1),
                    matches: &matches,
                },
            )
            .unwrap();

        let (_, hit) = store.get_match(b, a).unwrap().expect("hit");
        assert_eq!(hit, matches);
        assert!(store.get_match(a, b).unwrap().is_none());

        let dup = store.put_match(
            b,
            a,
            MatchEntry {
                count: 1,
                elapsed: Duration::ZERO,
                matches: &matches,
            },
        );
        assert!(matches!(dup, Err(StoreError::DuplicateMatch { .. })));
    }

    #[test]
    fn correspondence_stats_sum_per_combination() {
        let store = Store::open_in_memory().unwrap();
        let a = put(&store, &key(&store, "/a.jpg"), &features(2)).unwrap();
        let b = put(&store, &key(&store, "/b.jpg"), &features(3)).unwrap();
        let matches = vec![
            CorrespondenceRecord::new(0, 0, 1.0),
            CorrespondenceRecord::new(1, 1, 2.0),
        ];
        store
            .put_match(
                b,
                a,
                MatchEntry {
                    count: 4,
                    elapsed: Duration::from_millis(2),
                    matches: &matches,
                },
            )
            .unwrap();

        let stats = store.correspondence_stats().unwrap();
        assert_eq!(stats.len(), 1);
        let s = &stats[0];
        assert_eq!(s.sequence, "S1");
        assert_eq!(s.combination, Combination::new("FAST", "BRIEF"));
        assert_eq!(s.feature_count, 5);
        assert_eq!(s.descriptor_size, 20);
        assert!(s.descriptor_compressed_size > 0);
        assert_eq!(s.matches_count, 4);
        approx::assert_relative_eq!(s.extraction_time, 0.010, epsilon = 1e-9);
    }

    #[test]
    fn reconstructions_are_listed_by_name() {
        let store = Store::open_in_memory().unwrap();
        let stats = ReconstructionStats {
            points: 1200,
            observations: 3400,
            mean_reprojection_error: 0.85,
        };
        store
            .put_reconstruction("S1", &Combination::new("FAST", "SIFT"), &stats)
            .unwrap();
        let all = store.reconstructions().unwrap();
        assert_eq!(
            all,
            vec![ReconstructionRecord {
                sequence: "S1".into(),
                combination: Combination::new("FAST", "SIFT"),
                stats,
            }]
        );
    }
}
