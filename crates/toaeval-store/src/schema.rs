use rusqlite::Connection;

const STORE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sequence (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE);
CREATE TABLE IF NOT EXISTS feature_type (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE);
CREATE TABLE IF NOT EXISTS image (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    UNIQUE(name, sequence),
    FOREIGN KEY(sequence) REFERENCES sequence(id) ON DELETE CASCADE);
CREATE TABLE IF NOT EXISTS image_feature (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    image INTEGER NOT NULL,
    detector_type INTEGER NOT NULL,
    feature_type INTEGER NOT NULL,
    count INTEGER NOT NULL,
    size INTEGER NOT NULL,
    time REAL NOT NULL,
    data BLOB NOT NULL,
    UNIQUE(image, detector_type, feature_type),
    FOREIGN KEY(image) REFERENCES image(id) ON DELETE CASCADE,
    FOREIGN KEY(detector_type) REFERENCES feature_type(id) ON DELETE CASCADE,
    FOREIGN KEY(feature_type) REFERENCES feature_type(id) ON DELETE CASCADE);
CREATE TABLE IF NOT EXISTS feature_match (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    feature1 INTEGER NOT NULL,
    feature2 INTEGER NOT NULL,
    count INTEGER NOT NULL,
    time REAL NOT NULL,
    data BLOB NOT NULL,
    UNIQUE(feature1, feature2),
    FOREIGN KEY(feature1) REFERENCES image_feature(id) ON DELETE CASCADE,
    FOREIGN KEY(feature2) REFERENCES image_feature(id) ON DELETE CASCADE);
CREATE TABLE IF NOT EXISTS analysis (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    sequence INTEGER NOT NULL,
    detector_type INTEGER NOT NULL,
    feature_type INTEGER NOT NULL,
    points INTEGER NOT NULL,
    observations INTEGER NOT NULL,
    error REAL NOT NULL,
    FOREIGN KEY(sequence) REFERENCES sequence(id) ON DELETE CASCADE,
    FOREIGN KEY(detector_type) REFERENCES feature_type(id) ON DELETE CASCADE,
    FOREIGN KEY(feature_type) REFERENCES feature_type(id) ON DELETE CASCADE);
";

const ANALYSIS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS correspondence (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    sequence TEXT NOT NULL,
    detector_type TEXT NOT NULL,
    feature_type TEXT NOT NULL,
    feature_count INTEGER NOT NULL,
    descriptor_size INTEGER NOT NULL,
    descriptor_compressed_size INTEGER NOT NULL,
    extraction_time REAL NOT NULL,
    matches_count INTEGER NOT NULL,
    matching_time REAL NOT NULL);
CREATE TABLE IF NOT EXISTS reconstruction (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    sequence TEXT NOT NULL,
    detector_type TEXT NOT NULL,
    feature_type TEXT NOT NULL,
    points INTEGER NOT NULL,
    observations INTEGER NOT NULL,
    error REAL NOT NULL);
CREATE TABLE IF NOT EXISTS ranking (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    sequence TEXT NOT NULL,
    detector_type1 TEXT NOT NULL,
    feature_type1 TEXT NOT NULL,
    detector_type2 TEXT NOT NULL,
    feature_type2 TEXT NOT NULL,
    points1 INTEGER NOT NULL,
    points2 INTEGER NOT NULL,
    error1 REAL NOT NULL,
    error2 REAL NOT NULL);

CREATE VIEW IF NOT EXISTS ranking_q AS
    SELECT sequence, detector_type1 AS detector_type, feature_type1 AS feature_type,
        SUM(CASE WHEN error1 < error2 THEN 1 ELSE 0 END) AS score
    FROM ranking
    WHERE detector_type1 != 'None' AND detector_type2 != 'None'
    GROUP BY sequence, detector_type1, feature_type1;

CREATE VIEW IF NOT EXISTS ranking_by_feature_q AS
    SELECT feature_type, AVG(score) AS score
    FROM ranking_q
    GROUP BY feature_type;

CREATE VIEW IF NOT EXISTS ranking_by_detector_q AS
    SELECT detector_type, AVG(score) AS score
    FROM ranking_q
    GROUP BY detector_type;

CREATE VIEW IF NOT EXISTS ranking_by_feature_detector_q AS
    SELECT detector_type, feature_type, AVG(score) AS score
    FROM ranking_q
    GROUP BY detector_type, feature_type;

CREATE VIEW IF NOT EXISTS best_detector_by_feature_q AS
    SELECT feature_type, detector_type AS best_detector, score AS best_score
    FROM (
        SELECT feature_type, detector_type, score,
            ROW_NUMBER() OVER (
                PARTITION BY feature_type ORDER BY score DESC, detector_type ASC) AS rn
        FROM ranking_by_feature_detector_q)
    WHERE rn = 1;

CREATE VIEW IF NOT EXISTS best_feature_by_detector_q AS
    SELECT detector_type, feature_type AS best_feature, score AS best_score
    FROM (
        SELECT detector_type, feature_type, score,
            ROW_NUMBER() OVER (
                PARTITION BY detector_type ORDER BY score DESC, feature_type ASC) AS rn
        FROM ranking_by_feature_detector_q)
    WHERE rn = 1;

CREATE VIEW IF NOT EXISTS best_detector_feature_by_sequence_q AS
    SELECT sequence, detector_type AS best_detector, feature_type AS best_feature,
        score AS best_score
    FROM (
        SELECT sequence, detector_type, feature_type, score,
            ROW_NUMBER() OVER (
                PARTITION BY sequence
                ORDER BY score DESC, detector_type ASC, feature_type ASC) AS rn
        FROM ranking_q)
    WHERE rn = 1;
";

pub(crate) fn initialize_store(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(STORE_SCHEMA)
}

pub(crate) fn initialize_analysis(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(ANALYSIS_SCHEMA)
}
