//! SQLite record store with OpenMRS table and column names

use super::{DEFAULT_DATATYPES, DEFAULT_MAP_TYPES, RecordStore};
use crate::error::SyncError;
use crate::model::{
    Concept, ConceptAnswer, ConceptClass, ConceptDatatype, ConceptDescription, ConceptId,
    ConceptMapType, ConceptName, ConceptNumeric, ConceptSet, MapKey, NameKey, NewConceptAnswer,
    NewConceptClass, NewConceptDescription, NewConceptName, NewConceptSet, NewReferenceMap,
    NewReferenceSource, NewReferenceTerm, ReferenceMap, ReferenceSource, ReferenceTerm,
};
use crate::result::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS concept_class (
    concept_class_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    creator INTEGER NOT NULL,
    date_created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    retired INTEGER NOT NULL DEFAULT 0,
    retired_by INTEGER,
    uuid TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS concept_datatype (
    concept_datatype_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS concept_map_type (
    concept_map_type_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS concept_reference_source (
    concept_source_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    hl7_code TEXT,
    creator INTEGER NOT NULL,
    date_created TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    retired INTEGER NOT NULL DEFAULT 0,
    retired_by INTEGER,
    uuid TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS concept (
    concept_id INTEGER PRIMARY KEY,
    retired INTEGER NOT NULL DEFAULT 0,
    datatype_id INTEGER NOT NULL REFERENCES concept_datatype (concept_datatype_id),
    class_id INTEGER NOT NULL REFERENCES concept_class (concept_class_id),
    is_set INTEGER NOT NULL DEFAULT 0,
    uuid TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS concept_name (
    concept_name_id INTEGER PRIMARY KEY AUTOINCREMENT,
    concept_id INTEGER NOT NULL REFERENCES concept (concept_id),
    name TEXT NOT NULL,
    concept_name_type TEXT,
    locale TEXT NOT NULL,
    locale_preferred INTEGER NOT NULL DEFAULT 0,
    uuid TEXT
);
CREATE INDEX IF NOT EXISTS concept_name_lookup ON concept_name (name, locale);
CREATE TABLE IF NOT EXISTS concept_description (
    concept_description_id INTEGER PRIMARY KEY AUTOINCREMENT,
    concept_id INTEGER NOT NULL REFERENCES concept (concept_id),
    description TEXT NOT NULL,
    locale TEXT NOT NULL,
    uuid TEXT
);
CREATE TABLE IF NOT EXISTS concept_numeric (
    concept_id INTEGER PRIMARY KEY REFERENCES concept (concept_id),
    hi_absolute REAL,
    hi_critical REAL,
    hi_normal REAL,
    low_absolute REAL,
    low_critical REAL,
    low_normal REAL,
    units TEXT,
    precise INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS concept_reference_term (
    concept_reference_term_id INTEGER PRIMARY KEY AUTOINCREMENT,
    concept_source_id INTEGER NOT NULL REFERENCES concept_reference_source (concept_source_id),
    code TEXT NOT NULL,
    retired INTEGER NOT NULL DEFAULT 0,
    uuid TEXT
);
CREATE TABLE IF NOT EXISTS concept_reference_map (
    concept_map_id INTEGER PRIMARY KEY AUTOINCREMENT,
    concept_id INTEGER NOT NULL REFERENCES concept (concept_id),
    concept_reference_term_id INTEGER NOT NULL REFERENCES concept_reference_term (concept_reference_term_id),
    concept_map_type_id INTEGER NOT NULL REFERENCES concept_map_type (concept_map_type_id),
    uuid TEXT
);
CREATE TABLE IF NOT EXISTS concept_answer (
    concept_answer_id INTEGER PRIMARY KEY AUTOINCREMENT,
    concept_id INTEGER NOT NULL REFERENCES concept (concept_id),
    answer_concept INTEGER NOT NULL REFERENCES concept (concept_id),
    sort_weight REAL,
    uuid TEXT
);
CREATE TABLE IF NOT EXISTS concept_set (
    concept_set_id INTEGER PRIMARY KEY AUTOINCREMENT,
    concept_id INTEGER NOT NULL REFERENCES concept (concept_id),
    concept_set INTEGER NOT NULL REFERENCES concept (concept_id),
    sort_weight REAL,
    uuid TEXT
);
"#;

/// Tables that [`SqliteStore::row_count`] accepts
pub const TABLES: &[&str] = &[
    "concept_class",
    "concept_datatype",
    "concept_map_type",
    "concept_reference_source",
    "concept",
    "concept_name",
    "concept_description",
    "concept_numeric",
    "concept_reference_term",
    "concept_reference_map",
    "concept_answer",
    "concept_set",
];

/// Record store backed by a SQLite database file
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        debug!("Opened SQLite store at {}", path.display());
        Self::bootstrap(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        for name in DEFAULT_DATATYPES {
            conn.execute(
                "INSERT OR IGNORE INTO concept_datatype (name) VALUES (?1)",
                params![name],
            )?;
        }
        for name in DEFAULT_MAP_TYPES {
            conn.execute(
                "INSERT OR IGNORE INTO concept_map_type (name) VALUES (?1)",
                params![name],
            )?;
        }
        Ok(Self { conn })
    }

    /// Start a transaction; writes stay invisible until [`commit`](Self::commit)
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Discard everything written since [`begin`](Self::begin)
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Number of rows in one of the dictionary [`TABLES`]
    pub fn row_count(&self, table: &str) -> Result<i64> {
        if !TABLES.contains(&table) {
            return Err(SyncError::store_error(format!("unknown table '{table}'")));
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}

fn class_from_row(row: &Row<'_>) -> rusqlite::Result<ConceptClass> {
    Ok(ConceptClass {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        creator: row.get(3)?,
        retired: row.get(4)?,
        retired_by: row.get(5)?,
        uuid: row.get(6)?,
    })
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<ReferenceSource> {
    Ok(ReferenceSource {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        hl7_code: row.get(3)?,
        creator: row.get(4)?,
        retired: row.get(5)?,
        retired_by: row.get(6)?,
        uuid: row.get(7)?,
    })
}

fn concept_from_row(row: &Row<'_>) -> rusqlite::Result<Concept> {
    Ok(Concept {
        id: ConceptId(row.get(0)?),
        retired: row.get(1)?,
        datatype_id: row.get(2)?,
        class_id: row.get(3)?,
        is_set: row.get(4)?,
        uuid: row.get(5)?,
    })
}

fn name_from_row(row: &Row<'_>) -> rusqlite::Result<ConceptName> {
    Ok(ConceptName {
        id: row.get(0)?,
        concept_id: ConceptId(row.get(1)?),
        name: row.get(2)?,
        name_type: row.get(3)?,
        locale: row.get(4)?,
        locale_preferred: row.get(5)?,
        uuid: row.get(6)?,
    })
}

fn description_from_row(row: &Row<'_>) -> rusqlite::Result<ConceptDescription> {
    Ok(ConceptDescription {
        id: row.get(0)?,
        concept_id: ConceptId(row.get(1)?),
        description: row.get(2)?,
        locale: row.get(3)?,
        uuid: row.get(4)?,
    })
}

fn numeric_from_row(row: &Row<'_>) -> rusqlite::Result<ConceptNumeric> {
    Ok(ConceptNumeric {
        concept_id: ConceptId(row.get(0)?),
        hi_absolute: row.get(1)?,
        hi_critical: row.get(2)?,
        hi_normal: row.get(3)?,
        low_absolute: row.get(4)?,
        low_critical: row.get(5)?,
        low_normal: row.get(6)?,
        units: row.get(7)?,
        precise: row.get(8)?,
    })
}

fn term_from_row(row: &Row<'_>) -> rusqlite::Result<ReferenceTerm> {
    Ok(ReferenceTerm {
        id: row.get(0)?,
        source_id: row.get(1)?,
        code: row.get(2)?,
        retired: row.get(3)?,
        uuid: row.get(4)?,
    })
}

fn map_from_row(row: &Row<'_>) -> rusqlite::Result<ReferenceMap> {
    Ok(ReferenceMap {
        id: row.get(0)?,
        key: MapKey {
            concept_id: ConceptId(row.get(1)?),
            term_id: row.get(2)?,
            map_type_id: row.get(3)?,
        },
        uuid: row.get(4)?,
    })
}

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<ConceptAnswer> {
    Ok(ConceptAnswer {
        id: row.get(0)?,
        question: ConceptId(row.get(1)?),
        answer: ConceptId(row.get(2)?),
        sort_weight: row.get(3)?,
        uuid: row.get(4)?,
    })
}

fn set_member_from_row(row: &Row<'_>) -> rusqlite::Result<ConceptSet> {
    Ok(ConceptSet {
        id: row.get(0)?,
        member: ConceptId(row.get(1)?),
        owner: ConceptId(row.get(2)?),
        sort_weight: row.get(3)?,
        uuid: row.get(4)?,
    })
}

const CLASS_COLUMNS: &str =
    "concept_class_id, name, description, creator, retired, retired_by, uuid";
const SOURCE_COLUMNS: &str =
    "concept_source_id, name, description, hl7_code, creator, retired, retired_by, uuid";
const NAME_COLUMNS: &str =
    "concept_name_id, concept_id, name, concept_name_type, locale, locale_preferred, uuid";
const TERM_COLUMNS: &str = "concept_reference_term_id, concept_source_id, code, retired, uuid";

impl RecordStore for SqliteStore {
    fn find_class(&self, name: &str) -> Result<Option<ConceptClass>> {
        let sql = format!("SELECT {CLASS_COLUMNS} FROM concept_class WHERE name = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![name], class_from_row)
            .optional()?)
    }

    fn insert_class(&mut self, class: NewConceptClass) -> Result<ConceptClass> {
        self.conn.execute(
            "INSERT INTO concept_class (name, description, creator, retired, retired_by, uuid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                class.name,
                class.description,
                class.creator,
                class.retired,
                class.retired_by,
                class.uuid
            ],
        )?;
        Ok(ConceptClass {
            id: self.conn.last_insert_rowid(),
            name: class.name,
            description: class.description,
            creator: class.creator,
            retired: class.retired,
            retired_by: class.retired_by,
            uuid: class.uuid,
        })
    }

    fn find_datatype(&self, name: &str) -> Result<Option<ConceptDatatype>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_datatype_id, name FROM concept_datatype WHERE name = ?1",
                params![name],
                |row| {
                    Ok(ConceptDatatype {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn find_map_type(&self, name: &str) -> Result<Option<ConceptMapType>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_map_type_id, name FROM concept_map_type WHERE name = ?1",
                params![name],
                |row| {
                    Ok(ConceptMapType {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn find_source(&self, name: &str) -> Result<Option<ReferenceSource>> {
        let sql = format!("SELECT {SOURCE_COLUMNS} FROM concept_reference_source WHERE name = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![name], source_from_row)
            .optional()?)
    }

    fn insert_source(&mut self, source: NewReferenceSource) -> Result<ReferenceSource> {
        self.conn.execute(
            "INSERT INTO concept_reference_source
                 (name, description, hl7_code, creator, retired, retired_by, uuid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                source.name,
                source.description,
                source.hl7_code,
                source.creator,
                source.retired,
                source.retired_by,
                source.uuid
            ],
        )?;
        Ok(ReferenceSource {
            id: self.conn.last_insert_rowid(),
            name: source.name,
            description: source.description,
            hl7_code: source.hl7_code,
            creator: source.creator,
            retired: source.retired,
            retired_by: source.retired_by,
            uuid: source.uuid,
        })
    }

    fn list_sources(&self) -> Result<Vec<ReferenceSource>> {
        let sql = format!(
            "SELECT {SOURCE_COLUMNS} FROM concept_reference_source ORDER BY concept_source_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], source_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_concept(&self, id: ConceptId) -> Result<Option<Concept>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_id, retired, datatype_id, class_id, is_set, uuid
                 FROM concept WHERE concept_id = ?1",
                params![id.0],
                concept_from_row,
            )
            .optional()?)
    }

    fn max_concept_id(&self) -> Result<Option<ConceptId>> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(concept_id) FROM concept", [], |row| row.get(0))?;
        Ok(max.map(ConceptId))
    }

    fn insert_concept(&mut self, concept: Concept) -> Result<Concept> {
        self.conn.execute(
            "INSERT INTO concept (concept_id, retired, datatype_id, class_id, is_set, uuid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                concept.id.0,
                concept.retired,
                concept.datatype_id,
                concept.class_id,
                concept.is_set,
                concept.uuid
            ],
        )?;
        Ok(concept)
    }

    fn find_names(&self, key: &NameKey) -> Result<Vec<ConceptName>> {
        let sql = format!(
            "SELECT {NAME_COLUMNS} FROM concept_name
             WHERE name = ?1 AND concept_name_type IS ?2 AND locale = ?3 AND locale_preferred = ?4
             ORDER BY concept_name_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![key.name, key.name_type, key.locale, key.locale_preferred],
            name_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_name(&mut self, name: NewConceptName) -> Result<ConceptName> {
        self.conn.execute(
            "INSERT INTO concept_name
                 (concept_id, name, concept_name_type, locale, locale_preferred, uuid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name.concept_id.0,
                name.key.name,
                name.key.name_type,
                name.key.locale,
                name.key.locale_preferred,
                name.uuid
            ],
        )?;
        Ok(ConceptName {
            id: self.conn.last_insert_rowid(),
            concept_id: name.concept_id,
            name: name.key.name,
            name_type: name.key.name_type,
            locale: name.key.locale,
            locale_preferred: name.key.locale_preferred,
            uuid: name.uuid,
        })
    }

    fn find_description(
        &self,
        concept_id: ConceptId,
        description: &str,
        uuid: Option<&str>,
    ) -> Result<Option<ConceptDescription>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_description_id, concept_id, description, locale, uuid
                 FROM concept_description
                 WHERE concept_id = ?1 AND description = ?2 AND uuid IS ?3",
                params![concept_id.0, description, uuid],
                description_from_row,
            )
            .optional()?)
    }

    fn insert_description(
        &mut self,
        description: NewConceptDescription,
    ) -> Result<ConceptDescription> {
        self.conn.execute(
            "INSERT INTO concept_description (concept_id, description, locale, uuid)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                description.concept_id.0,
                description.description,
                description.locale,
                description.uuid
            ],
        )?;
        Ok(ConceptDescription {
            id: self.conn.last_insert_rowid(),
            concept_id: description.concept_id,
            description: description.description,
            locale: description.locale,
            uuid: description.uuid,
        })
    }

    fn find_numeric(&self, concept_id: ConceptId) -> Result<Option<ConceptNumeric>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_id, hi_absolute, hi_critical, hi_normal, low_absolute,
                        low_critical, low_normal, units, precise
                 FROM concept_numeric WHERE concept_id = ?1",
                params![concept_id.0],
                numeric_from_row,
            )
            .optional()?)
    }

    fn insert_numeric(&mut self, numeric: ConceptNumeric) -> Result<ConceptNumeric> {
        self.conn.execute(
            "INSERT INTO concept_numeric
                 (concept_id, hi_absolute, hi_critical, hi_normal, low_absolute,
                  low_critical, low_normal, units, precise)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                numeric.concept_id.0,
                numeric.hi_absolute,
                numeric.hi_critical,
                numeric.hi_normal,
                numeric.low_absolute,
                numeric.low_critical,
                numeric.low_normal,
                numeric.units,
                numeric.precise
            ],
        )?;
        Ok(numeric)
    }

    fn find_term(&self, source_id: i64, code: &str) -> Result<Option<ReferenceTerm>> {
        let sql = format!(
            "SELECT {TERM_COLUMNS} FROM concept_reference_term
             WHERE concept_source_id = ?1 AND code = ?2
             ORDER BY concept_reference_term_id LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, params![source_id, code], term_from_row)
            .optional()?)
    }

    fn find_term_by_uuid(&self, uuid: &str) -> Result<Option<ReferenceTerm>> {
        let sql = format!(
            "SELECT {TERM_COLUMNS} FROM concept_reference_term WHERE uuid = ?1
             ORDER BY concept_reference_term_id LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, params![uuid], term_from_row)
            .optional()?)
    }

    fn insert_term(&mut self, term: NewReferenceTerm) -> Result<ReferenceTerm> {
        self.conn.execute(
            "INSERT INTO concept_reference_term (concept_source_id, code, retired, uuid)
             VALUES (?1, ?2, ?3, ?4)",
            params![term.source_id, term.code, term.retired, term.uuid],
        )?;
        Ok(ReferenceTerm {
            id: self.conn.last_insert_rowid(),
            source_id: term.source_id,
            code: term.code,
            retired: term.retired,
            uuid: term.uuid,
        })
    }

    fn find_map(&self, key: &MapKey) -> Result<Option<ReferenceMap>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_map_id, concept_id, concept_reference_term_id,
                        concept_map_type_id, uuid
                 FROM concept_reference_map
                 WHERE concept_id = ?1 AND concept_reference_term_id = ?2
                   AND concept_map_type_id = ?3
                 ORDER BY concept_map_id LIMIT 1",
                params![key.concept_id.0, key.term_id, key.map_type_id],
                map_from_row,
            )
            .optional()?)
    }

    fn insert_map(&mut self, map: NewReferenceMap) -> Result<ReferenceMap> {
        self.conn.execute(
            "INSERT INTO concept_reference_map
                 (concept_id, concept_reference_term_id, concept_map_type_id, uuid)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                map.key.concept_id.0,
                map.key.term_id,
                map.key.map_type_id,
                map.uuid
            ],
        )?;
        Ok(ReferenceMap {
            id: self.conn.last_insert_rowid(),
            key: map.key,
            uuid: map.uuid,
        })
    }

    fn find_answer(
        &self,
        question: ConceptId,
        answer: ConceptId,
    ) -> Result<Option<ConceptAnswer>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_answer_id, concept_id, answer_concept, sort_weight, uuid
                 FROM concept_answer WHERE concept_id = ?1 AND answer_concept = ?2
                 ORDER BY concept_answer_id LIMIT 1",
                params![question.0, answer.0],
                answer_from_row,
            )
            .optional()?)
    }

    fn insert_answer(&mut self, answer: NewConceptAnswer) -> Result<ConceptAnswer> {
        self.conn.execute(
            "INSERT INTO concept_answer (concept_id, answer_concept, sort_weight, uuid)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                answer.question.0,
                answer.answer.0,
                answer.sort_weight,
                answer.uuid
            ],
        )?;
        Ok(ConceptAnswer {
            id: self.conn.last_insert_rowid(),
            question: answer.question,
            answer: answer.answer,
            sort_weight: answer.sort_weight,
            uuid: answer.uuid,
        })
    }

    fn find_set_member(&self, owner: ConceptId, member: ConceptId) -> Result<Option<ConceptSet>> {
        Ok(self
            .conn
            .query_row(
                "SELECT concept_set_id, concept_id, concept_set, sort_weight, uuid
                 FROM concept_set WHERE concept_set = ?1 AND concept_id = ?2
                 ORDER BY concept_set_id LIMIT 1",
                params![owner.0, member.0],
                set_member_from_row,
            )
            .optional()?)
    }

    fn insert_set_member(&mut self, member: NewConceptSet) -> Result<ConceptSet> {
        self.conn.execute(
            "INSERT INTO concept_set (concept_id, concept_set, sort_weight, uuid)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                member.member.0,
                member.owner.0,
                member.sort_weight,
                member.uuid
            ],
        )?;
        Ok(ConceptSet {
            id: self.conn.last_insert_rowid(),
            owner: member.owner,
            member: member.member,
            sort_weight: member.sort_weight,
            uuid: member.uuid,
        })
    }
}
