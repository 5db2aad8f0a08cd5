//! SQLite-backed store
//!
//! The connection is opened read-only and shared behind a mutex; every
//! query is a single prepared statement with positional parameters.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use tracing::debug;

use crate::codec::{text_sort_key, Token};
use crate::metadata::{CategoryDescriptor, FieldDescriptor, FieldType};
use crate::model::{
    AffectedStatus, OntologyClass, Person, Phenotype, PhenotypicFeature, Sample, Sex, Subject,
};
use crate::query::{quote_ident, SqlFragment, TEXT_KEY_FN};

use super::errors::{StoreError, StoreResult};
use super::schema::{CATEGORIES_TABLE, METADATA_TABLE};
use super::{MetadataSource, Row, RowSource};

/// Read-only report database
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens an existing report database read-only
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path.as_ref(), flags)?;
        debug!(path = %path.as_ref().display(), "opened report database");
        Self::from_connection(connection)
    }

    /// Wraps an already open connection, e.g. an in-memory database
    pub fn from_connection(connection: Connection) -> StoreResult<Self> {
        register_functions(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Registers the SQL functions compiled ORDER BY clauses rely on
fn register_functions(connection: &Connection) -> StoreResult<()> {
    connection.create_scalar_function(
        TEXT_KEY_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Null => None,
                value => Some(text_sort_key(&token(value).to_text())),
            })
        },
    )?;
    Ok(())
}

fn token(value: ValueRef<'_>) -> Token {
    match value {
        ValueRef::Null => Token::Null,
        ValueRef::Integer(n) => Token::Integer(n),
        ValueRef::Real(f) => Token::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Token::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl RowSource for SqliteStore {
    fn table_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn fetch_rows(&self, query: &SqlFragment) -> StoreResult<Vec<Row>> {
        debug!(sql = %query.sql, params = query.params.len(), "fetching rows");
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&query.sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = HashMap::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                values.insert(name.clone(), token(row.get_ref(i)?));
            }
            out.push(values);
        }
        Ok(out)
    }

    fn count(&self, query: &SqlFragment) -> StoreResult<u64> {
        debug!(sql = %query.sql, params = query.params.len(), "counting rows");
        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            &query.sql,
            params_from_iter(query.params.iter()),
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

impl MetadataSource for SqliteStore {
    fn field_descriptors(&self) -> StoreResult<Vec<FieldDescriptor>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, parent, fieldType, nested, separator, numberType, numberCount, type, \
             label, description, required FROM {} ORDER BY ord",
            METADATA_TABLE
        ))?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(2)?,
                    FieldDescriptor {
                        id: row.get(0)?,
                        // replaced below once the type token is checked
                        field_type: FieldType::Info,
                        parent: row.get(1)?,
                        nested: row.get(3)?,
                        separator: row.get(4)?,
                        number_type: row.get(5)?,
                        number_count: row.get(6)?,
                        value_type: row.get(7)?,
                        label: row.get(8)?,
                        description: row.get(9)?,
                        categories: Vec::new(),
                        required: row.get(10)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut descriptors = Vec::with_capacity(raw.len());
        let mut index = HashMap::new();
        for (field_type, mut descriptor) in raw {
            descriptor.field_type = FieldType::parse(&field_type).ok_or_else(|| {
                StoreError::corrupt(
                    METADATA_TABLE,
                    format!("unknown field type '{}' for {}", field_type, descriptor.id),
                )
            })?;
            index.insert(
                (
                    descriptor.field_type,
                    descriptor.parent.clone(),
                    descriptor.id.clone(),
                ),
                descriptors.len(),
            );
            descriptors.push(descriptor);
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT fieldType, parent, field, value, label, description FROM {} ORDER BY value",
            CATEGORIES_TABLE
        ))?;
        let entries = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    CategoryDescriptor {
                        key: row.get(3)?,
                        label: row.get(4)?,
                        description: row.get(5)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (field_type, parent, field, entry) in entries {
            let slot = FieldType::parse(&field_type)
                .and_then(|ft| index.get(&(ft, parent, field.clone())))
                .ok_or_else(|| {
                    StoreError::corrupt(
                        CATEGORIES_TABLE,
                        format!("category {} refers to unknown field {}", entry.key, field),
                    )
                })?;
            descriptors[*slot].categories.push(entry);
        }
        Ok(descriptors)
    }

    fn header_lines(&self) -> StoreResult<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT line FROM header ORDER BY rowid")?;
        let lines = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    fn samples(&self) -> StoreResult<Vec<Sample>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT sampleIndex, familyId, individualId, paternalId, maternalId, sex, \
             affectedStatus, proband FROM sample ORDER BY sampleIndex",
        )?;
        let samples = stmt
            .query_map([], |row| {
                Ok(Sample {
                    id: row.get::<_, i64>(0)? as usize,
                    person: Person {
                        family_id: row.get(1)?,
                        individual_id: row.get(2)?,
                        paternal_id: row.get(3)?,
                        maternal_id: row.get(4)?,
                        sex: Sex::parse(&row.get::<_, String>(5)?),
                        affected_status: AffectedStatus::parse(&row.get::<_, String>(6)?),
                    },
                    proband: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(samples)
    }

    fn phenotypes(&self) -> StoreResult<Vec<Phenotype>> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare("SELECT individualId, hpoId, label FROM phenotype ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut phenotypes: Vec<Phenotype> = Vec::new();
        let mut by_individual: HashMap<String, usize> = HashMap::new();
        for (individual, id, label) in rows {
            let slot = *by_individual.entry(individual.clone()).or_insert_with(|| {
                phenotypes.push(Phenotype {
                    id: phenotypes.len(),
                    subject: Subject { id: individual },
                    phenotypic_features_list: Vec::new(),
                });
                phenotypes.len() - 1
            });
            phenotypes[slot]
                .phenotypic_features_list
                .push(PhenotypicFeature {
                    feature_type: OntologyClass { id, label },
                });
        }
        Ok(phenotypes)
    }
}
