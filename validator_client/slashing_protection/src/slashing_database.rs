//! The history store, validator registry and decision coordinator, backed by a pooled SQLite
//! connection.
use crate::interchange::{Interchange, InterchangeAttestation, InterchangeBlock, InterchangeData, InterchangeMetadata};
use crate::signed_attestation::{check_attestation, SignedAttestation};
use crate::signed_block::{check_block_proposal, SignedBlock};
use crate::signing_root::SigningRoot;
use crate::{NotSafe, Safe, ValidityReason};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use slog::{debug, info, warn, Logger};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;
use types::{Epoch, Hash256, PublicKeyBytes, Slot};

/// Current on-disk schema version. Bumped whenever the table layout changes; checked on every
/// open so an old binary never silently runs against a newer (or incompatible) database.
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

pub const SUPPORTED_INTERCHANGE_FORMAT_VERSION: &str = crate::interchange::SUPPORTED_INTERCHANGE_FORMAT_VERSION;

const CREATE_META_TABLE: &str = "CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

const CREATE_VALIDATORS_TABLE: &str = "CREATE TABLE IF NOT EXISTS validators (
    id INTEGER PRIMARY KEY,
    public_key BLOB NOT NULL UNIQUE
)";

const CREATE_SIGNED_BLOCKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS signed_blocks (
    validator_id INTEGER NOT NULL,
    slot INTEGER NOT NULL,
    signing_root BLOB,
    PRIMARY KEY (validator_id, slot)
)";

const CREATE_SIGNED_ATTESTATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS signed_attestations (
    validator_id INTEGER NOT NULL,
    source_epoch INTEGER NOT NULL,
    target_epoch INTEGER NOT NULL,
    signing_root BLOB,
    PRIMARY KEY (validator_id, target_epoch)
)";

const CREATE_LOW_WATERMARKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS low_watermarks (
    validator_id INTEGER PRIMARY KEY,
    min_slot INTEGER,
    min_source_epoch INTEGER,
    min_target_epoch INTEGER
)";

const SCHEMA_VERSION_KEY: &str = "schema_version";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POOL_SIZE: u32 = 4;

/// Tunable knobs for opening a database: how long a connection waits on `SQLITE_BUSY` before
/// giving up, and how many connections the pool may hand out concurrently.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub busy_timeout: Duration,
    pub max_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// A registered validator identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    pub id: i64,
    pub public_key: PublicKeyBytes,
}

/// The outcome of importing a single record during `import_interchange_info`.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    BlockInserted {
        public_key: PublicKeyBytes,
        slot: Slot,
    },
    BlockSkippedAsDuplicate {
        public_key: PublicKeyBytes,
        slot: Slot,
    },
    AttestationInserted {
        public_key: PublicKeyBytes,
        target_epoch: Epoch,
    },
    AttestationSkippedAsDuplicate {
        public_key: PublicKeyBytes,
        target_epoch: Epoch,
    },
    Failed {
        public_key: PublicKeyBytes,
        error: String,
    },
}

impl ImportOutcome {
    /// True if this validator's import scope was rolled back. Named to match the real fuzz
    /// harness's `o.failed()` call.
    pub fn failed(&self) -> bool {
        matches!(self, ImportOutcome::Failed { .. })
    }
}

/// The slashing protection engine: registry cache, history store and decision coordinator in
/// one handle, safe to share between threads.
pub struct SlashingDatabase {
    pool: r2d2::Pool<SqliteConnectionManager>,
    registry_cache: RwLock<HashMap<PublicKeyBytes, i64>>,
    log: Logger,
}

/// A logger that discards everything, handed to callers that don't care to supply their own.
/// Kept local rather than pulled from the `logging` crate so the library itself carries no
/// dependency beyond `slog` -- only test and binary crates need the full logger-construction
/// helpers.
fn discard_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

impl SlashingDatabase {
    /// Open a brand new database at `path`. Fails if a file already exists there.
    pub fn create(path: &Path) -> Result<Self, NotSafe> {
        Self::create_with_logger(path, discard_logger())
    }

    pub fn create_with_logger(path: &Path, log: Logger) -> Result<Self, NotSafe> {
        if path.exists() {
            return Err(NotSafe::IOError(std::io::ErrorKind::AlreadyExists));
        }
        let db = Self::open_with_logger(path, log)?;
        filesystem::restrict_file_permissions(path)?;
        Ok(db)
    }

    /// Open an existing database at `path`, creating its schema if it is empty.
    pub fn open(path: &Path) -> Result<Self, NotSafe> {
        Self::open_with_config(path, discard_logger(), Config::default())
    }

    pub fn open_with_logger(path: &Path, log: Logger) -> Result<Self, NotSafe> {
        Self::open_with_config(path, log, Config::default())
    }

    /// Open a database at `path` with an explicit pool size and SQLite busy timeout, rather than
    /// the defaults `open`/`open_with_logger` use.
    pub fn open_with_config(path: &Path, log: Logger, config: Config) -> Result<Self, NotSafe> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = r2d2::Pool::builder()
            .max_size(config.max_size)
            .build(manager)
            .map_err(NotSafe::from)?;
        Self::from_pool(pool, log)
    }

    /// Open an in-memory database. Intended for unit tests that don't need to exercise file
    /// permissions or cross-process durability.
    pub fn open_in_memory() -> Result<Self, NotSafe> {
        Self::open_in_memory_with_logger(discard_logger())
    }

    pub fn open_in_memory_with_logger(log: Logger) -> Result<Self, NotSafe> {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(NotSafe::from)?;
        Self::from_pool(pool, log)
    }

    fn from_pool(pool: r2d2::Pool<SqliteConnectionManager>, log: Logger) -> Result<Self, NotSafe> {
        let conn = pool.get().map_err(NotSafe::from)?;
        Self::initialize_schema(&conn)?;

        let db = SlashingDatabase {
            pool,
            registry_cache: RwLock::new(HashMap::new()),
            log,
        };
        db.warm_registry_cache()?;
        Ok(db)
    }

    fn initialize_schema(conn: &Connection) -> Result<(), NotSafe> {
        conn.execute_batch(CREATE_META_TABLE)?;
        conn.execute_batch(CREATE_VALIDATORS_TABLE)?;
        conn.execute_batch(CREATE_SIGNED_BLOCKS_TABLE)?;
        conn.execute_batch(CREATE_SIGNED_ATTESTATIONS_TABLE)?;
        conn.execute_batch(CREATE_LOW_WATERMARKS_TABLE)?;

        let on_disk_version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![SCHEMA_VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match on_disk_version {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                    params![SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION.to_string()],
                )?;
            }
            Some(v) => {
                let version: u64 = v.parse().map_err(|_| {
                    NotSafe::SQLError(format!("corrupt schema_version meta row: {:?}", v))
                })?;
                if version != CURRENT_SCHEMA_VERSION {
                    return Err(NotSafe::SQLError(format!(
                        "incompatible database schema version: database has {}, software has {}",
                        version, CURRENT_SCHEMA_VERSION
                    )));
                }
            }
        }

        Ok(())
    }

    /// Populate the in-memory registry cache from the `validators` table. Called once at open.
    fn warm_registry_cache(&self) -> Result<(), NotSafe> {
        let conn = self.pool.get().map_err(NotSafe::from)?;
        let mut stmt = conn.prepare("SELECT id, public_key FROM validators")?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let public_key: Vec<u8> = row.get(1)?;
            Ok((id, public_key))
        })?;

        let mut cache = self.registry_cache.write().map_err(|_| {
            NotSafe::SQLError("registry cache lock poisoned".to_string())
        })?;
        for row in rows {
            let (id, public_key) = row?;
            let public_key = PublicKeyBytes::from_bytes(&public_key)
                .map_err(|e| NotSafe::SQLError(format!("corrupt public key in validators table: {}", e)))?;
            cache.insert(public_key, id);
        }
        Ok(())
    }

    /// Register the given public keys, in order, within a single transaction.
    ///
    /// Idempotent: keys already known (in the database OR the in-memory cache) are resolved to
    /// their existing id rather than re-inserted.
    pub fn register_validators<'a>(
        &self,
        public_keys: impl Iterator<Item = &'a PublicKeyBytes>,
    ) -> Result<Vec<Validator>, NotSafe> {
        let mut conn = self.pool.get().map_err(NotSafe::from)?;
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut validators = Vec::new();
        for public_key in public_keys {
            let existing_id: Option<i64> = txn
                .query_row(
                    "SELECT id FROM validators WHERE public_key = ?1",
                    params![public_key.as_bytes()],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing_id {
                Some(id) => id,
                None => {
                    txn.execute(
                        "INSERT INTO validators (public_key) VALUES (?1)",
                        params![public_key.as_bytes()],
                    )?;
                    txn.last_insert_rowid()
                }
            };
            validators.push(Validator {
                id,
                public_key: *public_key,
            });
        }
        txn.commit()?;

        {
            let mut cache = self.registry_cache.write().map_err(|_| {
                NotSafe::SQLError("registry cache lock poisoned".to_string())
            })?;
            for validator in &validators {
                cache.entry(validator.public_key).or_insert(validator.id);
            }
        }

        for validator in &validators {
            debug!(self.log, "Registered validator"; "validator_id" => validator.id);
        }

        Ok(validators)
    }

    /// Resolve a public key to its internal id using the in-memory cache only.
    ///
    /// Deliberately never falls back to the database: an unregistered key is an operator error
    /// that must be refused loudly, never silently elevated to a protected signer.
    pub fn get_validator_id(&self, public_key: &PublicKeyBytes) -> Result<i64, NotSafe> {
        let cache = self.registry_cache.read().map_err(|_| {
            NotSafe::SQLError("registry cache lock poisoned".to_string())
        })?;
        cache
            .get(public_key)
            .copied()
            .ok_or(NotSafe::UnregisteredValidator(*public_key))
    }

    fn min_block_slot(conn: &Connection, validator_id: i64) -> Result<Option<Slot>, NotSafe> {
        let value = conn
            .query_row::<Option<i64>, _, _>(
                "SELECT min_slot FROM low_watermarks WHERE validator_id = ?1",
                params![validator_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(value.map(|v| Slot::new(v as u64)))
    }

    fn min_attestation_epochs(
        conn: &Connection,
        validator_id: i64,
    ) -> Result<(Option<Epoch>, Option<Epoch>), NotSafe> {
        let row: Option<(Option<i64>, Option<i64>)> = conn
            .query_row(
                "SELECT min_source_epoch, min_target_epoch FROM low_watermarks WHERE validator_id = ?1",
                params![validator_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((source, target)) => Ok((
                source.map(|v| Epoch::new(v as u64)),
                target.map(|v| Epoch::new(v as u64)),
            )),
            None => Ok((None, None)),
        }
    }

    fn find_block(
        conn: &Connection,
        validator_id: i64,
        slot: Slot,
    ) -> Result<Option<SignedBlock>, NotSafe> {
        conn.query_row(
            "SELECT validator_id, slot, signing_root FROM signed_blocks
             WHERE validator_id = ?1 AND slot = ?2",
            params![validator_id, slot.as_u64() as i64],
            |row| {
                Ok(SignedBlock {
                    validator_id: row.get(0)?,
                    slot: Slot::new(row.get::<_, i64>(1)? as u64),
                    signing_root: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(NotSafe::from)
    }

    fn find_attestation_by_target(
        conn: &Connection,
        validator_id: i64,
        target: Epoch,
    ) -> Result<Option<SignedAttestation>, NotSafe> {
        conn.query_row(
            "SELECT validator_id, source_epoch, target_epoch, signing_root FROM signed_attestations
             WHERE validator_id = ?1 AND target_epoch = ?2",
            params![validator_id, target.as_u64() as i64],
            Self::row_to_attestation,
        )
        .optional()
        .map_err(NotSafe::from)
    }

    fn find_surrounding(
        conn: &Connection,
        validator_id: i64,
        source: Epoch,
        target: Epoch,
    ) -> Result<Option<SignedAttestation>, NotSafe> {
        conn.query_row(
            "SELECT validator_id, source_epoch, target_epoch, signing_root FROM signed_attestations
             WHERE validator_id = ?1 AND source_epoch < ?2 AND target_epoch > ?3
             LIMIT 1",
            params![validator_id, source.as_u64() as i64, target.as_u64() as i64],
            Self::row_to_attestation,
        )
        .optional()
        .map_err(NotSafe::from)
    }

    fn find_surrounded(
        conn: &Connection,
        validator_id: i64,
        source: Epoch,
        target: Epoch,
    ) -> Result<Option<SignedAttestation>, NotSafe> {
        conn.query_row(
            "SELECT validator_id, source_epoch, target_epoch, signing_root FROM signed_attestations
             WHERE validator_id = ?1 AND source_epoch > ?2 AND target_epoch < ?3
             LIMIT 1",
            params![validator_id, source.as_u64() as i64, target.as_u64() as i64],
            Self::row_to_attestation,
        )
        .optional()
        .map_err(NotSafe::from)
    }

    fn row_to_attestation(row: &rusqlite::Row) -> rusqlite::Result<SignedAttestation> {
        Ok(SignedAttestation {
            validator_id: row.get(0)?,
            source_epoch: Epoch::new(row.get::<_, i64>(1)? as u64),
            target_epoch: Epoch::new(row.get::<_, i64>(2)? as u64),
            signing_root: row.get(3)?,
        })
    }

    fn insert_block(conn: &Connection, block: SignedBlock) -> Result<(), NotSafe> {
        conn.execute(
            "INSERT INTO signed_blocks (validator_id, slot, signing_root) VALUES (?1, ?2, ?3)",
            params![block.validator_id, block.slot.as_u64() as i64, block.signing_root],
        )?;
        Ok(())
    }

    fn insert_attestation(conn: &Connection, att: SignedAttestation) -> Result<(), NotSafe> {
        conn.execute(
            "INSERT INTO signed_attestations (validator_id, source_epoch, target_epoch, signing_root)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                att.validator_id,
                att.source_epoch.as_u64() as i64,
                att.target_epoch.as_u64() as i64,
                att.signing_root,
            ],
        )?;
        Ok(())
    }

    /// The decision coordinator's block path: resolve, evaluate and insert in a single
    /// serializable transaction.
    pub fn check_and_insert_block_signing_root(
        &self,
        public_key: &PublicKeyBytes,
        slot: Slot,
        signing_root: SigningRoot,
    ) -> Result<Safe, NotSafe> {
        let validator_id = self.get_validator_id(public_key)?;

        let mut conn = self.pool.get().map_err(NotSafe::from)?;
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let min_slot = Self::min_block_slot(&txn, validator_id)?;
        let existing = Self::find_block(&txn, validator_id, slot)?;

        let reason = if existing.is_none() && min_slot.is_none() {
            ValidityReason::EmptyHistory
        } else if existing.is_some() {
            ValidityReason::SameData
        } else {
            ValidityReason::Valid
        };

        check_block_proposal(slot, signing_root, min_slot, existing)?;

        if existing.is_none() {
            Self::insert_block(
                &txn,
                SignedBlock {
                    validator_id,
                    slot,
                    signing_root,
                },
            )?;
        }

        txn.commit()?;
        Ok(Safe { reason })
    }

    /// The decision coordinator's attestation path.
    pub fn check_and_insert_attestation_signing_root(
        &self,
        public_key: &PublicKeyBytes,
        source_epoch: Epoch,
        target_epoch: Epoch,
        signing_root: SigningRoot,
    ) -> Result<Safe, NotSafe> {
        let validator_id = self.get_validator_id(public_key)?;

        let mut conn = self.pool.get().map_err(NotSafe::from)?;
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (min_source, min_target) = Self::min_attestation_epochs(&txn, validator_id)?;
        let existing = Self::find_attestation_by_target(&txn, validator_id, target_epoch)?;
        let surrounding = Self::find_surrounding(&txn, validator_id, source_epoch, target_epoch)?;
        let surrounded = Self::find_surrounded(&txn, validator_id, source_epoch, target_epoch)?;

        let reason = if existing.is_none()
            && surrounding.is_none()
            && surrounded.is_none()
            && min_source.is_none()
            && min_target.is_none()
        {
            ValidityReason::EmptyHistory
        } else if existing.is_some() {
            ValidityReason::SameData
        } else {
            ValidityReason::Valid
        };

        check_attestation(
            source_epoch,
            target_epoch,
            signing_root,
            min_source,
            min_target,
            existing,
            surrounding,
            surrounded,
        )?;

        if existing.is_none() {
            Self::insert_attestation(
                &txn,
                SignedAttestation {
                    validator_id,
                    source_epoch,
                    target_epoch,
                    signing_root,
                },
            )?;
        }

        txn.commit()?;
        Ok(Safe { reason })
    }

    /// Raise (never lower) a validator's watermarks. Used by interchange import and by
    /// administrative pruning operations.
    pub fn set_watermarks(
        &self,
        public_key: &PublicKeyBytes,
        min_slot: Option<Slot>,
        min_source_epoch: Option<Epoch>,
        min_target_epoch: Option<Epoch>,
    ) -> Result<(), NotSafe> {
        let validator_id = self.get_validator_id(public_key)?;
        let mut conn = self.pool.get().map_err(NotSafe::from)?;
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Self::raise_watermarks(&txn, validator_id, min_slot, min_source_epoch, min_target_epoch)?;
        txn.commit()?;
        Ok(())
    }

    fn raise_watermarks(
        conn: &Connection,
        validator_id: i64,
        min_slot: Option<Slot>,
        min_source_epoch: Option<Epoch>,
        min_target_epoch: Option<Epoch>,
    ) -> Result<(), NotSafe> {
        let (existing_source, existing_target) = Self::min_attestation_epochs(conn, validator_id)?;
        let existing_slot = Self::min_block_slot(conn, validator_id)?;

        let new_slot = max_option(existing_slot, min_slot);
        let new_source = max_option(existing_source, min_source_epoch);
        let new_target = max_option(existing_target, min_target_epoch);

        conn.execute(
            "INSERT INTO low_watermarks (validator_id, min_slot, min_source_epoch, min_target_epoch)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (validator_id) DO UPDATE SET
                min_slot = excluded.min_slot,
                min_source_epoch = excluded.min_source_epoch,
                min_target_epoch = excluded.min_target_epoch",
            params![
                validator_id,
                new_slot.map(|s| s.as_u64() as i64),
                new_source.map(|e| e.as_u64() as i64),
                new_target.map(|e| e.as_u64() as i64),
            ],
        )?;
        Ok(())
    }

    /// Import an EIP-3076 interchange document. One transaction per validator entry: a violation
    /// rejects only that validator's scope, not the whole document.
    pub fn import_interchange_info(
        &self,
        interchange: Interchange,
        expected_genesis_validators_root: Hash256,
    ) -> Result<Vec<ImportOutcome>, NotSafe> {
        interchange.metadata.check_version().map_err(|e| {
            NotSafe::InterchangeRejected(e.to_string())
        })?;

        if let Err(e) = interchange
            .metadata
            .check_genesis_validators_root(expected_genesis_validators_root)
        {
            warn!(
                self.log,
                "Refusing interchange import due to genesis_validators_root mismatch"
            );
            return Err(NotSafe::InterchangeRejected(e.to_string()));
        }

        let mut outcomes = Vec::new();
        for entry in interchange.data {
            outcomes.extend(self.import_validator_entry(entry)?);
        }

        info!(self.log, "Completed interchange import"; "records" => outcomes.len());
        Ok(outcomes)
    }

    fn import_validator_entry(&self, entry: InterchangeData) -> Result<Vec<ImportOutcome>, NotSafe> {
        self.register_validators(std::iter::once(&entry.pubkey))?;
        let validator_id = self.get_validator_id(&entry.pubkey)?;

        let mut conn = self.pool.get().map_err(NotSafe::from)?;
        let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match Self::import_entry_locked(&txn, validator_id, &entry) {
            Ok(outcomes) => {
                txn.commit()?;
                Ok(outcomes)
            }
            Err(e) => {
                // Transaction drops (and rolls back) here; only this validator's scope is lost.
                warn!(
                    self.log,
                    "Rejecting interchange entry for validator";
                    "validator_id" => validator_id,
                    "reason" => %e,
                );
                Ok(vec![ImportOutcome::Failed {
                    public_key: entry.pubkey,
                    error: e.to_string(),
                }])
            }
        }
    }

    fn import_entry_locked(
        txn: &Connection,
        validator_id: i64,
        entry: &InterchangeData,
    ) -> Result<Vec<ImportOutcome>, NotSafe> {
        let mut outcomes = Vec::new();

        // `checked_sub` rather than the saturating `-` operator: a lowest-seen value of zero has
        // no valid floor strictly below it, so the watermark for that component must stay unset
        // rather than saturate to zero and then reject the very record that set it.
        if let Some(min_slot) = entry.signed_blocks.iter().map(|b| b.slot).min() {
            if let Some(floor) = min_slot.checked_sub(Slot::new(1)) {
                Self::raise_watermarks(txn, validator_id, Some(floor), None, None)?;
            }
        }
        if let Some(min_source) = entry.signed_attestations.iter().map(|a| a.source_epoch).min() {
            Self::raise_watermarks(txn, validator_id, None, Some(min_source), None)?;
        }
        if let Some(min_target) = entry.signed_attestations.iter().map(|a| a.target_epoch).min() {
            if let Some(floor) = min_target.checked_sub(Epoch::new(1)) {
                Self::raise_watermarks(txn, validator_id, None, None, Some(floor))?;
            }
        }

        for block in &entry.signed_blocks {
            let min_slot = Self::min_block_slot(txn, validator_id)?;
            let existing = Self::find_block(txn, validator_id, block.slot)?;
            let signing_root = block.signing_root();

            check_block_proposal(block.slot, signing_root, min_slot, existing)
                .map_err(NotSafe::from)?;

            if existing.is_none() {
                Self::insert_block(
                    txn,
                    SignedBlock {
                        validator_id,
                        slot: block.slot,
                        signing_root,
                    },
                )?;
                outcomes.push(ImportOutcome::BlockInserted {
                    public_key: entry.pubkey,
                    slot: block.slot,
                });
            } else {
                outcomes.push(ImportOutcome::BlockSkippedAsDuplicate {
                    public_key: entry.pubkey,
                    slot: block.slot,
                });
            }
        }

        for att in &entry.signed_attestations {
            let (min_source, min_target) = Self::min_attestation_epochs(txn, validator_id)?;
            let existing = Self::find_attestation_by_target(txn, validator_id, att.target_epoch)?;
            let surrounding =
                Self::find_surrounding(txn, validator_id, att.source_epoch, att.target_epoch)?;
            let surrounded =
                Self::find_surrounded(txn, validator_id, att.source_epoch, att.target_epoch)?;
            let signing_root = att.signing_root();

            check_attestation(
                att.source_epoch,
                att.target_epoch,
                signing_root,
                min_source,
                min_target,
                existing,
                surrounding,
                surrounded,
            )
            .map_err(NotSafe::from)?;

            if existing.is_none() {
                Self::insert_attestation(
                    txn,
                    SignedAttestation {
                        validator_id,
                        source_epoch: att.source_epoch,
                        target_epoch: att.target_epoch,
                        signing_root,
                    },
                )?;
                outcomes.push(ImportOutcome::AttestationInserted {
                    public_key: entry.pubkey,
                    target_epoch: att.target_epoch,
                });
            } else {
                outcomes.push(ImportOutcome::AttestationSkippedAsDuplicate {
                    public_key: entry.pubkey,
                    target_epoch: att.target_epoch,
                });
            }
        }

        Ok(outcomes)
    }

    /// Export every registered validator's full history and watermarks as an interchange
    /// document.
    pub fn export_interchange_info(
        &self,
        genesis_validators_root: Hash256,
    ) -> Result<Interchange, NotSafe> {
        let conn = self.pool.get().map_err(NotSafe::from)?;

        let mut stmt = conn.prepare("SELECT id, public_key FROM validators ORDER BY id")?;
        let validators: Vec<(i64, PublicKeyBytes)> = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let public_key: Vec<u8> = row.get(1)?;
                Ok((id, public_key))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(|(id, bytes)| {
                PublicKeyBytes::from_bytes(&bytes)
                    .map(|pk| (id, pk))
                    .map_err(|e| NotSafe::SQLError(format!("corrupt public key: {}", e)))
            })
            .collect::<Result<Vec<_>, NotSafe>>()?;

        let mut data = Vec::with_capacity(validators.len());
        for (validator_id, pubkey) in validators {
            let mut block_stmt = conn.prepare(
                "SELECT slot, signing_root FROM signed_blocks WHERE validator_id = ?1 ORDER BY slot",
            )?;
            let signed_blocks = block_stmt
                .query_map(params![validator_id], |row| {
                    let slot: i64 = row.get(0)?;
                    let signing_root: SigningRoot = row.get(1)?;
                    Ok(InterchangeBlock {
                        slot: Slot::new(slot as u64),
                        signing_root: signing_root.0,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut att_stmt = conn.prepare(
                "SELECT source_epoch, target_epoch, signing_root FROM signed_attestations
                 WHERE validator_id = ?1 ORDER BY target_epoch",
            )?;
            let signed_attestations = att_stmt
                .query_map(params![validator_id], |row| {
                    let source: i64 = row.get(0)?;
                    let target: i64 = row.get(1)?;
                    let signing_root: SigningRoot = row.get(2)?;
                    Ok(InterchangeAttestation {
                        source_epoch: Epoch::new(source as u64),
                        target_epoch: Epoch::new(target as u64),
                        signing_root: signing_root.0,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            data.push(InterchangeData {
                pubkey,
                signed_blocks,
                signed_attestations,
            });
        }

        Ok(Interchange {
            metadata: InterchangeMetadata::new(genesis_validators_root),
            data,
        })
    }
}

fn max_option<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
