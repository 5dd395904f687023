// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

pub mod crf;
pub mod probe;

use crate::{
    model::{Position, Remoteness, Tier, Value},
    record::Record,
    record_array::RecordArray,
    CompressionType,
};
use crf::CrfReader;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// State of a tier's record file on disk
///
/// The file's presence is the source of truth for whether a tier is solved;
/// no separate manifest is kept.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TierStatus {
    /// No record file exists
    Missing,

    /// A record file exists and passes its integrity checks
    Solved,

    /// A file exists but is not a valid record file
    Corrupted,

    /// The file's state could not be determined (I/O failure)
    CheckError,
}

impl std::fmt::Display for TierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Missing => "missing",
                Self::Solved => "solved",
                Self::Corrupted => "corrupted",
                Self::CheckError => "check_error",
            }
        )
    }
}

struct SolvingTier {
    tier: Tier,
    name: String,
    records: Arc<RecordArray>,
}

struct DatabaseInner {
    folder: PathBuf,
    compression: CompressionType,
    block_size: u32,
    solving: Mutex<Option<SolvingTier>>,
}

/// Glues the in-memory record array of the tier being solved and the record
/// files of finished tiers behind one interface
///
/// Lives at `<data_root>/<game_name>/<variant_id>/<db_name>/`, with one
/// record file per canonical tier named `<tier_name>.<ext>`. At most one
/// solving tier is held in memory at a time; the worker writes through the
/// shared [`RecordArray`] handle and the database turns it into a record
/// file on flush.
///
/// Cloning is cheap and shares the underlying state.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Opens (and creates, if missing) the database folder for one
    /// game/variant/db-name triple.
    pub fn open<P: AsRef<Path>>(
        data_root: P,
        game_name: &str,
        variant_id: &str,
        db_name: &str,
        compression: CompressionType,
        block_size: u32,
    ) -> crate::Result<Self> {
        let folder = data_root
            .as_ref()
            .join(game_name)
            .join(variant_id)
            .join(db_name);

        std::fs::create_dir_all(&folder)?;

        log::debug!("opened database at {folder:?}");

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                folder,
                compression,
                block_size,
                solving: Mutex::new(None),
            }),
        })
    }

    /// The database folder.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.inner.folder
    }

    /// Path of a tier's record file.
    #[must_use]
    pub fn tier_path(&self, tier_name: &str) -> PathBuf {
        self.inner
            .folder
            .join(format!("{tier_name}.{}", self.inner.compression.file_extension()))
    }

    /// State of a tier's record file.
    #[must_use]
    pub fn tier_status(&self, tier_name: &str) -> TierStatus {
        crf::status(self.tier_path(tier_name))
    }

    /// Opens a solved tier's record file for reading.
    pub fn open_tier(&self, tier_name: &str) -> crate::Result<CrfReader> {
        CrfReader::open(self.tier_path(tier_name))
    }

    /// Allocates the record array of a tier about to be solved and returns
    /// the shared handle the worker writes through.
    ///
    /// Only one tier may be in memory at a time.
    pub fn create_solving_tier(
        &self,
        tier: Tier,
        tier_name: &str,
        size: u64,
    ) -> crate::Result<Arc<RecordArray>> {
        #[allow(clippy::expect_used)]
        let mut solving = self.inner.solving.lock().expect("lock is not poisoned");

        if let Some(current) = &*solving {
            log::error!(
                "cannot start solving tier {tier}: tier {} is still in memory",
                current.tier,
            );
            return Err(crate::Error::Config("another tier is already being solved"));
        }

        let records = Arc::new(RecordArray::new(size)?);

        *solving = Some(SolvingTier {
            tier,
            name: tier_name.into(),
            records: records.clone(),
        });

        Ok(records)
    }

    fn with_solving<T>(&self, f: impl FnOnce(&SolvingTier) -> T) -> crate::Result<T> {
        #[allow(clippy::expect_used)]
        let solving = self.inner.solving.lock().expect("lock is not poisoned");

        solving
            .as_ref()
            .map(f)
            .ok_or(crate::Error::Config("no tier is being solved"))
    }

    /// Stores a record into the solving tier.
    pub fn set_record(&self, position: Position, record: Record) -> crate::Result<()> {
        self.with_solving(|solving| solving.records.set(position, record))
    }

    /// Reads a record of the solving tier.
    pub fn get_record(&self, position: Position) -> crate::Result<Record> {
        self.with_solving(|solving| solving.records.get(position))
    }

    /// Reads the value of a solving-tier position.
    pub fn get_value(&self, position: Position) -> crate::Result<Value> {
        Ok(self.get_record(position)?.value())
    }

    /// Reads the remoteness of a solving-tier position.
    pub fn get_remoteness(&self, position: Position) -> crate::Result<Remoteness> {
        Ok(self.get_record(position)?.remoteness())
    }

    /// Writes the solving tier out as a record file.
    ///
    /// The array stays in memory until [`Database::free_solving_tier`], so a
    /// failed flush can be retried.
    pub fn flush_solving_tier(&self) -> crate::Result<PathBuf> {
        let (name, bytes) = self.with_solving(|solving| {
            (solving.name.clone(), solving.records.to_le_bytes())
        })?;

        let path = self.tier_path(&name);
        crf::writer::create(&path, &bytes, self.inner.compression, self.inner.block_size)?;

        Ok(path)
    }

    /// Releases the solving tier's memory.
    pub fn free_solving_tier(&self) {
        #[allow(clippy::expect_used)]
        let mut solving = self.inner.solving.lock().expect("lock is not poisoned");

        if let Some(current) = solving.take() {
            log::trace!("freed record array of tier {}", current.tier);
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database({:?})", self.inner.folder)
    }
}
