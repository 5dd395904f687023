// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::CompressionType;
use std::path::{Path, PathBuf};

const DEFAULT_FILE_FOLDER: &str = ".tierbase.data";

/// Default uncompressed block size of record files (1 MiB)
pub const DEFAULT_BLOCK_SIZE: u32 = 1 << 20;

/// Default database directory name under `<data_root>/<game>/<variant>/`
pub const DEFAULT_DB_NAME: &str = "records";

/// Solver configuration builder
///
/// # Examples
///
/// ```
/// # use tierbase::SolveOptions;
/// let options = SolveOptions::new(".tierbase.data")
///     .force(false)
///     .verbose(1)
///     .memlimit(2 * 1_024 * 1_024 * 1_024);
/// ```
#[derive(Clone, Debug)]
pub struct SolveOptions {
    /// Root folder of the database tree
    pub data_root: PathBuf,

    /// Database directory name (one database per record format)
    pub db_name: String,

    /// Re-solve tiers whose record file already exists
    pub force: bool,

    /// Logging verbosity: 0 quiet, 1 per-tier progress, 2 per-phase detail
    pub verbose: u8,

    /// Memory budget in bytes for one tier solve; 0 resolves to 90 % of
    /// physical RAM
    pub memlimit: u64,

    /// Apply the game's position-symmetry hook (identity when off)
    pub position_symmetry: bool,

    /// Apply the game's tier-symmetry hooks (identity when off)
    pub tier_symmetry: bool,

    /// Allow building a reverse graph when the game has no native
    /// canonical-parent enumeration
    pub use_retrograde: bool,

    /// Worker thread count; 0 uses one thread per core
    pub threads: usize,

    /// Codec for newly written record files
    pub compression: CompressionType,

    /// Uncompressed block size of newly written record files; must be a
    /// positive multiple of the 2-byte record size
    pub block_size: u32,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_FOLDER)
    }
}

impl SolveOptions {
    /// Creates options with defaults, rooted at the given data folder.
    #[must_use]
    pub fn new<P: AsRef<Path>>(data_root: P) -> Self {
        Self {
            data_root: data_root.as_ref().into(),
            db_name: DEFAULT_DB_NAME.into(),
            force: false,
            verbose: 0,
            memlimit: 0,
            position_symmetry: true,
            tier_symmetry: true,
            use_retrograde: true,
            threads: 0,
            compression: CompressionType::Lzma,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Sets the database directory name.
    #[must_use]
    pub fn db_name(mut self, name: &str) -> Self {
        self.db_name = name.into();
        self
    }

    /// Re-solve tiers whose record file already exists.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets logging verbosity (0, 1 or 2).
    #[must_use]
    pub fn verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the per-tier memory budget in bytes (0 = 90 % of physical RAM).
    #[must_use]
    pub fn memlimit(mut self, bytes: u64) -> Self {
        self.memlimit = bytes;
        self
    }

    /// Toggles use of the game's position-symmetry hook.
    #[must_use]
    pub fn position_symmetry(mut self, enabled: bool) -> Self {
        self.position_symmetry = enabled;
        self
    }

    /// Toggles use of the game's tier-symmetry hooks.
    #[must_use]
    pub fn tier_symmetry(mut self, enabled: bool) -> Self {
        self.tier_symmetry = enabled;
        self
    }

    /// Toggles the reverse-graph fallback for parent enumeration.
    #[must_use]
    pub fn use_retrograde(mut self, enabled: bool) -> Self {
        self.use_retrograde = enabled;
        self
    }

    /// Sets the worker thread count (0 = one thread per core).
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the codec for newly written record files.
    #[must_use]
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the uncompressed block size of newly written record files.
    #[must_use]
    pub fn block_size(mut self, bytes: u32) -> Self {
        self.block_size = bytes;
        self
    }

    /// Checks the recognized option set.
    pub fn validate(&self) -> crate::Result<()> {
        if self.verbose > 2 {
            return Err(crate::Error::Config("verbose must be 0, 1 or 2"));
        }

        if self.block_size == 0 || self.block_size % 2 != 0 {
            return Err(crate::Error::Config(
                "block size must be a positive multiple of the record size",
            ));
        }

        if self.db_name.is_empty() || !self.db_name.is_ascii() {
            return Err(crate::Error::Config("db name must be non-empty ASCII"));
        }

        if self.db_name.contains(['/', '\\']) {
            return Err(crate::Error::Config("db name must not contain separators"));
        }

        Ok(())
    }

    /// The effective memory budget: the configured limit, or 90 % of
    /// physical RAM when unset.
    #[must_use]
    pub fn resolved_memlimit(&self) -> u64 {
        if self.memlimit > 0 {
            return self.memlimit;
        }

        use sysinfo::{System, SystemExt};

        let mut system = System::new();
        system.refresh_memory();

        (system.total_memory() / 10) * 9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn default_options_are_valid() {
        assert!(SolveOptions::default().validate().is_ok());
    }

    #[test]
    fn odd_block_size_is_rejected() {
        let options = SolveOptions::default().block_size(1_023);
        assert!(matches!(options.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let options = SolveOptions::default().block_size(0);
        assert!(matches!(options.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn db_name_with_separator_is_rejected() {
        let options = SolveOptions::default().db_name("a/b");
        assert!(matches!(options.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn memlimit_defaults_to_physical_ram_share() {
        let options = SolveOptions::default();
        assert!(options.resolved_memlimit() > 0);

        let fixed = options.memlimit(1_234);
        assert_eq!(1_234, fixed.resolved_memlimit());
    }
}
