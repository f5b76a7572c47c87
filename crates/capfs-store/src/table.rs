//! The file table.
//!
//! Membership changes and permission changes go through one exclusive
//! section. Content traffic does not touch it; it goes through each record's
//! own gate.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use capfs_core::{is_valid_filename, Group, Identity, Ownership, PermissionMask, Timestamp};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::StoreConfig;
use crate::record::FileRecord;
use crate::TableError;

/// Point-in-time metadata of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Filename
    pub name: String,
    /// Owner's username
    pub owner: String,
    /// Owning group
    pub group: Group,
    /// Permission mask
    pub permissions: PermissionMask,
    /// Content length in bytes
    pub size: usize,
    /// Creation time
    pub created_at: Timestamp,
}

struct TableInner {
    files: HashMap<String, Arc<FileRecord>>,
    next_id: u64,
}

/// Registry of files keyed by name.
pub struct FileTable {
    config: StoreConfig,
    inner: Mutex<TableInner>,
}

impl FileTable {
    /// Creates an empty table.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(TableInner {
                files: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Creates a table with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Returns the table configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates an empty file owned by `owner`.
    pub fn create(
        &self,
        name: &str,
        owner: &Identity,
        permissions: &str,
    ) -> Result<Arc<FileRecord>, TableError> {
        let mask: PermissionMask = permissions
            .parse()
            .map_err(|_| TableError::InvalidMask(permissions.to_string()))?;
        if !is_valid_filename(name) {
            return Err(TableError::InvalidName(name.to_string()));
        }

        let mut inner = self.inner.lock();
        if inner.files.contains_key(name) {
            return Err(TableError::AlreadyExists(name.to_string()));
        }
        if inner.files.len() >= self.config.max_files {
            return Err(TableError::TableFull(self.config.max_files));
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let record = Arc::new(FileRecord::new(
            id,
            name.to_string(),
            Ownership::of(owner),
            mask,
            self.config.initial_capacity,
        ));
        inner.files.insert(name.to_string(), Arc::clone(&record));

        debug!(name = name, owner = %owner, mask = %mask, "Created file");
        Ok(record)
    }

    /// Looks up a file by name.
    ///
    /// The handle is shared with the table, not a copy.
    pub fn lookup(&self, name: &str) -> Option<Arc<FileRecord>> {
        self.inner.lock().files.get(name).cloned()
    }

    /// Replaces a file's permission mask.
    ///
    /// The requester must match both the owner and the owning group.
    pub fn set_permissions(
        &self,
        name: &str,
        requester: &Identity,
        new_mask: &str,
    ) -> Result<(), TableError> {
        let mask: PermissionMask = new_mask
            .parse()
            .map_err(|_| TableError::InvalidMask(new_mask.to_string()))?;

        let inner = self.inner.lock();
        let record = inner
            .files
            .get(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;
        if !record.ownership().is_owner(requester) {
            return Err(TableError::PermissionDenied(name.to_string()));
        }
        record.set_permissions(mask);

        debug!(name = name, requester = %requester, mask = %mask, "Changed permissions");
        Ok(())
    }

    /// Returns snapshots of every file in creation order.
    pub fn list(&self) -> Vec<FileSnapshot> {
        let inner = self.inner.lock();
        let mut records: Vec<&Arc<FileRecord>> = inner.files.values().collect();
        records.sort_by_key(|r| r.id());
        records.into_iter().map(|r| r.snapshot()).collect()
    }

    /// Returns the capability list for display.
    pub fn capability_list(&self) -> CapabilityList {
        CapabilityList(self.list())
    }

    /// Returns the number of files.
    pub fn len(&self) -> usize {
        self.inner.lock().files.len()
    }

    /// Returns true if the table has no files.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Tabular rendering of the file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityList(pub Vec<FileSnapshot>);

const RULE: &str = "----------------------------------------------------------------";

impl fmt::Display for CapabilityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Capability List:")?;
        writeln!(f, "Permissions Owner     Group     Size     Date          Filename")?;
        writeln!(f, "{RULE}")?;
        for file in &self.0 {
            writeln!(
                f,
                "{:<10} {:<10} {:<10} {:<8} {:<12} {}",
                file.permissions.as_str(),
                file.owner,
                file.group.as_str(),
                file.size,
                file.created_at.date_string(),
                file.name
            )?;
        }
        write!(f, "{RULE}")
    }
}
