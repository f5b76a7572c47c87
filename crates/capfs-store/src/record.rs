//! File records and their admission handles.

use std::sync::Arc;

use capfs_core::{
    authorize, Group, Identity, Operation, Ownership, PermissionMask, Timestamp, WriteMode,
};
use parking_lot::RwLock;

use crate::content::ContentBuffer;
use crate::gate::{Gate, GateState};
use crate::table::FileSnapshot;

/// One stored file.
///
/// Records are shared between the table and every session touching them.
/// Content is reachable only through a [`ReadAdmission`] or
/// [`WriteAdmission`], so the gate cannot be bypassed.
#[derive(Debug)]
pub struct FileRecord {
    id: u64,
    name: String,
    ownership: Ownership,
    created_at: Timestamp,
    /// Changed only while the table's exclusive section is held.
    permissions: RwLock<PermissionMask>,
    gate: Gate,
    content: RwLock<ContentBuffer>,
}

impl FileRecord {
    pub(crate) fn new(
        id: u64,
        name: String,
        ownership: Ownership,
        permissions: PermissionMask,
        initial_capacity: usize,
    ) -> Self {
        Self {
            id,
            name,
            ownership,
            created_at: Timestamp::now(),
            permissions: RwLock::new(permissions),
            gate: Gate::new(),
            content: RwLock::new(ContentBuffer::with_capacity(initial_capacity)),
        }
    }

    /// Returns the creation sequence number within the table.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the filename.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owner's username.
    pub fn owner(&self) -> &str {
        &self.ownership.owner
    }

    /// Returns the owning group.
    pub fn group(&self) -> Group {
        self.ownership.group
    }

    /// Returns the ownership pair.
    pub fn ownership(&self) -> &Ownership {
        &self.ownership
    }

    /// Returns when the file was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns the current permission mask.
    pub fn permissions(&self) -> PermissionMask {
        *self.permissions.read()
    }

    pub(crate) fn set_permissions(&self, mask: PermissionMask) {
        *self.permissions.write() = mask;
    }

    /// Returns the content length in bytes.
    pub fn size(&self) -> usize {
        self.content.read().len()
    }

    /// Returns the gate counters.
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Returns true if `identity` may perform `op` under the current mask.
    pub fn authorize(&self, identity: &Identity, op: Operation) -> bool {
        authorize(&self.ownership, &self.permissions(), identity, op)
    }

    /// Attempts to admit a reader; `None` means a writer is active.
    pub fn try_read(self: &Arc<Self>) -> Option<ReadAdmission> {
        self.gate.try_enter_read().then(|| ReadAdmission {
            record: Arc::clone(self),
        })
    }

    /// Attempts to admit a writer; `None` means the file is in use.
    pub fn try_write(self: &Arc<Self>, mode: WriteMode) -> Option<WriteAdmission> {
        self.gate.try_enter_write().then(|| WriteAdmission {
            record: Arc::clone(self),
            mode,
            written: 0,
            started: false,
        })
    }

    /// Captures the metadata for listing.
    pub fn snapshot(&self) -> FileSnapshot {
        FileSnapshot {
            name: self.name.clone(),
            owner: self.ownership.owner.clone(),
            group: self.ownership.group,
            permissions: self.permissions(),
            size: self.size(),
            created_at: self.created_at,
        }
    }
}

/// A held reader admission. Dropping it releases the gate.
#[derive(Debug)]
pub struct ReadAdmission {
    record: Arc<FileRecord>,
}

impl ReadAdmission {
    /// Returns the record being read.
    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    /// Returns the content length in bytes.
    pub fn len(&self) -> usize {
        self.record.size()
    }

    /// Returns true if the file has no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies up to `max` bytes starting at `offset`.
    pub fn read_chunk(&self, offset: usize, max: usize) -> Vec<u8> {
        self.record.content.read().chunk(offset, max).to_vec()
    }

    /// Copies the whole content.
    pub fn to_vec(&self) -> Vec<u8> {
        self.record.content.read().as_slice().to_vec()
    }
}

impl Drop for ReadAdmission {
    fn drop(&mut self) {
        self.record.gate.exit_read();
    }
}

/// A held writer admission. Dropping it releases the gate.
#[derive(Debug)]
pub struct WriteAdmission {
    record: Arc<FileRecord>,
    mode: WriteMode,
    written: usize,
    started: bool,
}

impl WriteAdmission {
    /// Returns the record being written.
    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    /// Returns the write mode.
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Returns the number of bytes ingested so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Appends one piece of incoming content.
    ///
    /// In overwrite mode the existing content is discarded on the first
    /// non-empty piece, not at admission time, so a write that ends without
    /// data leaves the file untouched.
    pub fn ingest(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut content = self.record.content.write();
        if self.mode == WriteMode::Overwrite && !self.started {
            content.truncate();
        }
        content.append(data);
        self.started = true;
        self.written += data.len();
    }
}

impl Drop for WriteAdmission {
    fn drop(&mut self) {
        self.record.gate.exit_write();
    }
}
