//! Probe and mutation layers for the lvm2/e2fsprogs tooling.

pub mod error;
pub mod probe;
pub mod types;

use crate::executor::CommandExecutor;
use error::LvmError;
use types::PhysicalVolume;

/// Read-only view of the LVM metadata layer.
///
/// All discovery a run needs goes through here so the extension core can be
/// exercised against an in-memory backend in tests.
pub trait LvmQuery {
    /// Name of the volume group owning the given logical volume
    fn vg_for_lv(&self, device: &str) -> Result<String, LvmError>;

    /// Physical volumes backing a volume group, capacities in bytes
    fn pvs_for_vg(&self, vg: &str) -> Result<Vec<PhysicalVolume>, LvmError>;

    /// Current size of a logical volume in bytes
    fn lv_size_bytes(&self, device: &str) -> Result<u64, LvmError>;
}

/// Mutations against the volume group and the filesystem on it.
pub trait LvmMutate {
    /// Grow a logical volume by exactly `bytes` additional bytes
    fn extend_lv_bytes(&self, device: &str, bytes: u64) -> Result<(), LvmError>;

    /// Grow the filesystem on a logical volume to its current block size
    fn resize_filesystem(&self, device: &str) -> Result<(), LvmError>;
}

/// Production backend shelling out to lvextend/resize2fs through the
/// dry-run-aware executor, and to the probe layer for queries.
pub struct SystemLvm<'a> {
    executor: &'a CommandExecutor,
}

impl<'a> SystemLvm<'a> {
    pub fn new(executor: &'a CommandExecutor) -> Self {
        Self { executor }
    }
}

impl LvmQuery for SystemLvm<'_> {
    fn vg_for_lv(&self, device: &str) -> Result<String, LvmError> {
        probe::vg_for_lv(device)
    }

    fn pvs_for_vg(&self, vg: &str) -> Result<Vec<PhysicalVolume>, LvmError> {
        probe::pvs_for_vg(vg)
    }

    fn lv_size_bytes(&self, device: &str) -> Result<u64, LvmError> {
        probe::lv_size_bytes(device)
    }
}

impl LvmMutate for SystemLvm<'_> {
    fn extend_lv_bytes(&self, device: &str, bytes: u64) -> Result<(), LvmError> {
        let mut command = std::process::Command::new("lvextend");
        command.args(["-L", &format!("+{}b", bytes), device]);
        self.executor
            .run(&mut command)
            .map_err(|e| LvmError::ExtendFailed(e.to_string()))
    }

    fn resize_filesystem(&self, device: &str) -> Result<(), LvmError> {
        let mut command = std::process::Command::new("resize2fs");
        command.arg(device);
        self.executor
            .run(&mut command)
            .map_err(|e| LvmError::ResizeFailed(e.to_string()))
    }
}
