//! Typed records for the LVM objects a run probes.

use serde::{Deserialize, Serialize};

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a signed byte count, e.g. a headroom value that may be a deficit
pub fn format_signed(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", format_size(bytes.unsigned_abs()))
    } else {
        format_size(bytes as u64)
    }
}

/// Parse a size argument like `4096K`, `4M` or a plain byte count
pub fn parse_size(input: &str) -> Option<u64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let (digits, multiplier) = match s.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let multiplier: u64 = match c.to_ascii_uppercase() {
                'B' => 1,
                'K' => 1024,
                'M' => 1024 * 1024,
                'G' => 1024 * 1024 * 1024,
                'T' => 1024 * 1024 * 1024 * 1024,
                _ => return None,
            };
            (&s[..s.len() - 1], multiplier)
        }
        _ => (s, 1),
    };

    let value: u64 = digits.trim().parse().ok()?;
    value.checked_mul(multiplier)
}

/// A raw disk or partition as the kernel reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDevice {
    /// Device path (e.g. /dev/sda3)
    pub device: String,
    /// Raw capacity in bytes
    pub size_bytes: u64,
}

/// A disk or partition initialized for LVM, backing exactly one volume group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalVolume {
    /// Device path (e.g. /dev/sda3)
    pub device: String,
    /// Capacity in bytes as reported by `pvs --units b`
    pub size_bytes: u64,
}

/// A volume group and the physical volumes backing it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeGroup {
    pub name: String,
    pub physical_volumes: Vec<PhysicalVolume>,
}

impl VolumeGroup {
    /// Total capacity across all backing physical volumes
    pub fn size_bytes(&self) -> u64 {
        self.physical_volumes.iter().map(|pv| pv.size_bytes).sum()
    }
}

/// A logical volume carved from a volume group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalVolume {
    /// Device-mapper path (e.g. /dev/mapper/ubuntu--vg-ubuntu--lv)
    pub device: String,
    /// Owning volume group
    pub vg_name: String,
    /// Current size in bytes as reported by `lvs --units b`
    pub size_bytes: u64,
}
