//! Read-only probes against the LVM tooling layer.
//!
//! Every size is requested in exact bytes (`--units b --nosuffix` for the
//! lvm2 tools, `-b` for lsblk) so the extension arithmetic never mixes
//! rounded units with byte-exact ones.

use duct::cmd;

use super::error::LvmError;
use super::types::PhysicalVolume;

fn query(program: &str, args: &[&str]) -> Result<String, LvmError> {
    cmd(program, args)
        .read()
        .map_err(|e| LvmError::Query(format!("{} {}: {}", program, args.join(" "), e)))
}

/// Device backing the root filesystem, per findmnt
pub fn detect_root_device() -> Result<String, LvmError> {
    let out = query("findmnt", &["-n", "-o", "SOURCE", "/"])?;
    let device = out.trim().to_string();

    if !device.starts_with("/dev/mapper/") && !device.starts_with("/dev/dm-") {
        return Err(LvmError::Resolution {
            device,
            reason: "root filesystem is not on a device-mapper volume".to_string(),
        });
    }

    Ok(device)
}

/// Name of the volume group owning a logical volume
pub fn vg_for_lv(device: &str) -> Result<String, LvmError> {
    let out = cmd("lvs", ["--noheadings", "-o", "vg_name", device])
        .read()
        .map_err(|e| LvmError::Resolution {
            device: device.to_string(),
            reason: e.to_string(),
        })?;

    let vg = out.trim();
    if vg.is_empty() {
        return Err(LvmError::Resolution {
            device: device.to_string(),
            reason: "lvs reported no volume group".to_string(),
        });
    }
    Ok(vg.to_string())
}

/// Current size of a logical volume in bytes
pub fn lv_size_bytes(device: &str) -> Result<u64, LvmError> {
    let out = query(
        "lvs",
        &[
            "--noheadings",
            "--units",
            "b",
            "--nosuffix",
            "-o",
            "lv_size",
            device,
        ],
    )?;
    parse_size_field(&out)
        .ok_or_else(|| LvmError::Query(format!("unparseable lv_size for {}: {:?}", device, out)))
}

/// Physical volumes backing a volume group, with byte-exact capacities
pub fn pvs_for_vg(vg: &str) -> Result<Vec<PhysicalVolume>, LvmError> {
    let select = format!("vg_name={}", vg);
    let out = query(
        "pvs",
        &[
            "--noheadings",
            "--units",
            "b",
            "--nosuffix",
            "-o",
            "pv_name,pv_size",
            "-S",
            &select,
        ],
    )?;
    let pvs = parse_pv_rows(&out);
    if pvs.is_empty() {
        return Err(LvmError::Query(format!(
            "pvs reported no physical volumes for volume group {}",
            vg
        )));
    }
    Ok(pvs)
}

/// Raw capacity of a block device in bytes, per lsblk
pub fn device_size_bytes(device: &str) -> Result<u64, LvmError> {
    let out = query("lsblk", &["-n", "-b", "-o", "SIZE", device])?;
    parse_size_field(&out)
        .ok_or_else(|| LvmError::Query(format!("unparseable lsblk size for {}: {:?}", device, out)))
}

/// Parse the first whitespace-trimmed line as a byte count
fn parse_size_field(output: &str) -> Option<u64> {
    output.lines().next()?.trim().parse().ok()
}

/// Parse `pvs -o pv_name,pv_size` rows into records
fn parse_pv_rows(output: &str) -> Vec<PhysicalVolume> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?.to_string();
            let size_bytes: u64 = fields.next()?.parse().ok()?;
            Some(PhysicalVolume { device, size_bytes })
        })
        .collect()
}
