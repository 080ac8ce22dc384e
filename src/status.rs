//! Read-only report of the volume group layout and computed headroom.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use serde::Serialize;

use crate::extend::DEFAULT_MARGIN_BYTES;
use crate::lvm::probe;
use crate::lvm::types::{BlockDevice, LogicalVolume, VolumeGroup, format_signed, format_size};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub logical_volume: LogicalVolume,
    pub volume_group: VolumeGroup,
    /// Raw kernel-reported capacity of each PV's device, where lsblk can
    /// see it
    pub block_devices: Vec<BlockDevice>,
    pub margin_bytes: u64,
    pub headroom_bytes: i64,
}

pub fn run_status(device: Option<String>, json: bool) -> Result<()> {
    let device = match device {
        Some(d) => d,
        None => probe::detect_root_device().context("failed to detect the root device")?,
    };

    let vg_name = probe::vg_for_lv(&device)?;
    let pvs = probe::pvs_for_vg(&vg_name)?;
    let lv_bytes = probe::lv_size_bytes(&device)?;

    let logical_volume = LogicalVolume {
        device,
        vg_name: vg_name.clone(),
        size_bytes: lv_bytes,
    };
    let block_devices: Vec<BlockDevice> = pvs
        .iter()
        .filter_map(|pv| {
            probe::device_size_bytes(&pv.device)
                .ok()
                .map(|size_bytes| BlockDevice {
                    device: pv.device.clone(),
                    size_bytes,
                })
        })
        .collect();
    let volume_group = VolumeGroup {
        name: vg_name,
        physical_volumes: pvs,
    };

    let headroom = volume_group.size_bytes() as i64
        - logical_volume.size_bytes as i64
        - DEFAULT_MARGIN_BYTES as i64;

    let report = StatusReport {
        logical_volume,
        volume_group,
        block_devices,
        margin_bytes: DEFAULT_MARGIN_BYTES,
        headroom_bytes: headroom,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &StatusReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Object", "Path", "Size"]);

    table.add_row(vec![
        "volume group".to_string(),
        report.volume_group.name.clone(),
        format_size(report.volume_group.size_bytes()),
    ]);
    for pv in &report.volume_group.physical_volumes {
        let raw = report
            .block_devices
            .iter()
            .find(|b| b.device == pv.device)
            .map(|b| format!(" ({} raw)", format_size(b.size_bytes)))
            .unwrap_or_default();
        table.add_row(vec![
            "physical volume".to_string(),
            pv.device.clone(),
            format!("{}{}", format_size(pv.size_bytes), raw),
        ]);
    }
    table.add_row(vec![
        "logical volume".to_string(),
        report.logical_volume.device.clone(),
        format_size(report.logical_volume.size_bytes),
    ]);

    println!("{table}");

    if report.volume_group.physical_volumes.len() > 1 {
        println!(
            "{} volume group {} spans {} physical volumes; extend only supports one",
            "Note:".yellow().bold(),
            report.volume_group.name,
            report.volume_group.physical_volumes.len()
        );
    }

    if report.headroom_bytes > 0 {
        println!(
            "{} {} extendable after reserving {}",
            "Headroom:".green().bold(),
            format_signed(report.headroom_bytes),
            format_size(report.margin_bytes)
        );
    } else {
        println!(
            "{} volume group is fully allocated ({})",
            "Headroom:".yellow().bold(),
            format_signed(report.headroom_bytes)
        );
    }
}
