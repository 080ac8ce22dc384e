//! Structured per-phase progress events.
//!
//! Each phase of an extension run emits one record carrying the numbers it
//! worked with, so observability does not depend on scraping free text.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::lvm::types::{format_signed, format_size};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Discover {
        device: String,
        vg_name: String,
        pv_device: String,
        pv_bytes: u64,
        lv_bytes: u64,
    },
    Compute {
        pv_bytes: u64,
        lv_bytes: u64,
        margin_bytes: u64,
        headroom_bytes: i64,
    },
    Decision {
        proceed: bool,
        reason: String,
    },
    Extend {
        extend_bytes: u64,
    },
    ResizeFs {
        device: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub phase: Phase,
}

impl Event {
    pub fn new(phase: Phase) -> Self {
        Self {
            timestamp: Utc::now(),
            phase,
        }
    }
}

/// Where phase events go: a terminal, a JSON stream, or a test recorder.
pub trait EventSink {
    fn emit(&self, event: &Event);
}

/// Renders events as colored progress lines.
pub struct HumanSink;

impl EventSink for HumanSink {
    fn emit(&self, event: &Event) {
        match &event.phase {
            Phase::Discover {
                device,
                vg_name,
                pv_device,
                pv_bytes,
                lv_bytes,
            } => {
                println!(
                    "{} {} in volume group {} ({} of {} on {})",
                    "Discovered".cyan().bold(),
                    device,
                    vg_name,
                    format_size(*lv_bytes),
                    format_size(*pv_bytes),
                    pv_device
                );
            }
            Phase::Compute {
                margin_bytes,
                headroom_bytes,
                ..
            } => {
                println!(
                    "{} {} extendable after reserving {}",
                    "Computed".cyan().bold(),
                    format_signed(*headroom_bytes),
                    format_size(*margin_bytes)
                );
            }
            Phase::Decision { proceed, reason } => {
                if *proceed {
                    println!("{} {}", "Proceeding:".cyan().bold(), reason);
                } else {
                    println!("{} {}", "Skipping:".yellow().bold(), reason);
                }
            }
            Phase::Extend { extend_bytes } => {
                println!(
                    "{} logical volume by {}",
                    "Extending".green().bold(),
                    format_size(*extend_bytes)
                );
            }
            Phase::ResizeFs { device } => {
                println!(
                    "{} filesystem on {}",
                    "Resizing".green().bold(),
                    device
                );
            }
        }
    }
}

/// Renders each event as one JSON object per line.
pub struct JsonSink;

impl EventSink for JsonSink {
    fn emit(&self, event: &Event) {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
    }
}
