//! Root-volume extension core.
//!
//! A run is a single pass through discover -> compute -> decide, followed by
//! the lvextend/resize2fs pair when headroom exists. Nothing is cached
//! between runs; every invocation probes live state so capacity added by a
//! cloud disk resize is picked up on the next run.

pub mod events;

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use serde::Serialize;
use thiserror::Error;

use crate::executor::CommandExecutor;
use crate::lvm::error::LvmError;
use crate::lvm::types::{format_size, parse_size};
use crate::lvm::{LvmMutate, LvmQuery, SystemLvm, probe};
use crate::privileges;
use events::{Event, EventSink, HumanSink, JsonSink, Phase};

/// Capacity left unallocated on the volume group after an extension.
/// Guards against filesystem-resize edge failures on a fully-packed VG.
pub const DEFAULT_MARGIN_BYTES: u64 = 4 * 1024 * 1024;

/// Outcome of one extension run.
///
/// "Nothing to do" is a successful outcome (`performed: false`), not an
/// error. A partial outcome (volume grew, filesystem did not) only ever
/// travels inside [`ExtendError::FilesystemResize`].
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionResult {
    pub device: String,
    pub performed: bool,
    pub filesystem_resized: bool,
    pub extend_bytes: u64,
    pub reason: Option<String>,
}

#[derive(Error, Debug)]
pub enum ExtendError {
    #[error(
        "volume group {vg} is backed by {} physical volumes ({}); exactly one is supported",
        .pvs.len(),
        .pvs.join(", ")
    )]
    UnsupportedTopology { vg: String, pvs: Vec<String> },

    #[error(
        "filesystem resize failed after the volume grew by {}; the filesystem no longer matches the volume size, run resize2fs manually",
        format_size(.partial.extend_bytes)
    )]
    FilesystemResize {
        partial: ExtensionResult,
        #[source]
        source: LvmError,
    },

    #[error(transparent)]
    Lvm(#[from] LvmError),
}

/// Grows a logical volume to consume all safely-extendable capacity on its
/// volume group, then grows the filesystem to match.
pub struct VolumeExtender<'a, B: LvmQuery + LvmMutate> {
    backend: &'a B,
    sink: &'a dyn EventSink,
}

impl<'a, B: LvmQuery + LvmMutate> VolumeExtender<'a, B> {
    pub fn new(backend: &'a B, sink: &'a dyn EventSink) -> Self {
        Self { backend, sink }
    }

    /// Extend `device` if the volume group has headroom beyond the margin.
    ///
    /// All discovery happens before any mutation; a failed probe aborts the
    /// run with nothing applied. If lvextend succeeds and resize2fs then
    /// fails, the error carries the partial result so the caller can alert
    /// an operator instead of retrying blindly.
    pub fn extend_root_if_possible(
        &self,
        device: &str,
        safety_margin_bytes: u64,
    ) -> Result<ExtensionResult, ExtendError> {
        // DISCOVER
        let vg = self.backend.vg_for_lv(device)?;
        let pvs = self.backend.pvs_for_vg(&vg)?;
        let pv = match pvs.as_slice() {
            [single] => single.clone(),
            [] => {
                return Err(ExtendError::Lvm(LvmError::Resolution {
                    device: device.to_string(),
                    reason: format!("volume group {} has no physical volumes", vg),
                }));
            }
            many => {
                return Err(ExtendError::UnsupportedTopology {
                    vg,
                    pvs: many.iter().map(|p| p.device.clone()).collect(),
                });
            }
        };
        let lv_bytes = self.backend.lv_size_bytes(device)?;
        self.sink.emit(&Event::new(Phase::Discover {
            device: device.to_string(),
            vg_name: vg,
            pv_device: pv.device.clone(),
            pv_bytes: pv.size_bytes,
            lv_bytes,
        }));

        // COMPUTE, in signed bytes so a deficit is representable
        let headroom = pv.size_bytes as i64 - lv_bytes as i64 - safety_margin_bytes as i64;
        self.sink.emit(&Event::new(Phase::Compute {
            pv_bytes: pv.size_bytes,
            lv_bytes,
            margin_bytes: safety_margin_bytes,
            headroom_bytes: headroom,
        }));

        // DECISION
        if headroom <= 0 {
            self.sink.emit(&Event::new(Phase::Decision {
                proceed: false,
                reason: "insufficient headroom".to_string(),
            }));
            return Ok(ExtensionResult {
                device: device.to_string(),
                performed: false,
                filesystem_resized: false,
                extend_bytes: 0,
                reason: Some("insufficient headroom".to_string()),
            });
        }

        let extend_bytes = headroom as u64;
        self.sink.emit(&Event::new(Phase::Decision {
            proceed: true,
            reason: format!("{} available", format_size(extend_bytes)),
        }));

        // EXTEND_LV
        self.sink.emit(&Event::new(Phase::Extend { extend_bytes }));
        self.backend.extend_lv_bytes(device, extend_bytes)?;

        // RESIZE_FS
        self.sink.emit(&Event::new(Phase::ResizeFs {
            device: device.to_string(),
        }));
        if let Err(source) = self.backend.resize_filesystem(device) {
            let partial = ExtensionResult {
                device: device.to_string(),
                performed: true,
                filesystem_resized: false,
                extend_bytes,
                reason: Some("filesystem resize failed".to_string()),
            };
            return Err(ExtendError::FilesystemResize { partial, source });
        }

        Ok(ExtensionResult {
            device: device.to_string(),
            performed: true,
            filesystem_resized: true,
            extend_bytes,
            reason: None,
        })
    }
}

/// CLI entry for `rootgrow extend`.
pub fn run_extend(device: Option<String>, margin: &str, dry_run: bool, json: bool) -> Result<()> {
    let margin_bytes =
        parse_size(margin).ok_or_else(|| anyhow!("invalid --margin value: {}", margin))?;

    // Queries run even in dry-run mode; only a mutating run needs root.
    if !dry_run {
        privileges::ensure_root()?;
    }

    let device = match device {
        Some(d) => d,
        None => probe::detect_root_device().context("failed to detect the root device")?,
    };

    if dry_run {
        println!("*** DRY RUN MODE ENABLED - No changes will be made ***");
    }

    let executor = CommandExecutor::new(dry_run);
    let backend = SystemLvm::new(&executor);
    let sink: Box<dyn EventSink> = if json {
        Box::new(JsonSink)
    } else {
        Box::new(HumanSink)
    };
    let extender = VolumeExtender::new(&backend, sink.as_ref());

    match extender.extend_root_if_possible(&device, margin_bytes) {
        Ok(result) => {
            report_result(&result, json);
            Ok(())
        }
        Err(ExtendError::FilesystemResize { partial, source }) => {
            report_result(&partial, json);
            Err(ExtendError::FilesystemResize { partial, source }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn report_result(result: &ExtensionResult, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(result) {
            println!("{}", line);
        }
        return;
    }

    if !result.performed {
        println!(
            "{} {}",
            "Nothing to do:".yellow().bold(),
            result.reason.as_deref().unwrap_or("no headroom")
        );
    } else if result.filesystem_resized {
        println!(
            "{} extended {} by {}",
            "Done:".green().bold(),
            result.device,
            format_size(result.extend_bytes)
        );
    } else {
        eprintln!(
            "{} {} grew by {} but the filesystem was not resized",
            "Warning:".red().bold(),
            result.device,
            format_size(result.extend_bytes)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lvm::types::PhysicalVolume;
    use std::cell::RefCell;

    struct FakeLvm {
        vg: &'static str,
        pvs: Vec<PhysicalVolume>,
        lv_bytes: RefCell<u64>,
        calls: RefCell<Vec<String>>,
        fail_resize: bool,
    }

    impl FakeLvm {
        fn single_pv(pv_bytes: u64, lv_bytes: u64) -> Self {
            Self {
                vg: "vg0",
                pvs: vec![PhysicalVolume {
                    device: "/dev/sda3".to_string(),
                    size_bytes: pv_bytes,
                }],
                lv_bytes: RefCell::new(lv_bytes),
                calls: RefCell::new(vec![]),
                fail_resize: false,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl LvmQuery for FakeLvm {
        fn vg_for_lv(&self, _device: &str) -> Result<String, LvmError> {
            Ok(self.vg.to_string())
        }

        fn pvs_for_vg(&self, _vg: &str) -> Result<Vec<PhysicalVolume>, LvmError> {
            Ok(self.pvs.clone())
        }

        fn lv_size_bytes(&self, _device: &str) -> Result<u64, LvmError> {
            Ok(*self.lv_bytes.borrow())
        }
    }

    impl LvmMutate for FakeLvm {
        fn extend_lv_bytes(&self, _device: &str, bytes: u64) -> Result<(), LvmError> {
            self.calls.borrow_mut().push(format!("extend:{}", bytes));
            *self.lv_bytes.borrow_mut() += bytes;
            Ok(())
        }

        fn resize_filesystem(&self, _device: &str) -> Result<(), LvmError> {
            self.calls.borrow_mut().push("resize".to_string());
            if self.fail_resize {
                Err(LvmError::ResizeFailed("no space left on device".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct NullSink;

    impl EventSink for NullSink {
        fn emit(&self, _event: &Event) {}
    }

    struct RecordingSink(RefCell<Vec<Event>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: &Event) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    const LV: &str = "/dev/mapper/vg0-root";

    #[test]
    fn test_extends_by_exact_headroom() {
        let fake = FakeLvm::single_pv(100_000_000_000, 95_000_000_000);
        let extender = VolumeExtender::new(&fake, &NullSink);

        let result = extender.extend_root_if_possible(LV, 4_194_304).unwrap();

        assert!(result.performed);
        assert!(result.filesystem_resized);
        assert_eq!(result.extend_bytes, 4_995_805_696);
        assert_eq!(fake.calls(), vec!["extend:4995805696", "resize"]);
    }

    #[test]
    fn test_no_headroom_is_clean_noop() {
        let fake = FakeLvm::single_pv(50_000_000_000, 50_000_000_000);
        let extender = VolumeExtender::new(&fake, &NullSink);

        let result = extender.extend_root_if_possible(LV, 4_194_304).unwrap();

        assert!(!result.performed);
        assert!(!result.filesystem_resized);
        assert_eq!(result.extend_bytes, 0);
        assert_eq!(result.reason.as_deref(), Some("insufficient headroom"));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_margin_alone_can_eat_the_headroom() {
        // 1 MiB of raw headroom, 4 MiB margin: deficit, not an extension
        let fake = FakeLvm::single_pv(50_001_048_576, 50_000_000_000);
        let extender = VolumeExtender::new(&fake, &NullSink);

        let result = extender
            .extend_root_if_possible(LV, DEFAULT_MARGIN_BYTES)
            .unwrap();

        assert!(!result.performed);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_zero_margin_extends_to_full_capacity() {
        let fake = FakeLvm::single_pv(50_000_000_100, 50_000_000_000);
        let extender = VolumeExtender::new(&fake, &NullSink);

        let result = extender.extend_root_if_possible(LV, 0).unwrap();

        assert!(result.performed);
        assert_eq!(result.extend_bytes, 100);
    }

    #[test]
    fn test_second_run_is_noop() {
        let fake = FakeLvm::single_pv(100_000_000_000, 95_000_000_000);
        let extender = VolumeExtender::new(&fake, &NullSink);

        let first = extender.extend_root_if_possible(LV, 4_194_304).unwrap();
        assert!(first.performed);

        // The fake grew the LV by the extension, so the second pass sees
        // only the margin left and skips.
        let second = extender.extend_root_if_possible(LV, 4_194_304).unwrap();
        assert!(!second.performed);
        assert_eq!(fake.calls().len(), 2);
    }

    #[test]
    fn test_new_capacity_between_runs_extends_again() {
        let fake = FakeLvm::single_pv(100_000_000_000, 95_000_000_000);
        {
            let extender = VolumeExtender::new(&fake, &NullSink);
            extender.extend_root_if_possible(LV, 4_194_304).unwrap();
        }

        // Cloud disk grew under the PV
        let grown = FakeLvm {
            vg: "vg0",
            pvs: vec![PhysicalVolume {
                device: "/dev/sda3".to_string(),
                size_bytes: 200_000_000_000,
            }],
            lv_bytes: RefCell::new(*fake.lv_bytes.borrow()),
            calls: RefCell::new(vec![]),
            fail_resize: false,
        };
        let extender = VolumeExtender::new(&grown, &NullSink);
        let result = extender.extend_root_if_possible(LV, 4_194_304).unwrap();

        assert!(result.performed);
        assert_eq!(result.extend_bytes, 100_000_000_000);
    }

    #[test]
    fn test_two_pvs_is_unsupported_topology() {
        let fake = FakeLvm {
            vg: "vg0",
            pvs: vec![
                PhysicalVolume {
                    device: "/dev/sda3".to_string(),
                    size_bytes: 100_000_000_000,
                },
                PhysicalVolume {
                    device: "/dev/sdb1".to_string(),
                    size_bytes: 500_000_000_000,
                },
            ],
            lv_bytes: RefCell::new(50_000_000_000),
            calls: RefCell::new(vec![]),
            fail_resize: false,
        };
        let extender = VolumeExtender::new(&fake, &NullSink);

        let err = extender
            .extend_root_if_possible(LV, 4_194_304)
            .unwrap_err();

        assert!(matches!(err, ExtendError::UnsupportedTopology { .. }));
        assert!(err.to_string().contains("/dev/sdb1"));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_resize_failure_reports_partial_result() {
        let mut fake = FakeLvm::single_pv(100_000_000_000, 95_000_000_000);
        fake.fail_resize = true;
        let extender = VolumeExtender::new(&fake, &NullSink);

        let err = extender
            .extend_root_if_possible(LV, 4_194_304)
            .unwrap_err();

        match err {
            ExtendError::FilesystemResize { partial, .. } => {
                assert!(partial.performed);
                assert!(!partial.filesystem_resized);
                assert_eq!(partial.extend_bytes, 4_995_805_696);
            }
            other => panic!("expected FilesystemResize, got {:?}", other),
        }
        // Both mutations were attempted, in order
        assert_eq!(fake.calls(), vec!["extend:4995805696", "resize"]);
    }

    #[test]
    fn test_event_sequence_for_an_extension() {
        let fake = FakeLvm::single_pv(100_000_000_000, 95_000_000_000);
        let sink = RecordingSink(RefCell::new(vec![]));
        let extender = VolumeExtender::new(&fake, &sink);

        extender.extend_root_if_possible(LV, 4_194_304).unwrap();

        let events = sink.0.borrow();
        let phases: Vec<&'static str> = events
            .iter()
            .map(|e| match e.phase {
                Phase::Discover { .. } => "discover",
                Phase::Compute { .. } => "compute",
                Phase::Decision { .. } => "decision",
                Phase::Extend { .. } => "extend",
                Phase::ResizeFs { .. } => "resize_fs",
            })
            .collect();
        assert_eq!(
            phases,
            vec!["discover", "compute", "decision", "extend", "resize_fs"]
        );

        match &events[1].phase {
            Phase::Compute { headroom_bytes, .. } => assert_eq!(*headroom_bytes, 4_995_805_696),
            other => panic!("expected compute event, got {:?}", other),
        }
    }

    #[test]
    fn test_event_sequence_for_a_skip() {
        let fake = FakeLvm::single_pv(50_000_000_000, 50_000_000_000);
        let sink = RecordingSink(RefCell::new(vec![]));
        let extender = VolumeExtender::new(&fake, &sink);

        extender.extend_root_if_possible(LV, 4_194_304).unwrap();

        let events = sink.0.borrow();
        assert_eq!(events.len(), 3);
        match &events[1].phase {
            Phase::Compute { headroom_bytes, .. } => assert_eq!(*headroom_bytes, -4_194_304),
            other => panic!("expected compute event, got {:?}", other),
        }
        match &events[2].phase {
            Phase::Decision { proceed, reason } => {
                assert!(!*proceed);
                assert_eq!(reason, "insufficient headroom");
            }
            other => panic!("expected decision event, got {:?}", other),
        }
    }
}
