//! Host checks for everything an extend run needs.

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use duct::cmd;

use crate::lvm::probe;
use crate::privileges;

#[derive(Debug, Clone)]
pub enum CheckStatus {
    Pass(String),
    Fail(String),
    Warning(String),
}

impl CheckStatus {
    pub fn message(&self) -> &String {
        match self {
            CheckStatus::Pass(msg) => msg,
            CheckStatus::Fail(msg) => msg,
            CheckStatus::Warning(msg) => msg,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckStatus::Pass(_))
    }

    pub fn color_status(&self) -> impl std::fmt::Display {
        match self {
            CheckStatus::Pass(_) => "PASS".green(),
            CheckStatus::Fail(_) => "FAIL".red(),
            CheckStatus::Warning(_) => "WARN".yellow(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
}

#[async_trait]
pub trait DoctorCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self) -> CheckStatus;
}

/// A host tool that must be on PATH
struct ToolCheck {
    tool: &'static str,
    purpose: &'static str,
}

#[async_trait]
impl DoctorCheck for ToolCheck {
    fn name(&self) -> &'static str {
        self.tool
    }

    async fn execute(&self) -> CheckStatus {
        match which::which(self.tool) {
            Ok(path) => CheckStatus::Pass(format!("{}", path.display())),
            Err(_) => CheckStatus::Fail(format!(
                "{} not found on PATH; needed to {}",
                self.tool, self.purpose
            )),
        }
    }
}

/// lvm2 metadata must actually be readable, not just installed
struct LvmResponds;

#[async_trait]
impl DoctorCheck for LvmResponds {
    fn name(&self) -> &'static str {
        "lvm metadata"
    }

    async fn execute(&self) -> CheckStatus {
        match cmd("lvs", ["--version"]).stdout_null().stderr_null().run() {
            Ok(_) => CheckStatus::Pass("lvs responds".to_string()),
            Err(e) => CheckStatus::Warning(format!("lvs did not respond: {}", e)),
        }
    }
}

struct RootPrivileges;

#[async_trait]
impl DoctorCheck for RootPrivileges {
    fn name(&self) -> &'static str {
        "privileges"
    }

    async fn execute(&self) -> CheckStatus {
        if privileges::is_root() {
            CheckStatus::Pass("running as root".to_string())
        } else {
            CheckStatus::Warning(
                "not running as root; extend will re-run itself under sudo".to_string(),
            )
        }
    }
}

/// The root filesystem must sit on a device-mapper volume to be extendable
struct RootOnDeviceMapper;

#[async_trait]
impl DoctorCheck for RootOnDeviceMapper {
    fn name(&self) -> &'static str {
        "root device"
    }

    async fn execute(&self) -> CheckStatus {
        match probe::detect_root_device() {
            Ok(device) => CheckStatus::Pass(device),
            Err(e) => CheckStatus::Fail(e.to_string()),
        }
    }
}

pub async fn run_all_checks(checks: Vec<Box<dyn DoctorCheck + Send + Sync>>) -> Vec<CheckResult> {
    let mut handles = vec![];
    for check in checks {
        let handle = tokio::spawn(async move {
            let name = check.name().to_string();
            let status = check.execute().await;
            CheckResult { name, status }
        });
        handles.push(handle);
    }

    let mut results = vec![];
    for handle in handles {
        if let Ok(result) = handle.await {
            results.push(result);
        }
    }
    results
}

pub fn print_results(results: &[CheckResult]) {
    let header = format!(
        "{: <20} [{}] {}",
        "Check".bold(),
        "Status".bold(),
        "Message".bold()
    );
    println!("{}", header);

    for result in results {
        println!(
            "{: <20} [{}] {}",
            result.name,
            result.status.color_status(),
            result.status.message()
        );
    }
}

pub async fn run_doctor() -> Result<()> {
    let checks: Vec<Box<dyn DoctorCheck + Send + Sync>> = vec![
        Box::new(ToolCheck {
            tool: "lvs",
            purpose: "read logical volume sizes",
        }),
        Box::new(ToolCheck {
            tool: "pvs",
            purpose: "read physical volume sizes",
        }),
        Box::new(ToolCheck {
            tool: "lvextend",
            purpose: "grow the logical volume",
        }),
        Box::new(ToolCheck {
            tool: "resize2fs",
            purpose: "grow the filesystem",
        }),
        Box::new(ToolCheck {
            tool: "lsblk",
            purpose: "read raw block device sizes",
        }),
        Box::new(ToolCheck {
            tool: "findmnt",
            purpose: "detect the root device",
        }),
        Box::new(LvmResponds),
        Box::new(RootPrivileges),
        Box::new(RootOnDeviceMapper),
    ];

    let results = run_all_checks(checks).await;
    print_results(&results);

    let failed = results.iter().filter(|r| !r.status.is_success()).count();
    if failed == 0 {
        println!("{}", "All checks passed".green().bold());
    } else {
        println!(
            "{}",
            format!("{} check(s) did not pass", failed).yellow().bold()
        );
    }
    Ok(())
}
