use anyhow::Result;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Output;
use tempfile::TempDir;

/// A fake LVM host: a tempdir of PATH shims standing in for the lvm2 and
/// util-linux tools, each logging its argv before emitting canned output.
pub struct FakeLvmHost {
    temp: TempDir,
}

impl FakeLvmHost {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        fs::create_dir(temp.path().join("bin"))?;
        Ok(Self { temp })
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.temp.path().join("bin")
    }

    fn call_log(&self) -> PathBuf {
        self.temp.path().join("calls.log")
    }

    /// Install (or replace) a shim executable in the fake PATH
    pub fn install_shim(&self, name: &str, body: &str) -> Result<()> {
        let path = self.bin_dir().join(name);
        let script = format!(
            "#!/bin/sh\necho \"{} $*\" >> \"{}\"\n{}\n",
            name,
            self.call_log().display(),
            body
        );
        fs::write(&path, script)?;
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms)?;
        Ok(())
    }

    /// Single-PV topology: one volume group, one logical volume, probe
    /// output in exact bytes the way the real tools print it
    pub fn with_single_pv(pv_bytes: u64, lv_bytes: u64) -> Result<Self> {
        let host = Self::new()?;
        host.install_shim("findmnt", "echo /dev/mapper/vg0-root")?;
        host.install_shim(
            "lvs",
            &format!(
                "case \"$*\" in\n  *vg_name*) echo \"  vg0\" ;;\n  *lv_size*) echo \"  {}\" ;;\nesac",
                lv_bytes
            ),
        )?;
        host.install_shim("pvs", &format!("echo \"  /dev/sda3 {}\"", pv_bytes))?;
        host.install_shim("lsblk", &format!("echo \"{}\"", pv_bytes))?;
        Ok(host)
    }

    /// Run the rootgrow binary with the fake PATH in front
    pub fn run(&self, args: &[&str]) -> Result<Output> {
        let path = format!(
            "{}:{}",
            self.bin_dir().display(),
            std::env::var("PATH").unwrap_or_default()
        );
        let output = std::process::Command::new(env!("CARGO_BIN_EXE_rootgrow"))
            .args(args)
            .env("PATH", path)
            .env("NO_COLOR", "1")
            .output()?;
        Ok(output)
    }

    /// Every shim invocation so far, one `tool args` line each
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.call_log())
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
