use anyhow::Result;

/// Whether the process is already running as root
pub fn is_root() -> bool {
    matches!(sudo::check(), sudo::RunningAs::Root)
}

/// Re-exec under sudo when running as a plain user.
///
/// Mutating LVM metadata requires root; read-only and dry-run paths must
/// not call this.
pub fn ensure_root() -> Result<()> {
    if let sudo::RunningAs::User = sudo::check() {
        sudo::with_env(&["RUST_BACKTRACE", "RUST_LOG"])
            .map_err(|e| anyhow::anyhow!("Failed to escalate privileges: {}", e))?;
    }
    Ok(())
}
