use anyhow::Result;

/// Runs mutating commands, or echoes them when dry-run is active.
pub struct CommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn run(&self, command: &mut std::process::Command) -> Result<()> {
        if self.dry_run {
            self.print_dry_run(command);
            Ok(())
        } else {
            let status = command.status()?;
            if !status.success() {
                anyhow::bail!("Command failed: {:?}", command);
            }
            Ok(())
        }
    }

    fn print_dry_run(&self, command: &std::process::Command) {
        let program = command.get_program().to_string_lossy();
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy()).collect();
        println!("[DRY RUN] {} {}", program, args.join(" "));
    }
}
