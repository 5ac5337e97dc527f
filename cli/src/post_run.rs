use std::process::{Command, Stdio};

/// A command to run once the merged report has been written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRunCommand {
    raw: String,
    parts: Vec<String>,
}

impl PostRunCommand {
    /// Splits `raw` the way a POSIX shell would, so quoted arguments stay whole.
    pub fn new<T: Into<String>>(raw: T) -> anyhow::Result<Self> {
        let raw = raw.into();
        let parts = shell_words::split(&raw)
            .map_err(|e| anyhow::anyhow!("Failed to parse post-run command {:?}: {}", raw, e))?;
        Ok(Self { raw, parts })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Runs the command with the current environment and stdio. Doing nothing for an empty
    /// command is not an error.
    pub fn execute(&self) -> anyhow::Result<()> {
        let Some((program, args)) = self.parts.split_first() else {
            return Ok(());
        };

        let exit_status = Command::new(program)
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| anyhow::anyhow!("Failed to run {:?}: {}", program, e))?;

        if !exit_status.success() {
            return Err(anyhow::anyhow!(
                "Command {:?} exited with {}",
                self.raw,
                exit_status
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for PostRunCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
