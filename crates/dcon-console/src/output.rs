//! Console output sink with origin tagging.
//!
//! Interactive and automated commands share one writer; while an automated
//! command runs, every line it prints carries the automation prefix.

use std::io::Write;
use std::sync::Mutex;

use dcon_bridge::CommandOrigin;
use dcon_core::lock_or_recover;

pub const AUTOMATION_OUTPUT_PREFIX: &str = "[automation] ";

pub struct ConsoleOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    origin: Mutex<CommandOrigin>,
}

impl ConsoleOutput {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            origin: Mutex::new(CommandOrigin::Interactive),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn origin(&self) -> CommandOrigin {
        *lock_or_recover(&self.origin)
    }

    pub fn set_origin(&self, origin: CommandOrigin) {
        *lock_or_recover(&self.origin) = origin;
    }

    pub fn line(&self, text: &str) {
        let prefix = match self.origin() {
            CommandOrigin::Automated => AUTOMATION_OUTPUT_PREFIX,
            CommandOrigin::Interactive => "",
        };
        let mut writer = lock_or_recover(&self.writer);
        for line in text.lines() {
            let _ = writeln!(writer, "{prefix}{line}");
        }
        let _ = writer.flush();
    }

    pub fn error(&self, error: &anyhow::Error) {
        self.line(&format!("error: {error:#}"));
    }

    pub fn prompt(&self, prompt: &str) {
        let mut writer = lock_or_recover(&self.writer);
        let _ = write!(writer, "{prompt}");
        let _ = writer.flush();
    }
}
