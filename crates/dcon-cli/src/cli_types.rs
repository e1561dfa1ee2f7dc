use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
/// Enumerates supported `CliCommandFileErrorMode` values.
pub enum CliCommandFileErrorMode {
    FailFast,
    ContinueOnError,
}

impl CliCommandFileErrorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::ContinueOnError => "continue-on-error",
        }
    }
}
