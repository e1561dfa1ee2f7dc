#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

impl ParsedCommand<'_> {
    pub fn arg_tokens(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
}

impl CommandSpec {
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Splits a command line into its first word and the trimmed remainder.
pub fn parse_command(input: &str) -> Option<ParsedCommand<'_>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let args = parts.next().map(str::trim).unwrap_or_default();
    Some(ParsedCommand { name, args })
}

pub fn render_help_overview(command_specs: &[CommandSpec]) -> String {
    let mut lines = vec!["commands:".to_string()];
    for spec in command_specs {
        lines.push(format!("  {:<34} {}", spec.usage, spec.description));
    }
    lines.join("\n")
}
