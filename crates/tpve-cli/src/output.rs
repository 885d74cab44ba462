use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

/// Output format for commands that render data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Parse from the `-o` argument; unknown values fall back to a table.
    pub fn from_str_arg(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            _ => Self::Table,
        }
    }
}

/// Render rows as a table, or the whole document as JSON/YAML.
pub fn render<T: Serialize + Tabled, D: Serialize>(
    rows: &[T],
    document: &D,
    format: OutputFormat,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Table if rows.is_empty() => "(none)".to_string(),
        OutputFormat::Table => tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(document)?,
        OutputFormat::Yaml => serde_yaml::to_string(document)?,
    })
}
