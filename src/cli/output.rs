// Output formatting for CLI

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::cli::{CliResult, OutputFormat};

/// Format and output reports
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Output any serializable report to stdout
    pub fn output<T: Serialize>(&self, report: &T) -> CliResult<()> {
        let value = serde_json::to_value(report)?;
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        self.output_value(&value, &mut writer)
    }

    /// Output a JSON value
    pub fn output_value(&self, value: &Value, writer: &mut impl Write) -> CliResult<()> {
        match self.format {
            OutputFormat::Pretty => writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?,
            OutputFormat::Json => writeln!(writer, "{}", serde_json::to_string(value)?)?,
            OutputFormat::KeyValue => self.output_key_value(value, "", writer)?,
            OutputFormat::Table => self.output_table(value, writer)?,
        }
        Ok(())
    }

    /// Output as key-value pairs, nested objects flattened with dotted keys
    fn output_key_value(
        &self,
        value: &Value,
        prefix: &str,
        writer: &mut impl Write,
    ) -> CliResult<()> {
        if let Some(obj) = value.as_object() {
            let mut items: Vec<_> = obj.iter().collect();
            items.sort_by(|a, b| a.0.cmp(b.0));

            for (key, value) in items {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                match value {
                    Value::Object(_) => self.output_key_value(value, &key, writer)?,
                    _ => writeln!(writer, "{}: {}", key, self.format_value(value))?,
                }
            }
        }
        Ok(())
    }

    /// Output as table
    fn output_table(&self, value: &Value, writer: &mut impl Write) -> CliResult<()> {
        if let Some(obj) = value.as_object() {
            let max_key_len = obj.keys().map(|k| k.len()).max().unwrap_or(0);

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;

            for (key, value) in obj {
                writeln!(
                    writer,
                    "{:<width$}{}",
                    format!("{}:", key),
                    self.format_value(value),
                    width = max_key_len + 2
                )?;
            }

            writeln!(writer, "{}", "=".repeat(max_key_len + 30))?;
        }
        Ok(())
    }

    /// Format a JSON value for display
    fn format_value(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => "(null)".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(arr) => {
                if arr.is_empty() {
                    "[]".to_string()
                } else {
                    format!("[{} items]", arr.len())
                }
            }
            Value::Object(obj) => {
                if obj.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{{} items}}", obj.len())
                }
            }
        }
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            eprintln!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            eprintln!("  {}", message);
        }
    }
}

/// Progress indicator for batch operations
pub struct ProgressBar {
    total: usize,
    current: usize,
    show: bool,
}

impl ProgressBar {
    pub fn new(total: usize, show: bool) -> Self {
        Self {
            total,
            current: 0,
            show,
        }
    }

    pub fn increment(&mut self, label: &str) {
        self.current += 1;
        if self.show && self.total > 0 {
            let percent = (self.current * 100) / self.total;
            eprint!("\r[{}/{}] ({}%) {}", self.current, self.total, percent, label);
            if self.current == self.total {
                eprintln!();
            }
            io::stderr().flush().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(format: OutputFormat, value: &Value) -> String {
        let mut out = Vec::new();
        OutputFormatter::new(format, true)
            .output_value(value, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_key_value_flattens_objects() {
        let value = json!({"rate": 48000, "header": {"channels": 2}, "links": [1, 2]});
        assert_eq!(
            render(OutputFormat::KeyValue, &value),
            "header.channels: 2\nlinks: [2 items]\nrate: 48000\n"
        );
    }

    #[test]
    fn test_compact_json() {
        let value = json!({"frames": 144000});
        assert_eq!(render(OutputFormat::Json, &value), "{\"frames\":144000}\n");
    }
}
