//! Changelog delivery.
//!
//! The rendered document is printed by `main`; this module covers the
//! other destinations: a plain file and the GitHub Actions step output.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Step output name the changelog is published under.
pub const OUTPUT_NAME: &str = "changelog";

const DELIMITER: &str = "CHANGELOG_EOF";

/// Write the changelog to `path`, replacing any previous content.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write changelog to {}", path.display()))?;
    info!("Changelog written to {}", path.display());
    Ok(())
}

/// Format a multi-line step output entry (`name<<DELIM ... DELIM`).
///
/// The delimiter is extended until it does not occur in `value`.
pub fn github_output_entry(name: &str, value: &str) -> String {
    let mut delimiter = DELIMITER.to_string();
    let mut n = 0;
    while value.lines().any(|line| line == delimiter) {
        n += 1;
        delimiter = format!("{}_{}", DELIMITER, n);
    }

    let mut entry = format!("{}<<{}\n{}", name, delimiter, value);
    if !value.ends_with('\n') {
        entry.push('\n');
    }
    entry.push_str(&delimiter);
    entry.push('\n');
    entry
}

/// Append the changelog to the file named by `$GITHUB_OUTPUT`.
pub fn publish_github_output(content: &str) -> Result<()> {
    let path = std::env::var_os("GITHUB_OUTPUT")
        .context("GITHUB_OUTPUT is not set; --github-output only works inside GitHub Actions")?;
    append_entry(Path::new(&path), OUTPUT_NAME, content)
}

fn append_entry(path: &Path, name: &str, content: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    file.write_all(github_output_entry(name, content).as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Published '{}' step output", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_github_output_entry() {
        assert_eq!(
            github_output_entry("changelog", "\nJira Tickets\n"),
            "changelog<<CHANGELOG_EOF\n\nJira Tickets\nCHANGELOG_EOF\n"
        );
        assert_eq!(
            github_output_entry("changelog", "no newline"),
            "changelog<<CHANGELOG_EOF\nno newline\nCHANGELOG_EOF\n"
        );
    }

    #[test]
    fn test_github_output_entry_avoids_delimiter_clash() {
        let entry = github_output_entry("changelog", "CHANGELOG_EOF\n");
        assert!(entry.starts_with("changelog<<CHANGELOG_EOF_1\n"));
        assert!(entry.ends_with("\nCHANGELOG_EOF_1\n"));
    }

    #[test]
    fn test_append_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "other=1\n").unwrap();

        append_entry(&path, "changelog", "line\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "other=1\nchangelog<<CHANGELOG_EOF\nline\nCHANGELOG_EOF\n");
    }

    #[test]
    fn test_write_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CHANGELOG.txt");
        write_file(&path, "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
