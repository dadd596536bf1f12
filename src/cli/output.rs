//! Coloured status lines for the terminal.

use std::io::{self, IsTerminal};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::batch::BatchSummary;
use crate::processor::ConversionResult;

/// Stdout stream that only colours when attached to a terminal.
pub fn stdout() -> StandardStream {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

fn colored(out: &mut dyn WriteColor, color: Color, bold: bool, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
    write!(out, "{text}")?;
    out.reset()?;
    writeln!(out)
}

/// Green line for something that worked.
pub fn success(out: &mut dyn WriteColor, text: &str) -> io::Result<()> {
    colored(out, Color::Green, true, &format!("✅ {text}"))
}

/// Red line for something that failed.
pub fn failure(out: &mut dyn WriteColor, text: &str) -> io::Result<()> {
    colored(out, Color::Red, true, &format!("❌ {text}"))
}

/// Yellow line for a heads-up.
pub fn warning(out: &mut dyn WriteColor, text: &str) -> io::Result<()> {
    colored(out, Color::Yellow, false, &format!("⚠️  {text}"))
}

/// Bold cyan section heading, preceded by a blank line.
pub fn heading(out: &mut dyn WriteColor, text: &str) -> io::Result<()> {
    writeln!(out)?;
    colored(out, Color::Cyan, true, text)
}

/// Prints what happened to one file.
pub fn report_result(out: &mut dyn WriteColor, result: &ConversionResult) -> io::Result<()> {
    let name = result
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.source.display().to_string());

    heading(out, &format!("📁 Processing: {name}"))?;
    if let Some((rows, columns)) = result.dimensions {
        writeln!(out, "📏 Dimensions: {rows} rows × {columns} columns")?;
    }

    if result.success {
        success(out, "Conversion completed!")?;
        writeln!(out, "🔗 Total hyperlinks created: {}", result.hyperlinks)?;
        if result.hyperlinks == 0 {
            warning(out, "No emails, websites or profile links were found")?;
        }
        if let Some(output) = &result.output {
            writeln!(out, "💾 Saved as: {}", output.display())?;
        }
    } else {
        failure(
            out,
            &format!(
                "Error: {}",
                result.error.as_deref().unwrap_or("unknown failure")
            ),
        )?;
    }
    if let Some(backup) = &result.backup {
        writeln!(out, "📂 Backup: {}", backup.display())?;
    }
    Ok(())
}

/// Prints the closing line of a batch run.
pub fn report_batch(out: &mut dyn WriteColor, summary: &BatchSummary) -> io::Result<()> {
    writeln!(out)?;
    let line = format!(
        "Batch processing completed: {}/{} files successful",
        summary.success_count(),
        summary.total_count()
    );
    if summary.any_succeeded() {
        success(out, &line)
    } else {
        failure(out, &line)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use termcolor::NoColor;

    fn render(f: impl FnOnce(&mut dyn WriteColor) -> io::Result<()>) -> String {
        let mut out = NoColor::new(Vec::new());
        f(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn successful_result() {
        let result = ConversionResult {
            source: PathBuf::from("/data/contacts.xlsx"),
            output: Some(PathBuf::from("/data/contacts_with_hyperlinks.xlsx")),
            hyperlinks: 4,
            backup: None,
            dimensions: Some((3, 2)),
            success: true,
            error: None,
        };
        let text = render(|out| report_result(out, &result));
        insta::assert_snapshot!(text.trim_start(), @r###"
        📁 Processing: contacts.xlsx
        📏 Dimensions: 3 rows × 2 columns
        ✅ Conversion completed!
        🔗 Total hyperlinks created: 4
        💾 Saved as: /data/contacts_with_hyperlinks.xlsx
        "###);
    }

    #[test]
    fn empty_conversion_warns() {
        let result = ConversionResult {
            source: PathBuf::from("notes.xlsx"),
            output: Some(PathBuf::from("notes_with_hyperlinks.xlsx")),
            hyperlinks: 0,
            backup: None,
            dimensions: Some((2, 1)),
            success: true,
            error: None,
        };
        let text = render(|out| report_result(out, &result));
        assert!(text.contains("⚠️  No emails, websites or profile links were found"));
    }

    #[test]
    fn failed_result_shows_error() {
        let result = ConversionResult {
            source: PathBuf::from("broken.xlsx"),
            output: None,
            hyperlinks: 0,
            backup: Some(PathBuf::from("backups/broken.xlsx.backup_20240101_000000")),
            dimensions: None,
            success: false,
            error: Some("Failed to open workbook".to_string()),
        };
        let text = render(|out| report_result(out, &result));
        assert!(text.contains("❌ Error: Failed to open workbook"));
        assert!(text.contains("📂 Backup: backups/broken.xlsx.backup_20240101_000000"));
        assert!(!text.contains("Saved as"));
    }
}
