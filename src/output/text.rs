//! Human-readable output for scan results.
//!
//! One block per group, headed by the display hash, the match type and the
//! size, then the member paths, and a closing statistics line. Colours come
//! from `yansi` and follow its global switch (see [`yansi::disable`]).

use std::io::Write;

use bytesize::ByteSize;
use yansi::Paint;

use crate::controller::ScanResult;
use crate::duplicates::{DuplicateGroup, MatchType};

/// Text renderer for a scan result.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    result: &'a ScanResult,
}

impl<'a> TextOutput<'a> {
    /// Create a text view of a scan result.
    #[must_use]
    pub fn new(result: &'a ScanResult) -> Self {
        Self { result }
    }

    /// Write the listing.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (index, group) in self.result.groups.iter().enumerate() {
            writeln!(writer, "{}", group_header(index + 1, group))?;
            for file in &group.files {
                writeln!(writer, "  {}", file.path.display())?;
            }
            writeln!(writer)?;
        }

        let stats = &self.result.stats;
        if self.result.groups.is_empty() {
            writeln!(writer, "{}", "No duplicates found.".dim())?;
        }
        writeln!(
            writer,
            "Scanned {} entries: {} groups, {} files matched, {} duplicates in {} ms",
            stats.scanned,
            stats.groups.bold(),
            stats.matched,
            stats.total_duplicates.bold(),
            stats.elapsed_ms
        )?;
        if stats.timed_out {
            let reason = self
                .result
                .stop_reason
                .map_or_else(|| "stopped".to_string(), |r| r.to_string());
            writeln!(
                writer,
                "{}",
                format!("Partial result: scan {} before completion", reason)
                    .yellow()
                    .bold()
            )?;
        }
        if self.result.limit_reached {
            writeln!(writer, "{}", "File limit reached; some files were not considered.".yellow())?;
        }
        Ok(())
    }

    /// Render the listing to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if self.write_to(&mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn group_header(number: usize, group: &DuplicateGroup) -> String {
    let label = match group.match_type {
        MatchType::Exact => group.match_type.as_str().green().bold(),
        MatchType::Metadata => group.match_type.as_str().yellow().bold(),
        MatchType::FuzzyName => group.match_type.as_str().cyan().bold(),
    };
    let size = match group.match_type {
        MatchType::FuzzyName => group
            .files
            .iter()
            .map(|f| ByteSize(f.size).to_string())
            .collect::<Vec<_>>()
            .join(" / "),
        _ => group
            .files
            .first()
            .map(|f| ByteSize(f.size).to_string())
            .unwrap_or_default(),
    };
    format!(
        "[{}] {} {} ({} files, {})",
        number,
        group.display_hash().bold(),
        label,
        group.len(),
        size
    )
}
