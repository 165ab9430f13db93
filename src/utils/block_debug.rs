// src/utils/block_debug.rs
use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use crate::utils::error::AppError;

/// Renders the line sequence with every located block marked, e.g.
///
/// ```text
///   12 [pricing      ] Investment Summary
///   13 [pricing      ] One-Time Cost ...
///   14                 Documentation
/// ```
pub fn render_block_dump(lines: &[String], blocks: &[(Range<usize>, &str)]) -> String {
    let mut dump = String::new();

    for (idx, line) in lines.iter().enumerate() {
        let labels: Vec<&str> = blocks
            .iter()
            .filter(|(range, _)| range.contains(&idx))
            .map(|(_, label)| *label)
            .collect();

        let marker = if labels.is_empty() {
            " ".repeat(15)
        } else {
            format!("[{:<13}]", labels.join(","))
        };
        dump.push_str(&format!("{:>4} {} {}\n", idx, marker, line));
    }

    // Summary of ranges at the end so empty blocks are still visible
    dump.push_str("\n--- located blocks ---\n");
    for (range, label) in blocks {
        dump.push_str(&format!("{}: lines {}..{} ({} lines)\n", label, range.start, range.end, range.len()));
    }

    dump
}

/// Writes the annotated block dump to `filename`
pub fn save_block_dump(lines: &[String], blocks: &[(Range<usize>, &str)], filename: &Path) -> Result<(), AppError> {
    let mut file = File::create(filename)?;
    file.write_all(render_block_dump(lines, blocks).as_bytes())?;

    tracing::info!("Saved block dump to {}", filename.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_marks_block_lines() {
        let lines: Vec<String> = ["Routine Management Services", "General Pest Control", "Timeline"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let dump = render_block_dump(&lines, &[(1..2, "services"), (2..2, "empty")]);

        assert!(dump.contains("   1 [services     ] General Pest Control"));
        assert!(dump.contains(&format!("   0 {} Routine Management Services", " ".repeat(15))));
        assert!(dump.contains("empty: lines 2..2 (0 lines)"));
    }
}
