use std::io::Write;
use std::path::Path;

use citescout_acl::ScanSummary;
use citescout_core::{AggregateOutput, AggregatorConfig};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the resolved run settings before any request goes out.
pub fn print_run_header(
    w: &mut dyn Write,
    config: &AggregatorConfig,
    color: ColorMode,
) -> std::io::Result<()> {
    let title = format!(
        "Aggregating citations for {} seed paper(s)",
        config.seed_paper_ids.len()
    );
    if color.enabled() {
        writeln!(w, "{}", title.bold())?;
    } else {
        writeln!(w, "{}", title)?;
    }

    let sections = if config.filter.only_include_sections.is_empty() {
        "any".to_string()
    } else {
        config
            .filter
            .only_include_sections
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let details = [
        format!("  output dir:    {}", config.output_dir.display()),
        format!("  influential:   {}", if config.filter.only_influential { "only" } else { "any" }),
        format!("  sections:      {}", sections),
        format!(
            "  throttle:      {} calls, then {}s pause",
            config.max_calls,
            config.pause.as_secs()
        ),
        format!(
            "  API key:       {}",
            if config.s2_api_key.is_some() { "set" } else { "none" }
        ),
    ];
    for line in details {
        if color.enabled() {
            writeln!(w, "{}", line.dimmed())?;
        } else {
            writeln!(w, "{}", line)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// One line per finished seed.
pub fn print_seed_written(
    w: &mut dyn Write,
    label: &str,
    citations: usize,
    references: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {} ({} citations, {} references)",
            "WROTE".green(),
            label.bold(),
            citations,
            references
        )
    } else {
        writeln!(
            w,
            "WROTE {} ({} citations, {} references)",
            label, citations, references
        )
    }
}

/// Final report for a citation run.
pub fn print_aggregate_summary(
    w: &mut dyn Write,
    output: &AggregateOutput,
    color: ColorMode,
) -> std::io::Result<()> {
    let relations: usize = output
        .seeds
        .iter()
        .map(|s| s.citations.len() + s.references.len())
        .sum();

    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Summary".bold().underline())?;
    } else {
        writeln!(w, "Summary")?;
        writeln!(w, "-------")?;
    }
    writeln!(w, "  Seeds:            {}", output.seeds.len())?;
    writeln!(w, "  Relations kept:   {}", relations)?;
    writeln!(w, "  Unique papers:    {}", output.union.len())?;
    if color.enabled() {
        writeln!(
            w,
            "  Union CSV:        {}",
            output.union_path.display().to_string().cyan()
        )?;
    } else {
        writeln!(w, "  Union CSV:        {}", output.union_path.display())?;
    }
    Ok(())
}

/// Final report for an anthology scan.
pub fn print_scan_summary(
    w: &mut dyn Write,
    summary: &ScanSummary,
    output_path: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Scan summary".bold().underline())?;
    } else {
        writeln!(w, "Scan summary")?;
        writeln!(w, "------------")?;
    }
    writeln!(w, "  Papers in corpus: {}", summary.scanned)?;
    writeln!(w, "  Abstract matches: {}", summary.candidates)?;
    if color.enabled() {
        writeln!(w, "  Rows written:     {}", summary.written.to_string().green())?;
        writeln!(w, "  Below threshold:  {}", summary.skipped)?;
        if summary.failed > 0 {
            writeln!(w, "  Failed:           {}", summary.failed.to_string().red())?;
        } else {
            writeln!(w, "  Failed:           0")?;
        }
    } else {
        writeln!(w, "  Rows written:     {}", summary.written)?;
        writeln!(w, "  Below threshold:  {}", summary.skipped)?;
        writeln!(w, "  Failed:           {}", summary.failed)?;
    }
    writeln!(w, "  Output:           {}", output_path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use citescout_core::InclusionFilter;

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn run_header_hides_key_value() {
        let config = AggregatorConfig {
            seed_paper_ids: vec!["a".into(), "b".into()],
            filter: InclusionFilter::new(true, ["methodology", "background"]),
            output_dir: PathBuf::from("out"),
            s2_api_key: Some("secret".into()),
            max_calls: 100,
            pause: Duration::from_secs(300),
            timeout: Duration::from_secs(30),
        };
        let text = render(|w| print_run_header(w, &config, ColorMode(false)));
        assert!(text.starts_with("Aggregating citations for 2 seed paper(s)"));
        assert!(text.contains("sections:      background, methodology"));
        assert!(text.contains("influential:   only"));
        assert!(text.contains("API key:       set"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn seed_line_without_color() {
        let text = render(|w| print_seed_written(w, "Smith2020", 2, 0, ColorMode(false)));
        assert_eq!(text, "WROTE Smith2020 (2 citations, 0 references)\n");
    }

    #[test]
    fn scan_summary_lists_counts() {
        let summary = ScanSummary {
            scanned: 10,
            candidates: 4,
            written: 1,
            skipped: 1,
            failed: 2,
        };
        let text = render(|w| {
            print_scan_summary(w, &summary, Path::new("file_list.txt"), ColorMode(false))
        });
        assert!(text.contains("Abstract matches: 4"));
        assert!(text.contains("Failed:           2"));
        assert!(text.contains("Output:           file_list.txt"));
    }
}
