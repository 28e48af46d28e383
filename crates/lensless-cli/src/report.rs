use console::Style;
use lensless_core::convert::{BatchSummary, FileReport, Tag};

struct Styles {
    ok: Style,
    skip: Style,
    warn: Style,
    err: Style,
    label: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            ok: Style::new().green(),
            skip: Style::new().dim(),
            warn: Style::new().yellow(),
            err: Style::new().red().bold().for_stderr(),
            label: Style::new().dim(),
        }
    }

    fn for_tag(&self, tag: Tag) -> &Style {
        match tag {
            Tag::Ok => &self.ok,
            Tag::Skip => &self.skip,
            Tag::Warn => &self.warn,
            Tag::Err => &self.err,
        }
    }
}

/// One tagged line per file; `[err]` goes to stderr.
pub fn print_report(report: &FileReport) {
    let s = Styles::new();
    let line = format!(
        "{} {}: {}",
        s.for_tag(report.tag).apply_to(report.tag),
        report.display_name(),
        report.message
    );
    match report.tag {
        Tag::Err => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

pub fn print_summary(summary: &BatchSummary) {
    if summary.total() < 2 {
        return;
    }
    let s = Styles::new();
    println!(
        "{} {} ok, {} skipped, {} warned, {} failed",
        s.label.apply_to(format!("{} files:", summary.total())),
        s.ok.apply_to(summary.ok),
        s.skip.apply_to(summary.skipped),
        s.warn.apply_to(summary.warned),
        s.label.apply_to(summary.failed),
    );
}
