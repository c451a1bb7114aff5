use scribe_db::SaveReport;

use crate::cli::GlobalFlags;

/// Print degraded-audit warnings to stderr unless `--quiet`.
pub fn warn_degraded(report: &SaveReport, flags: &GlobalFlags) {
    if flags.quiet {
        return;
    }
    for warning in &report.warnings {
        eprintln!("scribe warning: audit row degraded: {warning}");
    }
}
