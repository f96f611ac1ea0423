use chainscore_core::checks::CheckDefinition;
use chainscore_core::result::{CheckResult, MAX_RESULT_SCORE};
use chainscore_core::{DetailLevel, ScanReport};
use colored::*;

/// Print a scan report to the terminal.
pub fn print_scan_report(report: &ScanReport) {
    println!();
    println!(
        "{}",
        format!(
            " chainscore v{} | scanning {}",
            env!("CARGO_PKG_VERSION"),
            report.repo
        )
        .bold()
    );
    println!(
        " {} {}",
        "|-".dimmed(),
        report.date.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed()
    );
    println!();
    println!(" {}", "=".repeat(60).dimmed());
    println!();

    for check in &report.checks {
        print_check(check);
        println!();
    }

    println!(" {}", "=".repeat(60).dimmed());
    println!();

    // Summary
    println!(" {}", "Summary".bold().underline());
    for check in &report.checks {
        println!(
            " {} {:<24} {}",
            "|-".dimmed(),
            check.name,
            score_label(check)
        );
    }
    println!();
}

fn print_check(check: &CheckResult) {
    println!(" {} {}", score_tag(check), check.name.bold());
    println!("   {} {}", "|".dimmed(), check.reason);

    if let Some(error) = &check.error {
        println!("   {} {}", "|".dimmed(), error.red());
    }

    for detail in &check.details {
        let tag = match detail.level {
            DetailLevel::Warn => detail.level.symbol().yellow().bold().to_string(),
            DetailLevel::Info => detail.level.symbol().cyan().to_string(),
            // Debug details are only shown through the log
            DetailLevel::Debug => continue,
        };
        println!("   {} {}: {}", "|".dimmed(), tag, detail.message);
    }
}

fn score_tag(check: &CheckResult) -> String {
    if check.is_runtime_error() {
        return " ERROR ".on_red().white().bold().to_string();
    }
    let text = format!(" {:>2}/{} ", check.score, MAX_RESULT_SCORE);
    match check.score {
        s if s >= MAX_RESULT_SCORE => text.on_green().black().bold().to_string(),
        s if s >= 5 => text.on_yellow().black().bold().to_string(),
        _ => text.on_red().white().bold().to_string(),
    }
}

fn score_label(check: &CheckResult) -> String {
    if check.is_runtime_error() {
        return "error".red().bold().to_string();
    }
    let text = format!("{}/{}", check.score, MAX_RESULT_SCORE);
    match check.score {
        s if s >= MAX_RESULT_SCORE => text.green().to_string(),
        s if s >= 5 => text.yellow().to_string(),
        _ => text.red().bold().to_string(),
    }
}

/// Print the registered checks.
pub fn print_check_list(checks: &[CheckDefinition]) {
    println!();
    println!(" {}", "Available checks".bold().underline());
    for check in checks {
        println!(
            " {} {:<24} {}",
            "|-".dimmed(),
            check.name.cyan(),
            check.description.dimmed()
        );
    }
    println!();
}
