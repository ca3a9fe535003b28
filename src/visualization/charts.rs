use colored::Colorize;

use crate::analysis::{DiameterClass, DiameterDistribution};

const BAR_WIDTH: f64 = 40.0;

fn class_label(class: &DiameterClass, precision: usize) -> String {
    format!("{:.p$}-{:.p$}\"", class.lower, class.upper, p = precision)
}

/// Format a text-based histogram of stems per acre by diameter class.
pub fn format_diameter_histogram(dist: &DiameterDistribution) -> String {
    // Whole-inch classes print without decimals.
    let precision = if dist.class_width.fract() == 0.0 { 0 } else { 1 };
    let title = format!(
        "Diameter Distribution ({:.p$}\" classes)",
        dist.class_width,
        p = precision
    );
    let mut output = format!("\n{}\n{}\n", title.bold().green(), "=".repeat(60));

    let total_tpa = dist.total_tpa();
    if dist.classes.is_empty() || total_tpa <= 0.0 {
        output.push_str("  No trees to plot.\n");
        return output;
    }

    let peak = dist.classes.iter().map(|c| c.tpa).fold(0.0f64, f64::max);
    output.push_str(&format!(
        "  {:>11}  {:>8}  {:>6}  {:>8}\n",
        "DBH Class", "TPA", "% TPA", "BA/ac"
    ));
    output.push_str(&format!("  {}\n", "-".repeat(78)));

    for class in &dist.classes {
        let bar = "\u{2588}".repeat((class.tpa / peak * BAR_WIDTH).round() as usize);
        output.push_str(&format!(
            "  {:>11}  {:>8.1}  {:>5.1}%  {:>8.1}  {}\n",
            class_label(class, precision),
            class.tpa,
            100.0 * class.tpa / total_tpa,
            class.basal_area,
            bar.green()
        ));
    }

    let basal_area: f64 = dist.classes.iter().map(|c| c.basal_area).sum();
    let records: usize = dist.classes.iter().map(|c| c.tree_count).sum();
    output.push_str(&format!("  {}\n", "-".repeat(78)));
    output.push_str(&format!(
        "  {:>11}  {:>8.1}  {:>6}  {:>8.1}  {}\n\n",
        "Total",
        total_tpa,
        "",
        basal_area,
        format!("{records} records").dimmed()
    ));
    output
}

/// Print a text-based histogram of stems per acre by diameter class.
pub fn print_diameter_histogram(dist: &DiameterDistribution) {
    print!("{}", format_diameter_histogram(dist));
}
