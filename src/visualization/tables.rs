use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::analysis::{SimulationReport, SpeciesComposition, StandMetrics};
use crate::models::{CoefficientStore, Tree};

fn heading(title: &str, width: usize) -> String {
    format!("\n{}\n{}\n", title.bold().green(), "=".repeat(width))
}

fn styled_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Format the per-period stand metrics as a string.
pub fn format_metrics_table(metrics: &[StandMetrics]) -> String {
    let mut output = heading("Stand Development", 60);

    let mut table = styled_table(vec![
        "Age",
        "TPA",
        "Mean DBH",
        "QMD",
        "Mean Ht",
        "BA/ac",
        "CCF",
        "Vol (cuft/ac)",
        "Mortality",
    ]);

    for m in metrics {
        table.add_row(vec![
            Cell::new(format!("{}", m.age)),
            Cell::new(format!("{:.1}", m.tree_count)),
            Cell::new(format!("{:.2}", m.mean_dbh)),
            Cell::new(format!("{:.2}", m.qmd)),
            Cell::new(format!("{:.1}", m.mean_height)),
            Cell::new(format!("{:.1}", m.basal_area)),
            Cell::new(format!("{:.1}", m.ccf)),
            Cell::new(format!("{:.1}", m.volume_cuft)),
            Cell::new(format!("{:.1}", m.mortality)),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print the per-period stand metrics.
pub fn print_metrics_table(metrics: &[StandMetrics]) {
    print!("{}", format_metrics_table(metrics));
}

/// Format a summary of one stand state as a string.
pub fn format_stand_summary(metrics: &StandMetrics) -> String {
    let mut output = heading(&format!("Stand Summary at Age {}", metrics.age), 50);

    let mut table = styled_table(vec!["Metric", "Value", "Unit"]);
    let rows = [
        ("Trees per Acre", format!("{:.1}", metrics.tree_count), "TPA"),
        ("Tree Records", format!("{}", metrics.records), ""),
        ("Basal Area", format!("{:.1}", metrics.basal_area), "sq ft/acre"),
        ("Mean DBH", format!("{:.2}", metrics.mean_dbh), "inches"),
        ("QMD", format!("{:.2}", metrics.qmd), "inches"),
        ("Mean Height", format!("{:.1}", metrics.mean_height), "feet"),
        ("Volume (cubic ft)", format!("{:.1}", metrics.volume_cuft), "cu ft/acre"),
        (
            "CCF",
            format!("{:.1} ({})", metrics.ccf, metrics.crown_closure()),
            "",
        ),
    ];
    for (name, value, unit) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value), Cell::new(unit)]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print a summary of one stand state.
pub fn print_stand_summary(metrics: &StandMetrics) {
    print!("{}", format_stand_summary(metrics));
}

/// Format per-period mortality and model diagnostics as a string.
pub fn format_period_table(report: &SimulationReport) -> String {
    let mut output = heading("Period Summary", 60);
    output.push_str(&format!(
        "{}\n",
        format!(
            "Seed: {} | Crown ratio fallbacks: {}",
            report.seed,
            report.total_crown_ratio_fallbacks()
        )
        .dimmed()
    ));

    let mut table = styled_table(vec![
        "End Age",
        "Mortality Rate",
        "Records Removed",
        "TPA Removed",
        "Mean CF",
        "CR Fallbacks",
    ]);
    for p in &report.periods {
        table.add_row(vec![
            Cell::new(format!("{}", p.age)),
            Cell::new(format!("{:.3}", p.mortality.rate)),
            Cell::new(format!("{}", p.mortality.removed_records)),
            Cell::new(format!("{:.1}", p.mortality.removed_weight)),
            Cell::new(format!("{:.3}", p.mean_competition_factor)),
            Cell::new(format!("{}", p.crown_ratio_fallbacks)),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

pub fn print_period_table(report: &SimulationReport) {
    print!("{}", format_period_table(report));
}

/// Format species composition as a string.
pub fn format_composition_table(composition: &[SpeciesComposition]) -> String {
    let mut output = heading("Species Composition", 50);

    let mut table = styled_table(vec![
        "Code", "TPA", "% TPA", "BA/ac", "% BA", "Mean DBH", "Mean Ht",
    ]);
    for sp in composition {
        table.add_row(vec![
            Cell::new(&sp.species),
            Cell::new(format!("{:.1}", sp.tpa)),
            Cell::new(format!("{:.1}%", sp.percent_tpa)),
            Cell::new(format!("{:.1}", sp.basal_area)),
            Cell::new(format!("{:.1}%", sp.percent_basal_area)),
            Cell::new(format!("{:.1}\"", sp.mean_dbh)),
            Cell::new(format!("{:.1}", sp.mean_height)),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

pub fn print_composition_table(composition: &[SpeciesComposition]) {
    print!("{}", format_composition_table(composition));
}

/// Format the species available in a coefficient store as a string.
pub fn format_species_table(store: &CoefficientStore) -> String {
    let mut output = heading("Species Coefficients", 50);

    let mut table = styled_table(vec![
        "Code",
        "Common Name",
        "CR Equation",
        "HD p2",
        "SI Curve c1",
        "Growth Bounds",
    ]);
    for sp in store.iter() {
        let bounds = match sp.diameter_limits {
            Some(l) => format!("{:.1}-{:.1}\"", l.lower, l.upper),
            None => "none".to_string(),
        };
        table.add_row(vec![
            Cell::new(&sp.code),
            Cell::new(&sp.common_name),
            Cell::new(sp.crown_ratio.equation.code()),
            Cell::new(format!("{:.3}", sp.height_diameter.p2)),
            Cell::new(format!("{:.4}", sp.small_tree.c1)),
            Cell::new(bounds),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print the species available in a coefficient store.
pub fn print_species_table(store: &CoefficientStore) {
    print!("{}", format_species_table(store));
}

/// Format a single tree's trajectory (one snapshot per period) as a string.
pub fn format_tree_growth_table(snapshots: &[Tree]) -> String {
    let mut output = heading("Tree Growth", 60);

    let mut table = styled_table(vec!["Age", "DBH (in)", "Height (ft)", "Crown Ratio", "BA (sq ft)"]);
    for tree in snapshots {
        table.add_row(vec![
            Cell::new(format!("{}", tree.age)),
            Cell::new(format!("{:.2}", tree.dbh)),
            Cell::new(format!("{:.1}", tree.height)),
            Cell::new(format!("{:.3}", tree.crown_ratio)),
            Cell::new(format!("{:.4}", tree.basal_area_sqft())),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

pub fn print_tree_growth_table(snapshots: &[Tree]) {
    print!("{}", format_tree_growth_table(snapshots));
}

/// Format a height-diameter table of `(dbh, height)` pairs as a string.
pub fn format_height_table(species: &str, rows: &[(f64, f64)]) -> String {
    let mut output = heading(&format!("Height-Diameter Curve ({species})"), 50);

    let mut table = styled_table(vec!["DBH (in)", "Height (ft)"]);
    for (dbh, height) in rows {
        table.add_row(vec![
            Cell::new(format!("{dbh:.1}")),
            Cell::new(format!("{height:.1}")),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

pub fn print_height_table(species: &str, rows: &[(f64, f64)]) {
    print!("{}", format_height_table(species, rows));
}
