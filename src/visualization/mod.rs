mod charts;
mod tables;

pub use charts::{format_diameter_histogram, print_diameter_histogram};
pub use tables::{
    format_composition_table, format_height_table, format_metrics_table, format_period_table,
    format_species_table, format_stand_summary, format_tree_growth_table, print_composition_table,
    print_height_table, print_metrics_table, print_period_table, print_species_table,
    print_stand_summary, print_tree_growth_table,
};
