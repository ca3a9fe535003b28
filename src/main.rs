use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use forest_stand_simulator::{
    analysis::{species_composition, DiameterDistribution, Simulation},
    config::SimulationConfig,
    growth::predict_height,
    io::{self, CsvFormat, ExcelFormat, JsonFormat, MetricsWriter, TreeListReader},
    models::{validate_site_index, CoefficientStore, GrowthConditions, Tree, TreeRecord},
    visualization::{
        print_composition_table, print_diameter_histogram, print_height_table,
        print_metrics_table, print_period_table, print_species_table, print_stand_summary,
        print_tree_growth_table,
    },
};

/// Upper bound on the rows printed by the `height` command.
const MAX_HEIGHT_ROWS: usize = 10_000;

#[derive(Parser)]
#[command(
    name = "stand-sim",
    about = "Forest Stand Simulator - individual-tree growth and yield projection",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grow a planted or measured stand and report metrics each period
    Simulate {
        /// Species code for planting, and the default for tree records without one
        #[arg(short, long, default_value = "LP")]
        species: String,

        /// Trees per acre to plant (ignored with --input)
        #[arg(short, long, default_value = "500")]
        tpa: u32,

        /// Site index (base age 25), 20-150
        #[arg(long, default_value = "70")]
        site_index: f64,

        /// Years to simulate; must be a multiple of the time step
        #[arg(short, long, default_value = "25")]
        years: u32,

        /// Random seed for planting, imputation and mortality
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Slope as a proportion
        #[arg(long, default_value = "0")]
        slope: f64,

        /// Aspect in degrees
        #[arg(long, default_value = "0")]
        aspect: f64,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extra species coefficient files (TOML, JSON or CSV)
        #[arg(long)]
        coefficients: Vec<PathBuf>,

        /// Starting tree list (CSV, JSON, or Excel) instead of planting
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write per-period metrics (CSV, JSON, or Excel)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the final tree list (CSV, JSON, or Excel)
        #[arg(long)]
        trees_out: Option<PathBuf>,

        /// Show the final diameter distribution histogram
        #[arg(long)]
        histogram: bool,

        /// Diameter class width in inches for the histogram
        #[arg(long, default_value = "1.0")]
        class_width: f64,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Grow one open tree under fixed competition and show its trajectory
    GrowTree {
        #[arg(short, long, default_value = "LP")]
        species: String,

        /// Starting diameter (inches)
        #[arg(long)]
        dbh: f64,

        /// Starting height (feet); predicted from diameter when omitted
        #[arg(long)]
        height: Option<f64>,

        #[arg(long, default_value = "0")]
        age: u32,

        #[arg(long, default_value = "0.85")]
        crown_ratio: f64,

        #[arg(long, default_value = "70")]
        site_index: f64,

        /// Number of growth periods
        #[arg(short, long, default_value = "5")]
        periods: u32,

        /// Competition factor (0-1)
        #[arg(long, default_value = "0.2")]
        competition_factor: f64,

        /// Diameter rank percentile (0-1)
        #[arg(long, default_value = "0.5")]
        rank: f64,

        /// Relative stand density index
        #[arg(long, default_value = "2.0")]
        relsdi: f64,

        /// Stand basal area (sq ft/acre)
        #[arg(long, default_value = "100")]
        basal_area: f64,

        /// Basal area in larger trees (sq ft/acre)
        #[arg(long, default_value = "50")]
        pbal: f64,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        coefficients: Vec<PathBuf>,
    },

    /// List species coefficients, or export them to a file
    Species {
        #[arg(long)]
        coefficients: Vec<PathBuf>,

        /// Write all species to a TOML, JSON or CSV file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Print the height-diameter curve for a species
    Height {
        #[arg(short, long, default_value = "LP")]
        species: String,

        #[arg(long, default_value = "1")]
        min_dbh: f64,

        #[arg(long, default_value = "30")]
        max_dbh: f64,

        #[arg(long, default_value = "1")]
        step: f64,

        #[arg(long)]
        coefficients: Vec<PathBuf>,
    },
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn load_tree_records(path: &Path) -> Result<Vec<TreeRecord>> {
    let ext = extension(path);
    let reader: Box<dyn TreeListReader> = match ext.as_str() {
        "csv" => Box::new(CsvFormat),
        "json" => Box::new(JsonFormat::default()),
        "xlsx" | "xls" => Box::new(ExcelFormat),
        _ => anyhow::bail!("Unsupported file format: .{ext}. Use .csv, .json, or .xlsx"),
    };
    Ok(reader.read(path)?)
}

fn output_writer(path: &Path, pretty: bool) -> Result<Box<dyn MetricsWriter>> {
    let ext = extension(path);
    Ok(match ext.as_str() {
        "csv" => Box::new(CsvFormat),
        "json" => Box::new(JsonFormat { pretty }),
        "xlsx" => Box::new(ExcelFormat),
        _ => anyhow::bail!("Unsupported output format: .{ext}. Use .csv, .json, or .xlsx"),
    })
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    match path {
        Some(p) => Ok(SimulationConfig::from_file(p)?),
        None => Ok(SimulationConfig::default()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            species,
            tpa,
            site_index,
            years,
            seed,
            slope,
            aspect,
            config,
            coefficients,
            input,
            output,
            trees_out,
            histogram,
            class_width,
            pretty,
        } => {
            let config = load_config(config.as_deref())?;
            let store = io::load_coefficient_store(&coefficients)?;

            let simulation = match &input {
                Some(path) => {
                    let records = load_tree_records(path)?;
                    println!(
                        "\n{}",
                        format!("Stand Simulation: {} ({} records)", path.display(), records.len())
                            .bold()
                            .cyan()
                    );
                    Simulation::from_records(&species, site_index, &records, &store, &config, seed)?
                }
                None => {
                    println!(
                        "\n{}",
                        format!("Stand Simulation: {tpa} TPA of {species}, site index {site_index}")
                            .bold()
                            .cyan()
                    );
                    Simulation::planted(&species, tpa, site_index, &store, &config, seed)?
                }
            };

            let report = simulation.with_topography(slope, aspect).run(years)?;
            print_metrics_table(&report.metrics);
            print_period_table(&report);
            if let Some(last) = report.final_metrics() {
                print_stand_summary(last);
            }
            let composition = species_composition(&report.final_trees);
            if composition.len() > 1 {
                print_composition_table(&composition);
            }
            if histogram {
                let dist = DiameterDistribution::from_trees(&report.final_trees, class_width)?;
                print_diameter_histogram(&dist);
            }

            if let Some(path) = output {
                output_writer(&path, pretty)?.write_metrics(&report.metrics, &path)?;
                println!(
                    "\n{} Wrote metrics to {}",
                    "Success:".green().bold(),
                    path.display()
                );
            }
            if let Some(path) = trees_out {
                output_writer(&path, pretty)?.write_trees(&report.final_trees, &path)?;
                println!(
                    "{} Wrote {} trees to {}",
                    "Success:".green().bold(),
                    report.final_trees.len(),
                    path.display()
                );
            }
        }

        Commands::GrowTree {
            species,
            dbh,
            height,
            age,
            crown_ratio,
            site_index,
            periods,
            competition_factor,
            rank,
            relsdi,
            basal_area,
            pbal,
            config,
            coefficients,
        } => {
            let config = load_config(config.as_deref())?;
            let store = io::load_coefficient_store(&coefficients)?;
            validate_site_index(site_index)?;
            let coeffs = store.resolve_with_policy(&species, &config.species)?;

            let height = height.unwrap_or_else(|| predict_height(&coeffs.height_diameter, dbh));
            let mut tree = Tree::new(1, coeffs.code.as_str(), dbh, height, age, crown_ratio, 1.0);
            tree.validate()?;

            let conditions = GrowthConditions {
                site_index,
                competition_factor,
                rank,
                relsdi,
                basal_area,
                pbal,
                slope: 0.0,
                aspect: 0.0,
                time_step: config.growth.time_step,
            };

            println!(
                "\n{}",
                format!("Single Tree Growth: {} {dbh:.1}\" x {height:.1}'", coeffs.code)
                    .bold()
                    .cyan()
            );
            let mut snapshots = vec![tree.clone()];
            for _ in 0..periods {
                tree.grow(&conditions, coeffs, &config);
                snapshots.push(tree.clone());
            }
            print_tree_growth_table(&snapshots);
        }

        Commands::Species {
            coefficients,
            export,
        } => {
            let store = io::load_coefficient_store(&coefficients)?;
            print_species_table(&store);
            if let Some(path) = export {
                io::write_species_file(&store, &path)?;
                println!(
                    "\n{} Exported {} species to {}",
                    "Success:".green().bold(),
                    store.len(),
                    path.display()
                );
            }
        }

        Commands::Height {
            species,
            min_dbh,
            max_dbh,
            step,
            coefficients,
        } => {
            if !(step > 0.0 && min_dbh > 0.0 && max_dbh >= min_dbh && max_dbh.is_finite()) {
                anyhow::bail!(
                    "Invalid diameter range: need 0 < min-dbh <= max-dbh and step > 0"
                );
            }
            let intervals = ((max_dbh - min_dbh) / step).floor();
            if intervals >= MAX_HEIGHT_ROWS as f64 {
                anyhow::bail!(
                    "Diameter step too small: at most {MAX_HEIGHT_ROWS} rows, increase --step"
                );
            }
            let store: CoefficientStore = io::load_coefficient_store(&coefficients)?;
            let coeffs = store.resolve(&species)?;

            let count = intervals as usize;
            let rows: Vec<(f64, f64)> = (0..=count)
                .map(|i| {
                    let dbh = min_dbh + i as f64 * step;
                    (dbh, predict_height(&coeffs.height_diameter, dbh))
                })
                .collect();
            print_height_table(&coeffs.code, &rows);
        }
    }

    Ok(())
}
