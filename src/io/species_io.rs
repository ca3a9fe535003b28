//! Species coefficient files.
//!
//! Each species is one flat row of optional fields so the same record shape
//! works for TOML (`[[species]]` tables), JSON and CSV. Converting a row
//! into [`SpeciesCoefficients`] fails with `CoefficientMissing` naming the
//! first absent required field.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::models::{
    AverageCrownRatioEquation, BarkRatioCoefficients, CoefficientStore, CrownRatioCoefficients,
    CrownWidthCoefficients, DiameterGrowthCoefficients, DiameterGrowthLimits, HeightDiameterCoefficients,
    SmallTreeGrowthCoefficients, SpeciesCoefficients,
};

const DEFAULT_BREAKPOINT: f64 = 3.0;

/// One species as stored in a coefficient file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeciesCoefficientRow {
    pub code: String,
    pub common_name: Option<String>,

    pub hd_p2: Option<f64>,
    pub hd_p3: Option<f64>,
    pub hd_p4: Option<f64>,
    pub hd_dbw: Option<f64>,
    pub hd_breakpoint: Option<f64>,

    pub st_c1: Option<f64>,
    pub st_c2: Option<f64>,
    pub st_c3: Option<f64>,
    pub st_c4: Option<f64>,
    pub st_c5: Option<f64>,

    pub dg_b1: Option<f64>,
    pub dg_b2: Option<f64>,
    pub dg_b3: Option<f64>,
    pub dg_b4: Option<f64>,
    pub dg_b5: Option<f64>,
    pub dg_b6: Option<f64>,
    pub dg_b7: Option<f64>,
    pub dg_b8: Option<f64>,
    pub dg_b9: Option<f64>,
    pub dg_b10: Option<f64>,
    pub dg_b11: Option<f64>,
    pub dg_forest_type: Option<f64>,
    pub dg_ecological_unit: Option<f64>,
    pub dg_planting: Option<f64>,
    pub dg_lower: Option<f64>,
    pub dg_upper: Option<f64>,

    pub cr_equation: Option<String>,
    pub cr_d0: Option<f64>,
    pub cr_d1: Option<f64>,
    pub cr_d2: Option<f64>,
    pub cr_a: Option<f64>,
    pub cr_b0: Option<f64>,
    pub cr_b1: Option<f64>,
    pub cr_c: Option<f64>,

    pub cw_a1: Option<f64>,
    pub cw_a2: Option<f64>,
    pub cw_a3: Option<f64>,
    pub cw_a4: Option<f64>,
    pub cw_max_width: Option<f64>,
    pub cw_o1: Option<f64>,
    pub cw_o2: Option<f64>,
    pub cw_o3: Option<f64>,

    pub bark_b1: Option<f64>,
    pub bark_b2: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct SpeciesFile {
    species: Vec<SpeciesCoefficientRow>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonSpeciesFile {
    Bare(Vec<SpeciesCoefficientRow>),
    Wrapped { species: Vec<SpeciesCoefficientRow> },
}

impl SpeciesCoefficientRow {
    /// Convert to a full coefficient record.
    pub fn into_coefficients(self) -> Result<SpeciesCoefficients, SimError> {
        let code = self.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(SimError::ValidationError(
                "Species coefficient row has an empty code".to_string(),
            ));
        }
        let need = |value: Option<f64>, field: &str| value.ok_or_else(|| missing(&code, field));

        let height_diameter = HeightDiameterCoefficients {
            p2: need(self.hd_p2, "hd_p2")?,
            p3: need(self.hd_p3, "hd_p3")?,
            p4: need(self.hd_p4, "hd_p4")?,
            dbw: need(self.hd_dbw, "hd_dbw")?,
            breakpoint: self.hd_breakpoint.unwrap_or(DEFAULT_BREAKPOINT),
        };

        let small_tree = SmallTreeGrowthCoefficients {
            c1: need(self.st_c1, "st_c1")?,
            c2: need(self.st_c2, "st_c2")?,
            c3: need(self.st_c3, "st_c3")?,
            c4: need(self.st_c4, "st_c4")?,
            c5: need(self.st_c5, "st_c5")?,
        };

        let diameter_growth = DiameterGrowthCoefficients {
            b1: need(self.dg_b1, "dg_b1")?,
            b2: need(self.dg_b2, "dg_b2")?,
            b3: need(self.dg_b3, "dg_b3")?,
            b4: need(self.dg_b4, "dg_b4")?,
            b5: need(self.dg_b5, "dg_b5")?,
            b6: need(self.dg_b6, "dg_b6")?,
            b7: need(self.dg_b7, "dg_b7")?,
            b8: need(self.dg_b8, "dg_b8")?,
            b9: need(self.dg_b9, "dg_b9")?,
            b10: need(self.dg_b10, "dg_b10")?,
            b11: need(self.dg_b11, "dg_b11")?,
            forest_type: self.dg_forest_type.unwrap_or(0.0),
            ecological_unit: self.dg_ecological_unit.unwrap_or(0.0),
            planting: self.dg_planting.unwrap_or(0.0),
        };

        let diameter_limits = match (self.dg_lower, self.dg_upper) {
            (None, None) => None,
            (Some(lower), Some(upper)) => Some(DiameterGrowthLimits { lower, upper }),
            (Some(_), None) => return Err(missing(&code, "dg_upper")),
            (None, Some(_)) => return Err(missing(&code, "dg_lower")),
        };

        let equation: AverageCrownRatioEquation = self
            .cr_equation
            .as_deref()
            .ok_or_else(|| missing(&code, "cr_equation"))?
            .parse()?;
        let d_value = |field: &str, value: Option<f64>| -> Result<f64, SimError> {
            if equation.required_coefficients().contains(&field) {
                need(value, field)
            } else {
                Ok(value.unwrap_or(0.0))
            }
        };
        let crown_ratio = CrownRatioCoefficients {
            equation,
            d0: d_value("cr_d0", self.cr_d0)?,
            d1: d_value("cr_d1", self.cr_d1)?,
            d2: d_value("cr_d2", self.cr_d2)?,
            a: need(self.cr_a, "cr_a")?,
            b0: need(self.cr_b0, "cr_b0")?,
            b1: need(self.cr_b1, "cr_b1")?,
            c: need(self.cr_c, "cr_c")?,
        };

        let crown_width = CrownWidthCoefficients {
            a1: need(self.cw_a1, "cw_a1")?,
            a2: need(self.cw_a2, "cw_a2")?,
            a3: self.cw_a3.unwrap_or(0.0),
            a4: need(self.cw_a4, "cw_a4")?,
            max_width: self.cw_max_width,
            o1: need(self.cw_o1, "cw_o1")?,
            o2: need(self.cw_o2, "cw_o2")?,
            o3: self.cw_o3.unwrap_or(0.0),
        };

        let bark = match (self.bark_b1, self.bark_b2) {
            (None, None) => BarkRatioCoefficients::default(),
            (Some(b1), Some(b2)) => BarkRatioCoefficients { b1, b2 },
            (Some(_), None) => return Err(missing(&code, "bark_b2")),
            (None, Some(_)) => return Err(missing(&code, "bark_b1")),
        };

        let record = SpeciesCoefficients {
            common_name: self.common_name.unwrap_or_else(|| code.clone()),
            code,
            height_diameter,
            small_tree,
            diameter_growth,
            crown_ratio,
            crown_width,
            bark,
            diameter_limits,
        };
        record.validate()?;
        Ok(record)
    }
}

fn missing(species: &str, field: &str) -> SimError {
    SimError::CoefficientMissing {
        species: species.to_string(),
        field: field.to_string(),
    }
}

impl From<&SpeciesCoefficients> for SpeciesCoefficientRow {
    fn from(s: &SpeciesCoefficients) -> Self {
        let hd = &s.height_diameter;
        let st = &s.small_tree;
        let dg = &s.diameter_growth;
        let cr = &s.crown_ratio;
        let cw = &s.crown_width;
        Self {
            code: s.code.clone(),
            common_name: Some(s.common_name.clone()),
            hd_p2: Some(hd.p2),
            hd_p3: Some(hd.p3),
            hd_p4: Some(hd.p4),
            hd_dbw: Some(hd.dbw),
            hd_breakpoint: Some(hd.breakpoint),
            st_c1: Some(st.c1),
            st_c2: Some(st.c2),
            st_c3: Some(st.c3),
            st_c4: Some(st.c4),
            st_c5: Some(st.c5),
            dg_b1: Some(dg.b1),
            dg_b2: Some(dg.b2),
            dg_b3: Some(dg.b3),
            dg_b4: Some(dg.b4),
            dg_b5: Some(dg.b5),
            dg_b6: Some(dg.b6),
            dg_b7: Some(dg.b7),
            dg_b8: Some(dg.b8),
            dg_b9: Some(dg.b9),
            dg_b10: Some(dg.b10),
            dg_b11: Some(dg.b11),
            dg_forest_type: Some(dg.forest_type),
            dg_ecological_unit: Some(dg.ecological_unit),
            dg_planting: Some(dg.planting),
            dg_lower: s.diameter_limits.map(|l| l.lower),
            dg_upper: s.diameter_limits.map(|l| l.upper),
            cr_equation: Some(cr.equation.code().to_string()),
            cr_d0: Some(cr.d0),
            cr_d1: Some(cr.d1),
            cr_d2: Some(cr.d2),
            cr_a: Some(cr.a),
            cr_b0: Some(cr.b0),
            cr_b1: Some(cr.b1),
            cr_c: Some(cr.c),
            cw_a1: Some(cw.a1),
            cw_a2: Some(cw.a2),
            cw_a3: Some(cw.a3),
            cw_a4: Some(cw.a4),
            cw_max_width: cw.max_width,
            cw_o1: Some(cw.o1),
            cw_o2: Some(cw.o2),
            cw_o3: Some(cw.o3),
            bark_b1: Some(s.bark.b1),
            bark_b2: Some(s.bark.b2),
        }
    }
}

fn convert(rows: Vec<SpeciesCoefficientRow>) -> Result<Vec<SpeciesCoefficients>, SimError> {
    rows.into_iter()
        .map(SpeciesCoefficientRow::into_coefficients)
        .collect()
}

/// Parse species records from TOML text with one `[[species]]` table each.
pub fn parse_species_toml(content: &str) -> Result<Vec<SpeciesCoefficients>, SimError> {
    let file: SpeciesFile = toml::from_str(content)?;
    convert(file.species)
}

/// Parse species records from a JSON array or `{ "species": [...] }`.
pub fn parse_species_json(content: &str) -> Result<Vec<SpeciesCoefficients>, SimError> {
    let rows = match serde_json::from_str(content)? {
        JsonSpeciesFile::Bare(rows) | JsonSpeciesFile::Wrapped { species: rows } => rows,
    };
    convert(rows)
}

/// Parse species records from CSV, one species per row.
pub fn parse_species_csv(data: &[u8]) -> Result<Vec<SpeciesCoefficients>, SimError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    convert(rows)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Read species records from a `.toml`, `.json` or `.csv` file.
pub fn read_species_file(path: impl AsRef<Path>) -> Result<Vec<SpeciesCoefficients>, SimError> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "toml" => parse_species_toml(&std::fs::read_to_string(path)?),
        "json" => parse_species_json(&std::fs::read_to_string(path)?),
        "csv" => parse_species_csv(&std::fs::read(path)?),
        other => Err(SimError::ParseError(format!(
            "Unsupported species file extension '{other}' for {}",
            path.display()
        ))),
    }
}

/// The built-in species plus every record in `paths`, later files winning.
pub fn load_coefficient_store<P: AsRef<Path>>(paths: &[P]) -> Result<CoefficientStore, SimError> {
    let mut store = CoefficientStore::builtin();
    for path in paths {
        let records = read_species_file(path)?;
        tracing::info!(
            path = %path.as_ref().display(),
            species = records.len(),
            "loaded species coefficients"
        );
        store.extend(records);
    }
    Ok(store)
}

/// Write every species in the store to a `.toml`, `.json` or `.csv` file.
pub fn write_species_file(store: &CoefficientStore, path: impl AsRef<Path>) -> Result<(), SimError> {
    let path = path.as_ref();
    let rows: Vec<SpeciesCoefficientRow> = store.iter().map(SpeciesCoefficientRow::from).collect();
    match extension(path).as_str() {
        "toml" => {
            let content = toml::to_string_pretty(&SpeciesFile { species: rows })?;
            std::fs::write(path, content)?;
        }
        "json" => {
            std::fs::write(path, serde_json::to_string_pretty(&rows)?)?;
        }
        "csv" => {
            let mut wtr = csv::Writer::from_path(path)?;
            for row in &rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        other => {
            return Err(SimError::ParseError(format!(
                "Unsupported species file extension '{other}' for {}",
                path.display()
            )))
        }
    }
    Ok(())
}
