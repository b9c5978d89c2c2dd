//! Ordered column schema of a summary table.
//!
//! The schema is fixed by declaration order alone: measures, then each
//! combination of dimensions in the order it was declared, expanded over the
//! cartesian product of the dimensions' domains (first dimension outermost),
//! one column per measure. Which codes actually occur in the data never
//! changes the layout, with one exception: a code outside a declared domain
//! is appended to that domain (see [`SummarySchema::extend_domain`]).

use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// A categorical column with its finite, ordered domain of codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSpec {
    /// Record column the code is read from.
    pub column: String,
    /// Label prefix in column names (`t` in `t50_records`).
    pub prefix: String,
    /// Declared codes, in column order.
    pub domain: Vec<i64>,
}

impl DimensionSpec {
    #[must_use]
    pub fn new(column: &str, prefix: &str, domain: &[i64]) -> Self {
        Self {
            column: column.to_string(),
            prefix: prefix.to_string(),
            domain: domain.to_vec(),
        }
    }
}

/// How a measure counts the rows falling into a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// Number of rows.
    Rows,
    /// Number of distinct entities.
    DistinctEntities,
    /// Number of entities whose lowest code of dimension `rank`, among their
    /// rows matching the cell's other dimensions, is the cell's code. Cells of
    /// combinations without `rank` count distinct entities.
    BestPerEntity { rank: usize },
}

/// A named count; the name is the column suffix (`records`, `bsls`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub suffix: String,
    pub count: Count,
}

impl Measure {
    #[must_use]
    pub fn rows(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            count: Count::Rows,
        }
    }

    #[must_use]
    pub fn distinct(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            count: Count::DistinctEntities,
        }
    }

    #[must_use]
    pub fn best_per_entity(suffix: &str, rank: usize) -> Self {
        Self {
            suffix: suffix.to_string(),
            count: Count::BestPerEntity { rank },
        }
    }

    /// Column holding the group total of this measure.
    #[must_use]
    pub fn total_column(&self) -> String {
        format!("total_{}", self.suffix)
    }
}

/// Identifies one value column: combination, code tuple, measure.
type CellKey = (usize, Vec<i64>, usize);

/// Builder for [`SummarySchema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    key_column: String,
    dimensions: Vec<DimensionSpec>,
    combinations: Vec<Vec<String>>,
    measures: Vec<Measure>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn dimension(mut self, spec: DimensionSpec) -> Self {
        self.dimensions.push(spec);
        self
    }

    #[must_use]
    pub fn measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    /// Declare a combination by dimension column names, outermost first.
    #[must_use]
    pub fn combine(mut self, columns: &[&str]) -> Self {
        self.combinations
            .push(columns.iter().map(ToString::to_string).collect());
        self
    }

    /// Resolve combinations and lay out the columns.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSchema`] if a combination names an
    /// undeclared or repeated dimension, a best-per-entity measure ranks by an
    /// undeclared dimension, or no measure is declared.
    pub fn build(self) -> Result<SummarySchema> {
        if self.measures.is_empty() {
            return Err(PipelineError::InvalidSchema(
                "at least one measure is required".into(),
            ));
        }
        for measure in &self.measures {
            if let Count::BestPerEntity { rank } = measure.count
                && rank >= self.dimensions.len()
            {
                return Err(PipelineError::InvalidSchema(format!(
                    "measure '{}' ranks by undeclared dimension #{rank}",
                    measure.suffix
                )));
            }
        }

        let mut combinations = Vec::with_capacity(self.combinations.len());
        for names in &self.combinations {
            let mut dims = Vec::with_capacity(names.len());
            for name in names {
                let position = self
                    .dimensions
                    .iter()
                    .position(|dim| &dim.column == name)
                    .ok_or_else(|| {
                        PipelineError::InvalidSchema(format!("undeclared dimension '{name}'"))
                    })?;
                if dims.contains(&position) {
                    return Err(PipelineError::InvalidSchema(format!(
                        "dimension '{name}' repeated in one combination"
                    )));
                }
                dims.push(position);
            }
            if dims.is_empty() {
                return Err(PipelineError::InvalidSchema("empty combination".into()));
            }
            combinations.push(dims);
        }

        let mut schema = SummarySchema {
            key_column: self.key_column,
            dimensions: self.dimensions,
            combinations,
            measures: self.measures,
            columns: Vec::new(),
            index: HashMap::new(),
        };
        schema.layout();
        Ok(schema)
    }
}

/// Deterministic, ordered column layout of a summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySchema {
    key_column: String,
    dimensions: Vec<DimensionSpec>,
    combinations: Vec<Vec<usize>>,
    measures: Vec<Measure>,
    columns: Vec<String>,
    index: HashMap<CellKey, usize>,
}

impl SummarySchema {
    #[must_use]
    pub fn builder(key_column: &str) -> SchemaBuilder {
        SchemaBuilder {
            key_column: key_column.to_string(),
            dimensions: Vec::new(),
            combinations: Vec::new(),
            measures: Vec::new(),
        }
    }

    #[must_use]
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    #[must_use]
    pub fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    #[must_use]
    pub fn combinations(&self) -> &[Vec<usize>] {
        &self.combinations
    }

    #[must_use]
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    /// Value columns (everything but the key), in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a measure's total column.
    #[must_use]
    pub const fn total_index(&self, measure: usize) -> usize {
        measure
    }

    /// Position of the column for `codes` of `combination` under `measure`.
    #[must_use]
    pub fn cell_index(&self, combination: usize, codes: &[i64], measure: usize) -> Option<usize> {
        self.index
            .get(&(combination, codes.to_vec(), measure))
            .copied()
    }

    /// Whether `code` belongs to the domain of dimension `dim`.
    #[must_use]
    pub fn in_domain(&self, dim: usize, code: i64) -> bool {
        self.dimensions
            .get(dim)
            .is_some_and(|spec| spec.domain.contains(&code))
    }

    /// Append `code` to the domain of dimension `dim` and re-lay the
    /// columns. Returns `false` if the code was already declared.
    pub fn extend_domain(&mut self, dim: usize, code: i64) -> bool {
        let Some(spec) = self.dimensions.get_mut(dim) else {
            return false;
        };
        if spec.domain.contains(&code) {
            return false;
        }
        spec.domain.push(code);
        self.layout();
        true
    }

    /// Column name for a code tuple of a combination under a measure.
    #[must_use]
    pub fn column_name(&self, combination: usize, codes: &[i64], measure: usize) -> String {
        let mut name = String::new();
        for (dim, code) in self.combinations[combination].iter().zip(codes) {
            if !name.is_empty() {
                name.push('_');
            }
            name.push_str(&self.dimensions[*dim].prefix);
            name.push_str(&code.to_string());
        }
        name.push('_');
        name.push_str(&self.measures[measure].suffix);
        name
    }

    fn layout(&mut self) {
        let mut columns: Vec<String> = self.measures.iter().map(Measure::total_column).collect();
        let mut index = HashMap::new();

        for (ci, combination) in self.combinations.iter().enumerate() {
            let domains: Vec<&[i64]> = combination
                .iter()
                .map(|dim| self.dimensions[*dim].domain.as_slice())
                .collect();
            for codes in cartesian(&domains) {
                for mi in 0..self.measures.len() {
                    index.insert((ci, codes.clone(), mi), columns.len());
                    columns.push(self.column_name(ci, &codes, mi));
                }
            }
        }

        self.columns = columns;
        self.index = index;
    }
}

/// Every tuple of the product of `domains`, first domain outermost.
fn cartesian(domains: &[&[i64]]) -> Vec<Vec<i64>> {
    let mut tuples: Vec<Vec<i64>> = vec![Vec::new()];
    for domain in domains {
        let mut next = Vec::with_capacity(tuples.len() * domain.len());
        for prefix in &tuples {
            for code in *domain {
                let mut tuple = prefix.clone();
                tuple.push(*code);
                next.push(tuple);
            }
        }
        tuples = next;
    }
    tuples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier_tech_schema() -> SummarySchema {
        SummarySchema::builder("geoid")
            .dimension(DimensionSpec::new("status", "s", &[0, 1]))
            .dimension(DimensionSpec::new("technology", "t", &[50, 0]))
            .measure(Measure::rows("records"))
            .measure(Measure::best_per_entity("bsls", 0))
            .combine(&["status"])
            .combine(&["technology"])
            .combine(&["technology", "status"])
            .build()
            .expect("valid schema")
    }

    #[test]
    fn columns_follow_declaration_order() {
        let schema = tier_tech_schema();
        let expected = [
            "total_records",
            "total_bsls",
            "s0_records",
            "s0_bsls",
            "s1_records",
            "s1_bsls",
            "t50_records",
            "t50_bsls",
            "t0_records",
            "t0_bsls",
            "t50_s0_records",
            "t50_s0_bsls",
            "t50_s1_records",
            "t50_s1_bsls",
            "t0_s0_records",
            "t0_s0_bsls",
            "t0_s1_records",
            "t0_s1_bsls",
        ];
        assert_eq!(schema.columns(), expected);
        assert_eq!(schema.cell_index(2, &[0, 1], 1), Some(17));
    }

    #[test]
    fn extending_a_domain_appends_columns_after_declared_codes() {
        let mut schema = tier_tech_schema();
        assert!(schema.extend_domain(1, 99));
        assert!(!schema.extend_domain(1, 99));
        let columns = schema.columns();
        let t0 = columns.iter().position(|c| c == "t0_records");
        let t99 = columns.iter().position(|c| c == "t99_records");
        assert!(t0 < t99);
        assert!(columns.contains(&"t99_s1_bsls".to_string()));
        assert_eq!(columns.len(), 2 + 2 * 2 + 3 * 2 + 3 * 2 * 2);
    }

    #[test]
    fn undeclared_dimension_is_rejected() {
        let err = SummarySchema::builder("geoid")
            .dimension(DimensionSpec::new("status", "s", &[0]))
            .measure(Measure::rows("records"))
            .combine(&["outcome_code"])
            .build()
            .expect_err("outcome_code is not declared");
        assert!(err.to_string().contains("outcome_code"));
    }

    #[test]
    fn schema_without_measures_is_rejected() {
        assert!(
            SummarySchema::builder("geoid")
                .dimension(DimensionSpec::new("status", "s", &[0]))
                .combine(&["status"])
                .build()
                .is_err()
        );
    }
}
