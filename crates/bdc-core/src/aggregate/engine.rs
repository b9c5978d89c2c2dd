//! Single-pass group-by counting into schema-complete tables.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::warn;

use super::schema::{Count, SummarySchema};
use super::table::SummaryTable;

/// A record the engine can group and count.
pub trait Row {
    /// Identifier of the entity the row describes (a location).
    fn entity(&self) -> &str;
    /// Text value of an identifier column, used as a group key.
    fn text(&self, column: &str) -> Option<&str>;
    /// Categorical code of a dimension column.
    fn code(&self, column: &str) -> Option<i64>;
}

/// What rows are grouped by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// The value of a text column. Rows with an empty or absent value are
    /// left out of every group.
    Column(String),
    /// A single group holding every row, e.g. the nation.
    Constant(String),
}

impl GroupKey {
    #[must_use]
    pub fn column(name: &str) -> Self {
        Self::Column(name.to_string())
    }

    #[must_use]
    pub fn constant(key: &str) -> Self {
        Self::Constant(key.to_string())
    }

    fn of<'a, R: Row>(&'a self, row: &'a R) -> Option<&'a str> {
        match self {
            Self::Column(column) => row.text(column).filter(|value| !value.is_empty()),
            Self::Constant(key) => Some(key),
        }
    }
}

type Cell = (usize, Vec<i64>);

/// Lowest rank code per (measure, combination, other codes, entity).
type BestKey<'r> = (usize, usize, Vec<i64>, &'r str);

#[derive(Default)]
struct GroupCounts<'r> {
    rows: u64,
    entities: HashSet<&'r str>,
    cell_rows: HashMap<Cell, u64>,
    cell_entities: HashMap<Cell, HashSet<&'r str>>,
    best: HashMap<BestKey<'r>, i64>,
}

/// Which accumulators the schema's measures need.
struct Needs {
    entities: bool,
    cell_rows: bool,
    cell_entities: bool,
    best: Vec<(usize, usize)>,
}

impl Needs {
    fn of(schema: &SummarySchema) -> Self {
        let mut needs = Self {
            entities: false,
            cell_rows: false,
            cell_entities: false,
            best: Vec::new(),
        };
        for (mi, measure) in schema.measures().iter().enumerate() {
            match measure.count {
                Count::Rows => needs.cell_rows = true,
                Count::DistinctEntities => {
                    needs.entities = true;
                    needs.cell_entities = true;
                }
                Count::BestPerEntity { rank } => {
                    needs.entities = true;
                    needs.best.push((mi, rank));
                    let rank_free = schema
                        .combinations()
                        .iter()
                        .any(|combination| !combination.contains(&rank));
                    needs.cell_entities |= rank_free;
                }
            }
        }
        needs
    }
}

/// Group `rows` by `key` and count them under every column of `schema`.
///
/// Every group gets every column; cells nobody fell into are zero. Codes
/// outside a declared domain are appended to `schema` (and logged) before
/// the table is laid out, so the caller's schema carries the extension into
/// later batches.
pub fn aggregate<'r, R, I>(schema: &mut SummarySchema, key: &GroupKey, rows: I) -> SummaryTable
where
    R: Row + 'r,
    I: IntoIterator<Item = &'r R>,
{
    let needs = Needs::of(schema);
    let dim_columns: Vec<String> = schema
        .dimensions()
        .iter()
        .map(|dim| dim.column.clone())
        .collect();
    let combinations = schema.combinations().to_vec();

    let mut groups: BTreeMap<String, GroupCounts<'r>> = BTreeMap::new();
    let mut unseen: Vec<BTreeSet<i64>> = vec![BTreeSet::new(); dim_columns.len()];

    for row in rows {
        let Some(group_key) = key.of(row) else {
            continue;
        };
        if !groups.contains_key(group_key) {
            groups.insert(group_key.to_string(), GroupCounts::default());
        }
        let Some(group) = groups.get_mut(group_key) else {
            continue;
        };

        let entity = row.entity();
        group.rows += 1;
        if needs.entities {
            group.entities.insert(entity);
        }

        let codes: Vec<Option<i64>> = dim_columns.iter().map(|c| row.code(c)).collect();
        for (dim, code) in codes.iter().enumerate() {
            if let Some(code) = code
                && !schema.in_domain(dim, *code)
            {
                unseen[dim].insert(*code);
            }
        }

        for (ci, combination) in combinations.iter().enumerate() {
            let Some(tuple) = combination
                .iter()
                .map(|dim| codes[*dim])
                .collect::<Option<Vec<i64>>>()
            else {
                continue;
            };

            for &(mi, rank) in &needs.best {
                if let Some(position) = combination.iter().position(|dim| *dim == rank) {
                    let mut others = tuple.clone();
                    let rank_code = others.remove(position);
                    group
                        .best
                        .entry((mi, ci, others, entity))
                        .and_modify(|best| *best = (*best).min(rank_code))
                        .or_insert(rank_code);
                }
            }
            if needs.cell_entities {
                group
                    .cell_entities
                    .entry((ci, tuple.clone()))
                    .or_default()
                    .insert(entity);
            }
            if needs.cell_rows {
                *group.cell_rows.entry((ci, tuple)).or_insert(0) += 1;
            }
        }
    }

    for (dim, codes) in unseen.into_iter().enumerate() {
        for code in codes {
            if schema.extend_domain(dim, code) {
                warn!(
                    column = %dim_columns[dim],
                    code,
                    "code outside declared domain; adding summary columns"
                );
            }
        }
    }

    lay_out(schema, &combinations, groups)
}

fn lay_out(
    schema: &SummarySchema,
    combinations: &[Vec<usize>],
    groups: BTreeMap<String, GroupCounts<'_>>,
) -> SummaryTable {
    let measures = schema.measures();
    let mut table = SummaryTable::new(schema.key_column(), schema.columns().to_vec());

    for (group_key, counts) in groups {
        let row = table.row_mut(&group_key);

        for (mi, measure) in measures.iter().enumerate() {
            row[schema.total_index(mi)] = match measure.count {
                Count::Rows => counts.rows,
                Count::DistinctEntities | Count::BestPerEntity { .. } => counts.entities.len() as u64,
            };
        }

        for ((ci, tuple), n) in &counts.cell_rows {
            for (mi, measure) in measures.iter().enumerate() {
                if measure.count == Count::Rows
                    && let Some(index) = schema.cell_index(*ci, tuple, mi)
                {
                    row[index] = *n;
                }
            }
        }

        for ((ci, tuple), entities) in &counts.cell_entities {
            for (mi, measure) in measures.iter().enumerate() {
                let counts_entities = match measure.count {
                    Count::DistinctEntities => true,
                    Count::BestPerEntity { rank } => !combinations[*ci].contains(&rank),
                    Count::Rows => false,
                };
                if counts_entities && let Some(index) = schema.cell_index(*ci, tuple, mi) {
                    row[index] = entities.len() as u64;
                }
            }
        }

        for ((mi, ci, others, _entity), rank_code) in &counts.best {
            let Count::BestPerEntity { rank } = measures[*mi].count else {
                continue;
            };
            let Some(position) = combinations[*ci].iter().position(|dim| *dim == rank) else {
                continue;
            };
            let mut tuple = others.clone();
            tuple.insert(position, *rank_code);
            if let Some(index) = schema.cell_index(*ci, &tuple, *mi) {
                row[index] += 1;
            }
        }
    }

    table
}
