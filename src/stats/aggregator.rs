//! Aggregator Module
//! Grouping, counting and averaging over a cleaned dataset.
//!
//! Every operation is a pure function of the dataset. Counts are exact and
//! descending sorts are stable, so ties keep the order in which keys were
//! first encountered.

use super::summary::{SummaryRow, SummaryTable, SummaryValue, AVERAGE_RANGE_LABEL, COUNT_LABEL};
use crate::data::{Dataset, Field, GroupKey, VehicleRecord};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How records are grouped for averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Single(Field),
    Pair(Field, Field),
}

impl Grouping {
    fn key_of(self, record: &VehicleRecord) -> GroupKey {
        match self {
            Grouping::Single(field) => field.key_of(record),
            Grouping::Pair(outer, inner) => GroupKey::Pair(
                outer.text_of(record).into_owned(),
                inner.text_of(record).into_owned(),
            ),
        }
    }

    fn labels(self) -> Vec<&'static str> {
        match self {
            Grouping::Single(field) => vec![field.column_name()],
            Grouping::Pair(outer, inner) => vec![outer.column_name(), inner.column_name()],
        }
    }
}

/// Row order of an average table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AverageOrder {
    /// Highest mean first, optionally truncated ("top-N" view).
    DescendingByMean { limit: Option<usize> },
    /// Ascending by group key ("trend" view).
    AscendingByKey,
}

/// Accumulates per-key tallies, remembering first-encounter order.
struct Tally<V> {
    index: HashMap<GroupKey, usize>,
    entries: Vec<(GroupKey, V)>,
}

impl<V: Default> Tally<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: GroupKey) -> &mut V {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(key.clone(), slot);
                self.entries.push((key, V::default()));
                slot
            }
        };
        &mut self.entries[slot].1
    }

    fn into_entries(self) -> Vec<(GroupKey, V)> {
        self.entries
    }
}

fn count_by<F>(dataset: &Dataset, key_of: F) -> Vec<(GroupKey, u64)>
where
    F: Fn(&VehicleRecord) -> GroupKey,
{
    let mut tally = Tally::new();
    for record in dataset.iter() {
        *tally.entry(key_of(record)) += 1;
    }
    tally.into_entries()
}

fn top_counts(mut counts: Vec<(GroupKey, u64)>, limit: usize) -> Vec<SummaryRow> {
    // sort_by is stable: equal counts stay in encounter order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(key, count)| SummaryRow {
            key,
            value: SummaryValue::Count(count),
        })
        .collect()
}

/// Registrations per model year, ascending by year.
pub fn count_by_year(dataset: &Dataset) -> SummaryTable {
    let mut by_year: BTreeMap<i64, u64> = BTreeMap::new();
    for record in dataset.iter() {
        *by_year.entry(record.model_year).or_default() += 1;
    }

    let rows = by_year
        .into_iter()
        .map(|(year, count)| SummaryRow {
            key: GroupKey::Year(year),
            value: SummaryValue::Count(count),
        })
        .collect();

    SummaryTable::new(&[Field::ModelYear.column_name()], COUNT_LABEL, rows)
}

/// The `limit` most frequent values of `field`, highest count first.
pub fn top_entities(dataset: &Dataset, field: Field, limit: usize) -> SummaryTable {
    let counts = count_by(dataset, |record| field.key_of(record));
    SummaryTable::new(&[field.column_name()], COUNT_LABEL, top_counts(counts, limit))
}

/// Keys of the `limit` most frequent values of `field`.
fn top_keys(dataset: &Dataset, field: Field, limit: usize) -> HashSet<GroupKey> {
    top_entities(dataset, field, limit)
        .rows
        .into_iter()
        .map(|row| row.key)
        .collect()
}

/// Records whose `field` value is among that field's `limit` most frequent
/// values.
pub fn restrict_to_top(dataset: &Dataset, field: Field, limit: usize) -> Dataset {
    let keep = top_keys(dataset, field, limit);
    dataset.filter(|record| keep.contains(&field.key_of(record)))
}

/// Most frequent `(outer, inner)` pairs, counted only among records whose
/// `outer` value is one of the `outer_limit` most frequent.
///
/// The dataset is narrowed to the top outer groups before regrouping, so an
/// inner value from an excluded outer group never appears, however large
/// its own count.
pub fn top_pairs_within_top_groups(
    dataset: &Dataset,
    outer: Field,
    inner: Field,
    outer_limit: usize,
    inner_limit: usize,
) -> SummaryTable {
    let restricted = restrict_to_top(dataset, outer, outer_limit);
    let grouping = Grouping::Pair(outer, inner);
    let counts = count_by(&restricted, |record| grouping.key_of(record));
    SummaryTable::new(
        &grouping.labels(),
        COUNT_LABEL,
        top_counts(counts, inner_limit),
    )
}

/// Top cities by registrations inside the top counties.
pub fn top_cities_in_top_counties(
    dataset: &Dataset,
    county_limit: usize,
    city_limit: usize,
) -> SummaryTable {
    top_pairs_within_top_groups(dataset, Field::County, Field::City, county_limit, city_limit)
}

/// Top models by registrations inside the top makes.
pub fn top_models_of_top_makes(
    dataset: &Dataset,
    make_limit: usize,
    model_limit: usize,
) -> SummaryTable {
    top_pairs_within_top_groups(dataset, Field::Make, Field::Model, make_limit, model_limit)
}

/// Mean electric range per group.
///
/// Groups only exist when they have records; nothing is zero-filled.
pub fn average_range_by(
    dataset: &Dataset,
    grouping: Grouping,
    order: AverageOrder,
) -> SummaryTable {
    let mut tally: Tally<(f64, u64)> = Tally::new();
    for record in dataset.iter() {
        let (sum, count) = tally.entry(grouping.key_of(record));
        *sum += record.electric_range;
        *count += 1;
    }

    let mut means: Vec<(GroupKey, f64)> = tally
        .into_entries()
        .into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect();

    match order {
        AverageOrder::DescendingByMean { limit } => {
            means.sort_by(|a, b| b.1.total_cmp(&a.1));
            if let Some(limit) = limit {
                means.truncate(limit);
            }
        }
        AverageOrder::AscendingByKey => means.sort_by(|a, b| a.0.cmp(&b.0)),
    }

    let rows = means
        .into_iter()
        .map(|(key, mean)| SummaryRow {
            key,
            value: SummaryValue::Mean(mean),
        })
        .collect();

    SummaryTable::new(&grouping.labels(), AVERAGE_RANGE_LABEL, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::tests::record;

    fn name(s: &str) -> GroupKey {
        GroupKey::Name(s.to_string())
    }

    fn pair(a: &str, b: &str) -> GroupKey {
        GroupKey::Pair(a.to_string(), b.to_string())
    }

    fn counts(table: &SummaryTable) -> Vec<u64> {
        table.rows.iter().filter_map(|r| r.value.as_count()).collect()
    }

    /// King: 5 records, Snohomish: 4, Pierce: 3, Spokane: 6 concentrated in one city.
    fn regional() -> Dataset {
        let mut records = Vec::new();
        for _ in 0..3 {
            records.push(record(2020, "King", "Seattle", "TESLA", "MODEL 3", 220.0));
        }
        for _ in 0..2 {
            records.push(record(2021, "King", "Redmond", "TESLA", "MODEL Y", 0.0));
        }
        for _ in 0..4 {
            records.push(record(2019, "Snohomish", "Everett", "NISSAN", "LEAF", 150.0));
        }
        for _ in 0..3 {
            records.push(record(2018, "Pierce", "Tacoma", "CHEVROLET", "BOLT EV", 238.0));
        }
        for _ in 0..6 {
            records.push(record(2022, "Spokane", "Spokane", "KIA", "EV6", 0.0));
        }
        Dataset::new(records)
    }

    #[test]
    fn count_by_year_is_ascending_and_sums_to_row_count() {
        let dataset = Dataset::new(
            [2015, 2015, 2016, 2018, 2018]
                .into_iter()
                .map(|year| record(year, "King", "Seattle", "TESLA", "MODEL S", 208.0))
                .collect(),
        );

        let table = count_by_year(&dataset);

        assert_eq!(
            table.rows,
            vec![
                SummaryRow { key: GroupKey::Year(2015), value: SummaryValue::Count(2) },
                SummaryRow { key: GroupKey::Year(2016), value: SummaryValue::Count(1) },
                SummaryRow { key: GroupKey::Year(2018), value: SummaryValue::Count(2) },
            ]
        );
        assert_eq!(table.total_count(), dataset.len() as u64);
        assert_eq!(table.key_labels, vec!["Model Year"]);
    }

    #[test]
    fn count_by_year_on_empty_dataset_is_empty() {
        assert!(count_by_year(&Dataset::default()).is_empty());
    }

    #[test]
    fn top_entities_limits_and_orders() {
        let dataset = regional();
        let table = top_entities(&dataset, Field::County, 3);

        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].key, name("Spokane"));
        assert_eq!(counts(&table), vec![6, 5, 4]);
        assert!(counts(&table).windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn top_entities_breaks_ties_by_encounter_order() {
        let dataset = Dataset::new(vec![
            record(2020, "King", "Seattle", "KIA", "NIRO", 239.0),
            record(2020, "King", "Seattle", "AUDI", "E-TRON", 222.0),
            record(2020, "King", "Seattle", "AUDI", "E-TRON", 222.0),
            record(2020, "King", "Seattle", "KIA", "NIRO", 239.0),
            record(2020, "King", "Seattle", "BMW", "I3", 153.0),
        ]);

        let table = top_entities(&dataset, Field::Make, 10);
        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec![name("KIA"), name("AUDI"), name("BMW")]);
    }

    #[test]
    fn top_entities_with_zero_limit_is_empty() {
        assert!(top_entities(&regional(), Field::Make, 0).is_empty());
    }

    #[test]
    fn top_cities_never_come_from_excluded_counties() {
        let dataset = regional();
        // top 2 counties are Spokane (6) and King (5); Everett (4) outranks
        // Redmond (2) but Snohomish is excluded
        let table = top_cities_in_top_counties(&dataset, 2, 10);

        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                pair("Spokane", "Spokane"),
                pair("King", "Seattle"),
                pair("King", "Redmond"),
            ]
        );
        assert_eq!(counts(&table), vec![6, 3, 2]);
        assert_eq!(table.key_labels, vec!["County", "City"]);
    }

    #[test]
    fn top_cities_respects_city_limit() {
        let table = top_cities_in_top_counties(&regional(), 3, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].key, pair("Spokane", "Spokane"));
        assert_eq!(table.rows[1].key, pair("Snohomish", "Everett"));
    }

    #[test]
    fn top_models_within_top_makes() {
        let table = top_models_of_top_makes(&regional(), 1, 10);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].key, pair("KIA", "EV6"));
    }

    #[test]
    fn restrict_to_top_keeps_only_top_groups() {
        let restricted = restrict_to_top(&regional(), Field::Make, 2);
        assert_eq!(restricted.len(), 11);
        assert!(restricted.iter().all(|r| r.make == "KIA" || r.make == "TESLA"));
    }

    #[test]
    fn average_of_single_record_group_is_exact() {
        let dataset = Dataset::new(vec![
            record(2020, "King", "Seattle", "POLESTAR", "PS2", 233.3),
            record(2020, "King", "Seattle", "TESLA", "MODEL 3", 200.0),
            record(2020, "King", "Seattle", "TESLA", "MODEL 3", 300.0),
        ]);

        let table = average_range_by(
            &dataset,
            Grouping::Pair(Field::Make, Field::Model),
            AverageOrder::DescendingByMean { limit: None },
        );

        assert_eq!(table.get(&pair("POLESTAR", "PS2")), Some(SummaryValue::Mean(233.3)));
        assert_eq!(table.get(&pair("TESLA", "MODEL 3")), Some(SummaryValue::Mean(250.0)));
        assert_eq!(table.rows[0].key, pair("TESLA", "MODEL 3"));
        assert_eq!(table.value_label, AVERAGE_RANGE_LABEL);
    }

    #[test]
    fn average_by_year_is_ascending_by_key() {
        let table = average_range_by(
            &regional(),
            Grouping::Single(Field::ModelYear),
            AverageOrder::AscendingByKey,
        );

        let years: Vec<_> = table.year_points().into_iter().map(|(y, _)| y).collect();
        assert_eq!(years, vec![2018, 2019, 2020, 2021, 2022]);
        assert_eq!(table.get(&GroupKey::Year(2021)), Some(SummaryValue::Mean(0.0)));
    }

    #[test]
    fn average_top_n_truncates() {
        let table = average_range_by(
            &regional(),
            Grouping::Single(Field::Model),
            AverageOrder::DescendingByMean { limit: Some(2) },
        );
        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec![name("BOLT EV"), name("MODEL 3")]);
    }
}
