use tracing::debug;

use crate::model::{Candidate, DiscoverParams, Slot, TableAvailability};

use super::availability::{common_slots, slots_overlap};

/// Candidates returned per discovery when the caller gives no limit.
pub const DEFAULT_LIMIT: usize = 10;

/// Seats a combination may exceed the party size by. Caps wasted capacity
/// while still allowing seating headroom.
pub const CAPACITY_SLACK: u32 = 2;

/// Table-set discovery strategy, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Single tables whose capacity range admits the party as-is.
    Simple,
    /// Greedy bin-packing search across tables sharing a free slot.
    #[default]
    Bins,
}

impl Strategy {
    pub fn parse(s: &str) -> Option<Strategy> {
        match s {
            "simple" => Some(Strategy::Simple),
            "bins" => Some(Strategy::Bins),
            _ => None,
        }
    }

    pub fn find_candidates(
        &self,
        params: &DiscoverParams,
        tables: &[TableAvailability],
    ) -> Vec<Candidate> {
        match self {
            Strategy::Simple => simple_candidates(params, tables),
            Strategy::Bins => bin_candidates(params, tables),
        }
    }
}

/// Every table with `min_size <= party <= max_size` becomes its own
/// single-table candidate carrying its own free slots unmodified.
fn simple_candidates(params: &DiscoverParams, tables: &[TableAvailability]) -> Vec<Candidate> {
    let target = params.party_size;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let candidates: Vec<Candidate> = tables
        .iter()
        .filter(|t| t.table.min_size <= target && target <= t.table.max_size)
        .take(limit)
        .map(|t| Candidate {
            tables: vec![t.table.clone()],
            total_capacity: t.table.max_size,
            available_slots: t.free_slots.clone(),
        })
        .collect();

    debug!(
        strategy = "simple",
        party_size = target,
        found = candidates.len(),
        "discovery done"
    );
    candidates
}

/// Bin-packing search: sort eligible tables by descending capacity, then grow
/// a combination from each seed with later tables that share a free slot with
/// every member, keeping total capacity within `target + CAPACITY_SLACK`.
/// Combinations are emitted in seed order, capped at `limit`.
fn bin_candidates(params: &DiscoverParams, tables: &[TableAvailability]) -> Vec<Candidate> {
    let target = params.party_size;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    // A table never admits a party below its min_size, alone or in combination.
    let mut sorted: Vec<&TableAvailability> =
        tables.iter().filter(|t| t.table.min_size <= target).collect();
    sorted.sort_by(|a, b| b.table.max_size.cmp(&a.table.max_size));

    let mut candidates = Vec::new();

    for (i, &seed) in sorted.iter().enumerate() {
        if candidates.len() == limit {
            break;
        }

        let mut combo: Vec<&TableAvailability> = vec![seed];
        let mut sum = seed.table.max_size;

        for &next in &sorted[i + 1..] {
            if sum >= target {
                break;
            }
            if sum + next.table.max_size <= target + CAPACITY_SLACK
                && shares_availability(&combo, next)
            {
                sum += next.table.max_size;
                combo.push(next);
            }
        }

        if sum < target {
            continue;
        }

        // Pairwise overlap does not guarantee a common window across the
        // whole set; joint availability requires a non-empty intersection.
        let slot_sets: Vec<&[Slot]> = combo.iter().map(|t| t.free_slots.as_slice()).collect();
        let available_slots = common_slots(&slot_sets);
        if available_slots.is_empty() {
            continue;
        }

        candidates.push(Candidate {
            tables: combo.iter().map(|t| t.table.clone()).collect(),
            total_capacity: sum,
            available_slots,
        });
    }

    debug!(
        strategy = "bins",
        party_size = target,
        found = candidates.len(),
        "discovery done"
    );
    candidates
}

/// True if `candidate` shares at least one overlapping slot with every table
/// already in the combination.
fn shares_availability(combo: &[&TableAvailability], candidate: &TableAvailability) -> bool {
    combo
        .iter()
        .all(|member| slots_overlap(&member.free_slots, &candidate.free_slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 22)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn table(id: &str, min: u32, max: u32) -> Table {
        Table {
            id: id.into(),
            sector_id: "S1".into(),
            name: format!("Table {id}"),
            min_size: min,
            max_size: max,
        }
    }

    fn avail(id: &str, min: u32, max: u32, slots: Vec<Slot>) -> TableAvailability {
        TableAvailability { table: table(id, min, max), free_slots: slots }
    }

    fn params(party: u32, limit: Option<usize>) -> DiscoverParams {
        DiscoverParams {
            restaurant_id: "R1".into(),
            sector_id: "S1".into(),
            date: NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
            party_size: party,
            duration_minutes: 45,
            window_start: None,
            window_end: None,
            limit,
        }
    }

    fn evening() -> Slot {
        Slot::new(dt(20, 0), dt(23, 45))
    }

    #[test]
    fn simple_selects_fitting_tables_only() {
        let tables = vec![
            avail("T1", 2, 2, vec![evening()]),
            avail("T2", 2, 4, vec![evening()]),
            avail("T4", 4, 6, vec![evening()]),
        ];
        let found = Strategy::Simple.find_candidates(&params(3, None), &tables);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tables[0].id, "T2");
        assert_eq!(found[0].total_capacity, 4);
        assert_eq!(found[0].available_slots, vec![evening()]);
    }

    #[test]
    fn simple_respects_limit() {
        let tables: Vec<TableAvailability> = (0..5)
            .map(|i| avail(&format!("T{i}"), 2, 4, vec![evening()]))
            .collect();
        let found = Strategy::Simple.find_candidates(&params(3, Some(2)), &tables);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn bins_single_table_fits() {
        let tables = vec![
            avail("T1", 2, 2, vec![evening()]),
            avail("T3", 2, 4, vec![evening()]),
        ];
        let found = Strategy::Bins.find_candidates(&params(3, None), &tables);
        // T3 alone covers party 3; T1 alone (capacity 2) cannot reach it
        // and T1+T3 would not be seeded from T1 since T3 sorts first.
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tables.len(), 1);
        assert_eq!(found[0].tables[0].id, "T3");
    }

    #[test]
    fn bins_combines_small_tables() {
        let tables = vec![
            avail("T1", 2, 2, vec![evening()]),
            avail("T5", 2, 2, vec![evening()]),
        ];
        let found = Strategy::Bins.find_candidates(&params(4, None), &tables);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tables.len(), 2);
        assert_eq!(found[0].total_capacity, 4);
        assert_eq!(found[0].available_slots, vec![evening()]);
    }

    #[test]
    fn bins_excludes_tables_too_big_for_party() {
        // min_size above the party size disqualifies a table outright
        let tables = vec![avail("T4", 4, 6, vec![evening()])];
        let found = Strategy::Bins.find_candidates(&params(2, None), &tables);
        assert!(found.is_empty());
    }

    #[test]
    fn bins_slack_bound_caps_waste() {
        // party 3: a 2+4 combination would reach 6 > 3 + 2, so the second
        // table must not be added once the seed already seats 4.
        let tables = vec![
            avail("A", 2, 4, vec![evening()]),
            avail("B", 2, 4, vec![evening()]),
        ];
        let found = Strategy::Bins.find_candidates(&params(3, None), &tables);
        for c in &found {
            assert!(c.total_capacity <= 3 + CAPACITY_SLACK);
            assert!(c.total_capacity >= 3);
        }
    }

    #[test]
    fn bins_requires_shared_availability() {
        let early = Slot::new(dt(12, 0), dt(14, 0));
        let late = Slot::new(dt(20, 0), dt(22, 0));
        let tables = vec![
            avail("A", 2, 2, vec![early]),
            avail("B", 2, 2, vec![late]),
        ];
        // No pair of tables with a common window can seat 4.
        let found = Strategy::Bins.find_candidates(&params(4, None), &tables);
        assert!(found.is_empty());
    }

    #[test]
    fn bins_combination_slots_are_intersection() {
        let a = Slot::new(dt(20, 0), dt(23, 0));
        let b = Slot::new(dt(21, 0), dt(23, 45));
        let tables = vec![
            avail("A", 2, 2, vec![a]),
            avail("B", 2, 2, vec![b]),
        ];
        let found = Strategy::Bins.find_candidates(&params(4, None), &tables);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].available_slots, vec![Slot::new(dt(21, 0), dt(23, 0))]);
    }

    #[test]
    fn bins_combination_invariants_hold() {
        let tables = vec![
            avail("A", 2, 4, vec![Slot::new(dt(20, 0), dt(22, 0))]),
            avail("B", 2, 4, vec![Slot::new(dt(20, 0), dt(23, 45))]),
            avail("C", 2, 2, vec![Slot::new(dt(21, 0), dt(23, 0))]),
            avail("D", 1, 2, vec![Slot::new(dt(20, 0), dt(21, 30))]),
        ];
        let party = 6;
        let found = Strategy::Bins.find_candidates(&params(party, None), &tables);
        assert!(!found.is_empty());
        for c in &found {
            assert!(c.total_capacity >= party);
            assert_eq!(
                c.total_capacity,
                c.tables.iter().map(|t| t.max_size).sum::<u32>()
            );
            assert!(!c.available_slots.is_empty());
            for t in &c.tables {
                assert!(t.min_size <= party);
            }
        }
    }

    #[test]
    fn bins_generation_order_follows_capacity_sort() {
        let tables = vec![
            avail("small", 2, 4, vec![evening()]),
            avail("big", 2, 6, vec![evening()]),
        ];
        let found = Strategy::Bins.find_candidates(&params(4, None), &tables);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].tables[0].id, "big");
        assert_eq!(found[1].tables[0].id, "small");
    }

    #[test]
    fn bins_respects_limit() {
        let tables: Vec<TableAvailability> = (0..20)
            .map(|i| avail(&format!("T{i}"), 2, 4, vec![evening()]))
            .collect();
        let found = Strategy::Bins.find_candidates(&params(4, None), &tables);
        assert_eq!(found.len(), DEFAULT_LIMIT);
    }

    #[test]
    fn strategy_parse() {
        assert_eq!(Strategy::parse("simple"), Some(Strategy::Simple));
        assert_eq!(Strategy::parse("bins"), Some(Strategy::Bins));
        assert_eq!(Strategy::parse("fancy"), None);
        assert_eq!(Strategy::default(), Strategy::Bins);
    }
}
