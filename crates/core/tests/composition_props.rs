use std::{collections::BTreeMap, sync::Arc};

use proptest::prelude::*;
use warscroll_core::{
    roster::rules::{battleline_requirement, max_artillery, max_behemoths, max_leaders},
    BattlelineTiers, Catalog, MemoryStore, RosterStore,
};

const FIXTURE: &str = include_str!("fixtures/catalog.json");

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_json_str(FIXTURE).expect("fixture catalog parses"))
}

fn build(
    units: &[(usize, u32)],
    battalions: &[usize],
) -> RosterStore<MemoryStore> {
    let catalog = catalog();
    let mut store =
        RosterStore::open(Arc::clone(&catalog), MemoryStore::new()).expect("empty store opens");
    for &(index, count) in units {
        let unit = &catalog.units()[index % catalog.units().len()];
        if let warscroll_core::RosterChange::UnitAdded(id) =
            store.add_unit(unit).expect("memory write")
        {
            store.set_unit_count(id, count).expect("memory write");
        }
    }
    for &index in battalions {
        let battalion = &catalog.battalions()[index % catalog.battalions().len()];
        store.add_battalion(battalion).expect("memory write");
    }
    store
}

proptest! {
    #[test]
    fn total_is_units_plus_battalions(
        units in prop::collection::vec((0usize..16, 0u32..12), 0..12),
        battalions in prop::collection::vec(0usize..8, 0..4),
    ) {
        let store = build(&units, &battalions);
        let roster = store.roster();

        let expected_units: u32 = roster
            .units()
            .iter()
            .map(|unit| unit.count * unit.unit.points)
            .sum();
        let expected_battalions: u32 = roster
            .battalions()
            .iter()
            .map(|entry| entry.battalion.points)
            .sum();

        let composition = store.composition();
        prop_assert_eq!(composition.units_points, expected_units);
        prop_assert_eq!(composition.battalions_points, expected_battalions);
        prop_assert_eq!(composition.total_points, expected_units + expected_battalions);
    }

    #[test]
    fn bounds_never_shrink_as_points_grow(low in 0u32..30_000, extra in 0u32..30_000) {
        let high = low + extra;
        prop_assert!(max_leaders(low) <= max_leaders(high));
        prop_assert!(max_behemoths(low) <= max_behemoths(high));
        prop_assert!(max_artillery(low) <= max_artillery(high));
        for tiers in [BattlelineTiers::Legacy, BattlelineTiers::Standard] {
            prop_assert!(battleline_requirement(low, tiers) <= battleline_requirement(high, tiers));
        }
    }

    #[test]
    fn outstanding_requirements_subtract_one_per_unit_entry(
        units in prop::collection::vec((0usize..16, 1u32..6), 0..10),
        battalions in prop::collection::vec(0usize..8, 1..4),
    ) {
        let store = build(&units, &battalions);
        let roster = store.roster();

        let mut required: BTreeMap<String, u32> = BTreeMap::new();
        for entry in roster.battalions() {
            for requirement in &entry.battalion.units {
                *required.entry(requirement.unit.id.clone()).or_default() += requirement.count;
            }
        }

        let outstanding = store.outstanding_requirements();
        prop_assert_eq!(
            outstanding.keys().collect::<Vec<_>>(),
            required.keys().collect::<Vec<_>>()
        );
        for (id, total) in &required {
            let entries = roster
                .units()
                .iter()
                .filter(|unit| &unit.unit.id == id)
                .count() as u32;
            prop_assert_eq!(outstanding[id], total.saturating_sub(entries));
        }
    }
}
