use std::{io::Write, sync::Arc};

use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::debug;
use warscroll_core::{
    catalog::{CategoryRule, CategoryTag, Unit},
    roster::RosterUnit,
    save::SerializedRoster,
    KeyValueStore, RosterChange, RosterStore,
};

use crate::{CatalogSection, Command};

/// Run one command against the store, writing human-readable output to `out`.
pub(crate) fn execute<S: KeyValueStore>(
    store: &mut RosterStore<S>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    debug!(?command, slot = ?store.active_slot(), "executing");
    let catalog = Arc::clone(store.catalog());

    let change = match command {
        Command::Catalog { section } => return print_catalog(store, section, out),
        Command::Show { json } => {
            return if json {
                print_json(store, out)
            } else {
                print_roster(store, out)
            }
        }
        Command::Slots => {
            if store.known_slots().is_empty() {
                writeln!(out, "No named slots")?;
            }
            for name in store.known_slots() {
                let marker = if store.active_slot() == Some(name.as_str()) {
                    "*"
                } else {
                    " "
                };
                writeln!(out, "{marker} {name}")?;
            }
            return Ok(());
        }
        Command::SaveAs { name } => {
            store.save_as(&name)?;
            writeln!(out, "Saved {:?} as {name:?}", store.roster().name)?;
            return Ok(());
        }
        Command::Load { name } => {
            let label = name.as_deref().unwrap_or("default");
            if store.load(name.as_deref())? {
                writeln!(out, "Loaded {:?} from {label}", store.roster().name)?;
            } else {
                writeln!(out, "Slot {label} is empty")?;
            }
            return Ok(());
        }
        Command::DeleteSlot { name } => {
            store.delete_slot(&name)?;
            writeln!(out, "Deleted slot {name:?}")?;
            return Ok(());
        }
        Command::AddUnit { unit, count } => {
            let entry = catalog
                .unit(&unit)
                .with_context(|| format!("unknown unit {unit:?}"))?;
            let change = store.add_unit(entry)?;
            if let (Some(count), RosterChange::UnitAdded(id)) = (count, &change) {
                store.set_unit_count(*id, count)?;
            }
            change
        }
        Command::SetCount { unit, count } => store.set_unit_count(unit, count)?,
        Command::RemoveUnit { unit } => store.remove_unit(unit)?,
        Command::AddBattalion { battalion } => {
            let entry = catalog
                .battalion(&battalion)
                .with_context(|| format!("unknown battalion {battalion:?}"))?;
            store.add_battalion(entry)?
        }
        Command::RemoveBattalion { battalion } => store.remove_battalion(battalion)?,
        Command::SetGeneral { unit } => store.set_general(unit)?,
        Command::SetWeapon {
            unit,
            slot,
            option,
            count,
        } => {
            let entry = store
                .roster()
                .unit(unit)
                .with_context(|| format!("{unit} is not in the roster"))?;
            let weapon = entry
                .unit
                .weapon_options
                .get(slot)
                .and_then(|group| group.option(&option))
                .cloned()
                .with_context(|| {
                    format!(
                        "{} has no option {option:?} in group {slot}",
                        entry.unit.model.name
                    )
                })?;
            store.set_weapon_option(unit, slot, &weapon, count)?
        }
        Command::AddAbility {
            unit,
            ability,
            force,
        } => {
            let entry = catalog
                .extra_ability(&ability)
                .with_context(|| format!("unknown ability {ability:?}"))?;
            if !force
                && !store
                    .available_extra_abilities(unit)
                    .iter()
                    .any(|available| available.id == entry.id)
            {
                bail!("{ability} is not available to {unit}; pass --force to add it anyway");
            }
            store.add_extra_ability(unit, entry)?
        }
        Command::RemoveAbility { unit, ability } => store.remove_extra_ability(unit, &ability)?,
        Command::SetArmyOption { value } => {
            if let Some(option) = store.army_options() {
                if !option.values.contains(&value) {
                    writeln!(
                        out,
                        "Note: {value:?} is not one of the listed {} values",
                        option.name
                    )?;
                }
            }
            store.set_army_option(value)?
        }
        Command::SetAllegiance { allegiance } => store.set_allegiance(&allegiance)?,
        Command::SetGrandAlliance { grand_alliance } => store.set_grand_alliance(grand_alliance)?,
        Command::Rename { name } => store.set_name(name)?,
    };

    writeln!(out, "{}", describe(&change))?;
    if change != RosterChange::Unchanged {
        let composition = store.composition();
        writeln!(out, "Total: {} pts", composition.total_points)?;
    }
    Ok(())
}

fn describe(change: &RosterChange) -> String {
    match change {
        RosterChange::Unchanged => "No matching roster entry; nothing changed".to_string(),
        RosterChange::UnitAdded(id) => format!("Added unit {id}"),
        RosterChange::UnitCountChanged { unit, count } => format!("{unit} now has count {count}"),
        RosterChange::UnitRemoved(id) => format!("Removed unit {id}"),
        RosterChange::BattalionAdded(id) => format!("Added battalion {id}"),
        RosterChange::BattalionRemoved(id) => format!("Removed battalion {id}"),
        RosterChange::GeneralChanged(Some(id)) => format!("General is now {id}"),
        RosterChange::GeneralChanged(None) => "General cleared".to_string(),
        RosterChange::WeaponOptionChanged { unit, slot } => {
            format!("Updated weapon group {slot} of {unit}")
        }
        RosterChange::ExtraAbilityAdded { unit, ability } => format!("Gave {ability} to {unit}"),
        RosterChange::ExtraAbilityRemoved { unit, ability } => {
            format!("Removed {ability} from {unit}")
        }
        RosterChange::ArmyOptionChanged(value) => format!("Army option set to {value:?}"),
        RosterChange::Renamed(name) => format!("Renamed to {name:?}"),
        RosterChange::GrandAllianceChanged(grand_alliance) => {
            format!("Grand alliance set to {grand_alliance}")
        }
        RosterChange::AllegianceChanged(id) => format!("Allegiance set to {id}"),
        RosterChange::Loaded { slot } => {
            format!("Loaded {}", slot.as_deref().unwrap_or("default slot"))
        }
    }
}

fn category_labels(categories: &[CategoryTag]) -> String {
    categories
        .iter()
        .map(|tag| match tag.when {
            CategoryRule::Always => tag.category.to_string(),
            CategoryRule::WhenGeneral => format!("{} (as general)", tag.category),
            CategoryRule::WhenNotGeneral => format!("{} (unless general)", tag.category),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn unit_label(unit: &Unit) -> String {
    match &unit.sub_type {
        Some(sub_type) => format!("{} ({sub_type})", unit.model.name),
        None => unit.model.name.clone(),
    }
}

fn print_catalog<S: KeyValueStore>(
    store: &RosterStore<S>,
    section: CatalogSection,
    out: &mut impl Write,
) -> Result<()> {
    let catalog = store.catalog();
    writeln!(out, "Catalog {}", catalog.metadata().label())?;
    match section {
        CatalogSection::Units => {
            for unit in catalog.units() {
                writeln!(
                    out,
                    "{:<24} {:<32} {:>4} pts  size {:<3} {}",
                    unit.id,
                    unit_label(unit),
                    unit.points,
                    unit.size,
                    category_labels(&unit.categories)
                )?;
            }
        }
        CatalogSection::Battalions => {
            for battalion in catalog.battalions() {
                writeln!(
                    out,
                    "{:<24} {:<32} {:>4} pts",
                    battalion.id, battalion.name, battalion.points
                )?;
                for requirement in &battalion.units {
                    writeln!(
                        out,
                        "    {} x{}",
                        requirement.unit.model.name, requirement.count
                    )?;
                }
            }
        }
        CatalogSection::Abilities => {
            for ability in catalog.extra_abilities() {
                writeln!(
                    out,
                    "{:<40} {:<28} {:<20} {:?}",
                    ability.id, ability.ability.name, ability.allegiance.name, ability.category
                )?;
            }
        }
        CatalogSection::Allegiances => {
            for allegiance in catalog.allegiances() {
                writeln!(
                    out,
                    "{:<24} {:<28} {}",
                    allegiance.id, allegiance.name, allegiance.grand_alliance
                )?;
                if let Some(option) = catalog.army_options(&allegiance.id) {
                    writeln!(out, "    {}: {}", option.name, option.values.join(", "))?;
                }
            }
        }
    }
    Ok(())
}

fn print_unit<S: KeyValueStore>(
    store: &RosterStore<S>,
    unit: &RosterUnit,
    out: &mut impl Write,
) -> Result<()> {
    let roster = store.roster();
    let general = if roster.is_general(unit.id) {
        "  [general]"
    } else {
        ""
    };
    writeln!(
        out,
        "  {:<4} {:<32} x{:<3} {:>5} pts{general}",
        unit.id.to_string(),
        unit_label(&unit.unit),
        unit.count,
        unit.points()
    )?;
    for (slot, selection) in unit.weapon_options.iter().enumerate() {
        if let Some(weapon) = &selection.weapon_option {
            match selection.count {
                Some(count) => writeln!(out, "         weapon {slot}: {} x{count}", weapon.name)?,
                None => writeln!(out, "         weapon {slot}: {}", weapon.name)?,
            }
        }
    }
    for ability in &unit.extra_abilities {
        writeln!(out, "         {:?}: {}", ability.category, ability.ability.name)?;
    }
    Ok(())
}

fn print_roster<S: KeyValueStore>(store: &RosterStore<S>, out: &mut impl Write) -> Result<()> {
    let roster = store.roster();
    writeln!(
        out,
        "{} ({}, {}) in slot {}",
        roster.name,
        roster.grand_alliance,
        roster.allegiance.name,
        store.active_slot().unwrap_or("default")
    )?;
    if let Some(option) = store.army_options() {
        let value = if roster.army_option.is_empty() {
            "-"
        } else {
            roster.army_option.as_str()
        };
        writeln!(out, "{}: {value}", option.name)?;
    }

    writeln!(out, "Units")?;
    for unit in roster.units() {
        print_unit(store, unit, out)?;
    }

    let lines = store.battalion_lines();
    if !lines.is_empty() {
        writeln!(out, "Battalions")?;
        for line in &lines {
            writeln!(
                out,
                "  {:<4} {:<32} {:>5} pts",
                line.id.to_string(),
                line.battalion.name,
                line.battalion.points
            )?;
            for requirement in &line.requirements {
                let status = if requirement.missing { "missing" } else { "ok" };
                writeln!(
                    out,
                    "         {} x{} {status}",
                    requirement.unit.model.name, requirement.count
                )?;
            }
        }
    }

    let composition = store.composition();
    writeln!(
        out,
        "Points: {} units + {} battalions = {}",
        composition.units_points, composition.battalions_points, composition.total_points
    )?;
    writeln!(
        out,
        "Leaders {} ({} - {}), battlelines {} ({}), behemoths {} (0 - {}), artillery {} (0 - {})",
        composition.leaders,
        composition.min_leaders,
        composition.max_leaders,
        composition.battlelines,
        composition.min_battlelines,
        composition.behemoths,
        composition.max_behemoths,
        composition.artillery,
        composition.max_artillery
    )?;
    for warning in composition.warnings() {
        writeln!(out, "Warning: {warning}")?;
    }
    Ok(())
}

fn print_json<S: KeyValueStore>(store: &RosterStore<S>, out: &mut impl Write) -> Result<()> {
    let composition = store.composition();
    let report = json!({
        "slot": store.active_slot(),
        "roster": SerializedRoster::capture(store.roster()),
        "composition": composition,
        "valid": composition.is_valid(),
        "warnings": composition.warnings(),
        "outstanding": store.outstanding_requirements(),
    });
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}
