//! Unit instance inclusion and exclusion.
//!
//! Computes which instances of its unit a quantity exposes. Levels of the
//! flattened specialization chain are applied root to leaf:
//!
//! - nothing restricted yet: an `Include` list replaces the visible set
//! - otherwise `Include` combines with the running set by stacking mode:
//!   `Intersection` narrows it, `Union` widens it
//! - `Exclude` removes instances from the running set
//!
//! Diagnostics are only reported for the quantity's own level; inherited
//! levels were diagnosed when their owner was resolved.

use indexmap::IndexSet;
use measures_ast::{ListMode, RawUnitList, StackingMode};

use crate::error::{Diagnostic, ErrorKind};
use crate::resolve::settings::ResolutionSettings;
use crate::resolve::specialization::{FlatQuantity, UnitListLevel};
use crate::resolve::units::ResolvedUnit;

/// Instance names visible on `quantity`, in the unit's declaration order.
pub fn visible_instances(
    quantity: &FlatQuantity,
    unit: &ResolvedUnit,
    settings: &ResolutionSettings,
    errors: &mut Vec<Diagnostic>,
) -> IndexSet<String> {
    let mut filter = InclusionFilter {
        unit,
        running: unit.instances.keys().cloned().collect(),
        restricted: false,
        report: false,
        settings,
        errors,
    };
    for level in &quantity.unit_levels {
        filter.report = level.owner == quantity.id;
        filter.apply(level);
    }

    let running = filter.running;
    unit.instances
        .keys()
        .filter(|name| running.contains(*name))
        .cloned()
        .collect()
}

struct InclusionFilter<'a, 'e> {
    unit: &'a ResolvedUnit,
    running: IndexSet<String>,
    restricted: bool,
    /// Whether the level being applied belongs to the resolved quantity.
    report: bool,
    settings: &'a ResolutionSettings,
    errors: &'e mut Vec<Diagnostic>,
}

impl InclusionFilter<'_, '_> {
    fn apply(&mut self, level: &UnitListLevel) {
        let includes: Vec<&RawUnitList> = level
            .lists
            .iter()
            .filter(|l| matches!(l.mode, ListMode::Include(_)))
            .collect();
        let excludes: Vec<&RawUnitList> = level
            .lists
            .iter()
            .filter(|l| l.mode == ListMode::Exclude)
            .collect();

        if !includes.is_empty() && !excludes.is_empty() {
            if self.report {
                self.errors.push(
                    Diagnostic::error(
                        ErrorKind::ContradictoryInclusion,
                        excludes[0].locator,
                        format!(
                            "'{}' both includes and excludes units; the exclusions are ignored",
                            level.owner
                        ),
                    )
                    .with_label(includes[0].locator, "units included here".to_string()),
                );
            }
            self.include(&includes);
        } else if !includes.is_empty() {
            self.include(&includes);
        } else if !excludes.is_empty() {
            self.exclude(&excludes);
        }
    }

    /// Valid, first-seen names of `lists`, reporting unknown and repeated
    /// ones.
    fn collect_names(&mut self, lists: &[&RawUnitList]) -> IndexSet<String> {
        let mut names = IndexSet::new();
        for list in lists {
            for name in &list.instances {
                if !self.unit.instances.contains_key(name) {
                    if self.report {
                        self.errors.push(Diagnostic::error(
                            ErrorKind::UnrecognizedUnitInstance,
                            list.locator,
                            format!("'{}' is not an instance of '{}'", name, self.unit.id),
                        ));
                    }
                    continue;
                }
                if !names.insert(name.clone()) {
                    self.redundant(list, format!("'{}' is listed more than once", name));
                }
            }
        }
        names
    }

    fn include(&mut self, lists: &[&RawUnitList]) {
        let stacking = match lists[0].mode {
            ListMode::Include(stacking) => stacking,
            ListMode::Exclude => StackingMode::Union,
        };
        let names = self.collect_names(lists);

        if !self.restricted {
            self.running = names;
            self.restricted = true;
            return;
        }

        for name in &names {
            let redundant = match stacking {
                StackingMode::Intersection => !self.running.contains(name),
                StackingMode::Union => self.running.contains(name),
            };
            if redundant {
                let message = match stacking {
                    StackingMode::Intersection => {
                        format!("'{}' is not among the inherited units", name)
                    }
                    StackingMode::Union => format!("'{}' is already included", name),
                };
                self.redundant(lists[0], message);
            }
        }

        match stacking {
            StackingMode::Intersection => self.running.retain(|name| names.contains(name)),
            StackingMode::Union => self.running.extend(names),
        }
    }

    fn exclude(&mut self, lists: &[&RawUnitList]) {
        let names = self.collect_names(lists);
        for name in &names {
            if !self.running.shift_remove(name) {
                self.redundant(lists[0], format!("'{}' is already excluded", name));
            }
        }
        self.restricted = true;
    }

    fn redundant(&mut self, list: &RawUnitList, message: String) {
        if self.report && self.settings.redundancy_warnings {
            self.errors.push(Diagnostic::warning(
                ErrorKind::RedundantListing,
                list.locator,
                message,
            ));
        }
    }
}

/// The quantity's default unit instance, if it is visible.
///
/// An invisible default is dropped: as an error when the quantity declared
/// it, as a warning when it was inherited.
pub fn resolve_default_unit(
    quantity: &FlatQuantity,
    visible: &IndexSet<String>,
    errors: &mut Vec<Diagnostic>,
) -> Option<String> {
    let default = quantity.default_unit.as_ref()?;
    if visible.contains(&default.item) {
        return Some(default.item.clone());
    }

    let message = format!(
        "default unit instance '{}' is not visible for '{}'",
        default.item, quantity.id
    );
    errors.push(if quantity.owns(default) {
        Diagnostic::error(ErrorKind::UnrecognizedUnitInstance, quantity.locator, message)
    } else {
        Diagnostic::warning(ErrorKind::UnrecognizedUnitInstance, quantity.locator, message)
            .with_note(format!("inherited from '{}'", default.owner))
    });
    None
}
