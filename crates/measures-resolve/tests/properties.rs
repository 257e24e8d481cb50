//! End-to-end resolution tests.
//!
//! Each test feeds a small declaration set through [`resolve`] and checks the
//! resulting population and diagnostics:
//! - composition of unit instance scales and offsets
//! - cycle handling in instance and specialization chains
//! - inheritance flattening and unit inclusion stacking
//! - derivation signature matching
//! - constant naming collisions
//! - determinism across runs and scheduling modes

use measures_ast::{
    Declaration, Locator, QuantityKind, RawConstant, RawDerivation, RawQuantity, RawUnit,
    RawUnitInstance, RawUnitList, StackingMode, TypeId,
};
use measures_resolve::{
    resolve, CancellationToken, ErrorKind, Resolution, ResolutionSettings, ResolveError,
};

fn loc(start: u32) -> Locator {
    Locator::new(0, start, start + 1, 1)
}

fn run(declarations: Vec<Declaration>) -> Resolution {
    resolve(
        declarations,
        &ResolutionSettings::default(),
        &CancellationToken::new(),
    )
    .expect("resolution should not abort")
}

fn kinds(resolution: &Resolution) -> Vec<ErrorKind> {
    resolution.diagnostics.iter().map(|d| d.kind).collect()
}

fn length_and_unit() -> Vec<Declaration> {
    vec![
        RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", loc(1)).into(),
        RawUnit::new("UnitOfLength", "Length", loc(2))
            .with_instance(RawUnitInstance::fixed("Metre", loc(3)))
            .with_instance(RawUnitInstance::scaled("Kilometre", "Metre", 1000.0, loc(4)))
            .with_instance(RawUnitInstance::scaled("Centimetre", "Metre", 0.01, loc(5)))
            .with_instance(
                RawUnitInstance::scaled("Foot", "Metre", 0.3048, loc(6)).with_plural("Feet"),
            )
            .into(),
    ]
}

fn visible(resolution: &Resolution, id: &str) -> Vec<String> {
    resolution
        .population
        .quantity(&TypeId::from(id))
        .expect("quantity should resolve")
        .visible_units
        .iter()
        .cloned()
        .collect()
}

// =============================================================================
// Scale and bias composition
// =============================================================================

#[test]
fn test_kilometre_scale() {
    let resolution = run(length_and_unit());
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);

    let unit = resolution
        .population
        .unit(&TypeId::from("UnitOfLength"))
        .unwrap();
    let kilometre = unit.instance("Kilometre").unwrap();
    assert_eq!(kilometre.scale.literal(), Some(1000.0));
    assert_eq!(kilometre.to_root(1.0), Some(1000.0));
}

#[test]
fn test_celsius_offset() {
    let resolution = run(vec![
        RawQuantity::base("Temperature", QuantityKind::Scalar, "UnitOfTemperature", loc(1))
            .with_biased(true)
            .into(),
        RawUnit::new("UnitOfTemperature", "Temperature", loc(2))
            .with_bias_term(true)
            .with_instance(RawUnitInstance::fixed("Kelvin", loc(3)))
            .with_instance(RawUnitInstance::biased("Celsius", "Kelvin", -273.15, loc(4)))
            .into(),
    ]);
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);

    let unit = &resolution.population.units[&TypeId::from("UnitOfTemperature")];
    let kelvin = unit.instance("Celsius").unwrap().to_root(0.0).unwrap();
    assert!((kelvin - 273.15).abs() < 1e-9);
    assert!(resolution.population.scalars[&TypeId::from("Temperature")].biased);
}

// =============================================================================
// Acyclicity
// =============================================================================

#[test]
fn test_instance_cycle_excludes_only_cycle() {
    let resolution = run(vec![
        RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", loc(1)).into(),
        RawUnit::new("UnitOfLength", "Length", loc(2))
            .with_instance(RawUnitInstance::fixed("Metre", loc(3)))
            .with_instance(RawUnitInstance::scaled("A", "B", 2.0, loc(4)))
            .with_instance(RawUnitInstance::scaled("B", "A", 2.0, loc(5)))
            .into(),
    ]);

    assert_eq!(kinds(&resolution), [ErrorKind::CyclicallyModifiedInstance]);
    let unit = &resolution.population.units[&TypeId::from("UnitOfLength")];
    let names: Vec<_> = unit.instances.keys().map(String::as_str).collect();
    assert_eq!(names, ["Metre"]);
}

#[test]
fn test_specialization_cycle_excludes_only_cycle() {
    let mut declarations = length_and_unit();
    declarations.extend([
        RawQuantity::specialization("A", QuantityKind::Scalar, "C", loc(10)).into(),
        RawQuantity::specialization("B", QuantityKind::Scalar, "A", loc(11)).into(),
        RawQuantity::specialization("C", QuantityKind::Scalar, "B", loc(12)).into(),
        RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", loc(13)).into(),
    ]);
    let resolution = run(declarations);

    assert_eq!(kinds(&resolution), [ErrorKind::CyclicSpecialization]);
    let scalars: Vec<_> = resolution
        .population
        .scalars
        .keys()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(scalars, ["Length", "Distance"]);
}

#[test]
fn test_long_chains_do_not_overflow() {
    let mut unit = RawUnit::new("UnitOfLength", "Length", loc(0))
        .with_instance(RawUnitInstance::fixed("I0", loc(0)));
    for i in 1..10_000u32 {
        unit = unit.with_instance(RawUnitInstance::scaled(
            format!("I{}", i),
            format!("I{}", i - 1),
            1.0,
            loc(i),
        ));
    }
    let mut declarations: Vec<Declaration> = vec![
        RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", loc(0)).into(),
        unit.into(),
    ];
    for i in 1..10_000u32 {
        let parent = if i == 1 {
            "Length".to_string()
        } else {
            format!("Q{}", i - 1)
        };
        declarations.push(
            RawQuantity::specialization(format!("Q{}", i), QuantityKind::Scalar, parent, loc(i))
                .into(),
        );
    }

    let resolution = run(declarations);
    assert!(resolution.diagnostics.is_empty());
    assert_eq!(resolution.population.scalars.len(), 10_000);
    assert_eq!(
        resolution.population.units[&TypeId::from("UnitOfLength")]
            .instances
            .len(),
        10_000
    );
}

// =============================================================================
// Inheritance and inclusion
// =============================================================================

#[test]
fn test_inherit_constants_flag() {
    let base = || {
        RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", loc(1))
            .with_constant(RawConstant::scalar("Marathon", "Kilometre", 42.195, loc(20)))
            .with_constant(RawConstant::scalar("Mile", "Metre", 1609.344, loc(21)))
            .with_constant(RawConstant::scalar("League", "Metre", 4828.032, loc(22)))
    };
    let child = || {
        RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", loc(30))
            .with_constant(RawConstant::scalar("Lap", "Metre", 400.0, loc(31)))
            .with_constant(RawConstant::scalar("Mile", "Foot", 5280.0, loc(32)))
    };
    let names = |resolution: &Resolution| -> Vec<String> {
        resolution.population.scalars[&TypeId::from("Distance")]
            .constants
            .iter()
            .map(|c| c.name.clone())
            .collect()
    };

    let mut declarations = length_and_unit();
    declarations[0] = base().into();
    declarations.push(child().with_inherit_constants(false).into());
    let resolution = run(declarations);
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);
    assert_eq!(names(&resolution), ["Lap", "Mile"]);

    let mut declarations = length_and_unit();
    declarations[0] = base().into();
    declarations.push(child().into());
    let resolution = run(declarations);
    assert_eq!(names(&resolution), ["Marathon", "League", "Lap", "Mile"]);
    let mile = &resolution.population.scalars[&TypeId::from("Distance")].constants[3];
    assert_eq!(mile.unit_instance, "Foot");
    assert_eq!(mile.owner, TypeId::from("Distance"));
}

#[test]
fn test_stacking_modes() {
    let with_child = |stacking: StackingMode| {
        let mut declarations = length_and_unit();
        declarations[0] = RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", loc(1))
            .with_unit_list(RawUnitList::include(
                &["Metre", "Kilometre", "Centimetre"],
                StackingMode::Union,
                loc(7),
            ))
            .into();
        declarations.push(
            RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", loc(8))
                .with_unit_list(RawUnitList::include(&["Kilometre"], stacking, loc(9)))
                .into(),
        );
        run(declarations)
    };

    let resolution = with_child(StackingMode::Intersection);
    assert!(resolution.diagnostics.is_empty());
    assert_eq!(visible(&resolution, "Distance"), ["Kilometre"]);

    let resolution = with_child(StackingMode::Union);
    assert_eq!(
        visible(&resolution, "Distance"),
        ["Metre", "Kilometre", "Centimetre"]
    );
    assert_eq!(kinds(&resolution), [ErrorKind::RedundantListing]);
    assert!(!resolution.has_errors());
}

#[test]
fn test_redundancy_warnings_can_be_disabled() {
    let mut declarations = length_and_unit();
    declarations.push(
        RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", loc(8))
            .with_unit_list(RawUnitList::exclude(&["Foot", "Foot"], loc(9)))
            .into(),
    );
    let settings = ResolutionSettings {
        redundancy_warnings: false,
        ..ResolutionSettings::default()
    };
    let resolution = resolve(declarations, &settings, &CancellationToken::new()).unwrap();
    assert!(resolution.diagnostics.is_empty());
    assert_eq!(
        visible(&resolution, "Distance"),
        ["Metre", "Kilometre", "Centimetre"]
    );
}

// =============================================================================
// Derivations
// =============================================================================

fn speed_declarations(unit: RawUnit) -> Vec<Declaration> {
    vec![
        RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", loc(1)).into(),
        RawQuantity::base("Time", QuantityKind::Scalar, "UnitOfTime", loc(2)).into(),
        RawQuantity::base("Speed", QuantityKind::Scalar, "UnitOfSpeed", loc(3)).into(),
        RawUnit::new("UnitOfLength", "Length", loc(4))
            .with_instance(RawUnitInstance::fixed("Metre", loc(5)))
            .into(),
        RawUnit::new("UnitOfTime", "Time", loc(6))
            .with_instance(RawUnitInstance::fixed("Second", loc(7)))
            .into(),
        unit.into(),
    ]
}

#[test]
fn test_two_signatures_need_ids() {
    let resolution = run(speed_declarations(
        RawUnit::new("UnitOfSpeed", "Speed", loc(8))
            .with_derivation(RawDerivation::new(
                "{0} / {1}",
                &["UnitOfLength", "UnitOfTime"],
                loc(9),
            ))
            .with_derivation(RawDerivation::new(
                "{1} / {0}",
                &["UnitOfTime", "UnitOfLength"],
                loc(10),
            )),
    ));
    let kinds = kinds(&resolution);
    assert!(kinds.contains(&ErrorKind::AmbiguousDerivationSignature));
    assert!(resolution.population.units[&TypeId::from("UnitOfSpeed")]
        .derivations
        .is_empty());
}

#[test]
fn test_permutable_signature_accepts_either_order() {
    let resolution = run(speed_declarations(
        RawUnit::new("UnitOfSpeed", "Speed", loc(8))
            .with_derivation(
                RawDerivation::new("{0} / {1}", &["UnitOfLength", "UnitOfTime"], loc(9))
                    .with_permutations(true),
            )
            .with_instance(RawUnitInstance::derived(
                "MetrePerSecond",
                None,
                &["Metre", "Second"],
                loc(10),
            ))
            .with_instance(RawUnitInstance::derived(
                "MetrePerSecondSwapped",
                None,
                &["Second", "Metre"],
                loc(11),
            )),
    ));
    assert!(resolution.diagnostics.is_empty(), "{:?}", resolution.diagnostics);

    let unit = &resolution.population.units[&TypeId::from("UnitOfSpeed")];
    assert_eq!(
        unit.instance("MetrePerSecond").unwrap().scale,
        unit.instance("MetrePerSecondSwapped").unwrap().scale
    );
}

#[test]
fn test_derived_instance_over_cyclic_instance_is_dropped() {
    let mut declarations = speed_declarations(
        RawUnit::new("UnitOfSpeed", "Speed", loc(8))
            .with_derivation(RawDerivation::new(
                "{0} / {1}",
                &["UnitOfLength", "UnitOfTime"],
                loc(9),
            ))
            .with_instance(RawUnitInstance::derived("APerSecond", None, &["A", "Second"], loc(10)))
            .with_instance(RawUnitInstance::derived(
                "MetrePerSecond",
                None,
                &["Metre", "Second"],
                loc(11),
            )),
    );
    declarations[3] = RawUnit::new("UnitOfLength", "Length", loc(4))
        .with_instance(RawUnitInstance::fixed("Metre", loc(5)))
        .with_instance(RawUnitInstance::alias("A", "B", loc(12)))
        .with_instance(RawUnitInstance::alias("B", "A", loc(13)))
        .into();
    let resolution = run(declarations);

    assert_eq!(
        kinds(&resolution),
        [
            ErrorKind::CyclicallyModifiedInstance,
            ErrorKind::IncompatibleDerivedUnitInstance,
        ]
    );
    let speed = resolution
        .population
        .unit(&TypeId::from("UnitOfSpeed"))
        .unwrap();
    let names: Vec<_> = speed.instances.keys().map(String::as_str).collect();
    assert_eq!(names, ["MetrePerSecond"]);
}

#[test]
fn test_quantity_signature_over_excluded_quantity_is_dropped() {
    let mut declarations = length_and_unit();
    declarations.extend([
        RawQuantity::specialization("Loop", QuantityKind::Scalar, "Loop", loc(10)).into(),
        RawQuantity::base("Velocity", QuantityKind::Scalar, "UnitOfLength", loc(11))
            .with_derivation(
                RawDerivation::new("{0} * {1}", &["Loop", "Length"], loc(12)).with_id("Looped"),
            )
            .with_derivation(
                RawDerivation::new("{0} * {1}", &["Length", "Length"], loc(13)).with_id("Square"),
            )
            .into(),
    ]);
    let resolution = run(declarations);

    assert_eq!(
        kinds(&resolution),
        [ErrorKind::CyclicSpecialization, ErrorKind::UnrecognizedType]
    );
    assert_eq!(resolution.diagnostics[1].locator, loc(12));
    let velocity = &resolution.population.scalars[&TypeId::from("Velocity")];
    let ids: Vec<_> = velocity
        .derivations
        .iter()
        .filter_map(|d| d.id.as_deref())
        .collect();
    assert_eq!(ids, ["Square"]);
}

// =============================================================================
// Constants
// =============================================================================

#[test]
fn test_constant_named_like_plural_is_rejected() {
    let mut declarations = length_and_unit();
    declarations[0] = RawQuantity::base("Length", QuantityKind::Scalar, "UnitOfLength", loc(1))
        .with_constant(RawConstant::scalar("Feet", "Metre", 0.3048, loc(20)))
        .with_constant(RawConstant::scalar("Fathom", "Foot", 6.0, loc(21)))
        .into();
    let resolution = run(declarations);

    assert_eq!(kinds(&resolution), [ErrorKind::ConstantSharesName]);
    let constants: Vec<_> = resolution.population.scalars[&TypeId::from("Length")]
        .constants
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(constants, ["Fathom"]);
}

// =============================================================================
// Determinism and cancellation
// =============================================================================

fn mixed_declarations() -> Vec<Declaration> {
    let mut declarations = length_and_unit();
    declarations.extend([
        RawQuantity::specialization("Distance", QuantityKind::Scalar, "Length", loc(10))
            .with_unit_list(RawUnitList::exclude(&["Foot"], loc(11)))
            .with_constant(RawConstant::scalar("Lap", "Metre", 400.0, loc(12)))
            .into(),
        RawQuantity::base(
            "Displacement",
            QuantityKind::Vector { dimension: 3 },
            "UnitOfLength",
            loc(13),
        )
        .with_scalar("Length")
        .into(),
        RawQuantity::base("Position", QuantityKind::VectorGroup, "UnitOfLength", loc(14)).into(),
        RawQuantity::member("Position2", "Position", 2, loc(15))
            .with_resize("Position", 3, loc(16))
            .into(),
        RawQuantity::member("Position3", "Position", 3, loc(17)).into(),
        RawQuantity::specialization("Broken", QuantityKind::Scalar, "Missing", loc(18)).into(),
        RawQuantity::specialization("Loop", QuantityKind::Scalar, "Loop", loc(19)).into(),
    ]);
    declarations
}

#[test]
fn test_resolution_is_idempotent() {
    let first = run(mixed_declarations());
    let second = run(mixed_declarations());
    assert_eq!(first, second);
    assert_eq!(first.errors().count(), 2);

    let position2 = &first.population.vector_group_members[&TypeId::from("Position2")];
    assert_eq!(position2.resizes[0].target, TypeId::from("Position3"));
    let group = &first.population.vector_groups[&TypeId::from("Position")];
    assert_eq!(group.members.len(), 2);
}

#[test]
fn test_parallel_matches_sequential() {
    let sequential = run(mixed_declarations());
    let settings = ResolutionSettings {
        parallel: true,
        ..ResolutionSettings::default()
    };
    let parallel = resolve(mixed_declarations(), &settings, &CancellationToken::new()).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_cancellation_aborts_run() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = resolve(mixed_declarations(), &ResolutionSettings::default(), &cancel);
    assert!(matches!(result, Err(ResolveError::Cancelled)));
}

#[test]
fn test_settings_from_json() {
    let settings: ResolutionSettings =
        serde_json::from_str(r#"{ "parallel": true, "default_multiples_prefix": "Many" }"#)
            .unwrap();
    assert!(settings.parallel);
    assert!(settings.documentation);
    assert_eq!(settings.default_multiples_name("Lap"), "ManyLap");
}
