use dungeon_core::grammar::{default_registry, default_start_phrase};
use dungeon_core::{GeneratorConfig, LayoutConfig, generate_dungeon};
use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};

#[test]
fn test_generated_layouts_hold_invariants() {
    let registry = default_registry().expect("registry");
    let phrase = default_start_phrase();
    let mut runner = TestRunner::new(ProptestConfig::with_cases(24));

    runner
        .run(&any::<u64>(), |seed| {
            let config = GeneratorConfig { error_tolerance: usize::MAX, ..GeneratorConfig::default() };
            let dungeon = generate_dungeon(&registry, &phrase, seed, config)
                .map_err(|error| TestCaseError::fail(error.to_string()))?;
            dungeon
                .blueprint
                .verify(LayoutConfig::default().clearance)
                .map_err(|violation| TestCaseError::fail(format!("seed {seed}: {violation}")))?;
            Ok(())
        })
        .expect("generated layouts should hold their invariants");
}

#[test]
fn test_bounded_layouts_hold_invariants() {
    let registry = default_registry().expect("registry");
    let phrase = default_start_phrase();
    let mut runner = TestRunner::new(ProptestConfig::with_cases(16));

    runner
        .run(&(any::<u64>(), 20..60_i32), |(seed, bound)| {
            let config = GeneratorConfig {
                layout: LayoutConfig { bound: Some(bound), ..LayoutConfig::default() },
                max_regenerations: 0,
                ..GeneratorConfig::default()
            };
            let dungeon = generate_dungeon(&registry, &phrase, seed, config)
                .map_err(|error| TestCaseError::fail(error.to_string()))?;
            for (_, bounds) in dungeon.blueprint.placed_rooms() {
                let inside = bounds.x >= -bound
                    && bounds.y >= -bound
                    && bounds.right() <= bound
                    && bounds.bottom() <= bound;
                if !inside {
                    return Err(TestCaseError::fail(format!("{bounds:?} escapes bound {bound}")));
                }
            }
            dungeon
                .blueprint
                .verify(1)
                .map_err(|violation| TestCaseError::fail(format!("seed {seed}: {violation}")))?;
            Ok(())
        })
        .expect("bounded layouts should hold their invariants");
}
