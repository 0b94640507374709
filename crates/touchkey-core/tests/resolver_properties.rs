//! Property-style tests for the touch resolver, sweeping every pixel column
//! of a compiled row rather than a handful of hand-picked points.

use touchkey_core::{KeyElement, KeyRect, TouchFrame, TouchResolver};

const KEY_WIDTH: u32 = 80;
const KEY_COUNT: usize = 8;
const TOP: i32 = 200;
const HEIGHT: u32 = 100;

fn layout() -> Vec<KeyElement> {
    (0..KEY_COUNT)
        .map(|kflag| KeyElement {
            kflag,
            rect: KeyRect {
                left: 20 + kflag as i32 * KEY_WIDTH as i32,
                top: TOP,
                width: KEY_WIDTH,
                height: HEIGHT,
            },
        })
        .collect()
}

fn single_touch(resolver: &mut TouchResolver, x: f64) -> Vec<usize> {
    resolver
        .compute_frame(&TouchFrame::from_points([(x, TOP as f64 + 50.0)]))
        .state
        .active()
        .collect()
}

#[test]
fn test_vector_length_is_key_count_for_every_column() {
    let mut resolver = TouchResolver::compile(&layout(), 800).unwrap();
    for x in 0..800 {
        let state = resolver
            .compute_frame(&TouchFrame::from_points([(x as f64 + 0.5, 250.0)]))
            .state;
        assert_eq!(state.len(), KEY_COUNT, "column {x}");
    }
}

#[test]
fn test_centre_zone_resolves_to_exactly_one_key() {
    let mut resolver = TouchResolver::compile(&layout(), 800).unwrap();
    for kflag in 0..KEY_COUNT {
        let left = 20.0 + (kflag as u32 * KEY_WIDTH) as f64;
        let quarter = KEY_WIDTH as f64 / 4.0;
        // Strictly between the two thresholds.
        for offset in [quarter + 0.5, KEY_WIDTH as f64 / 2.0, quarter * 3.0 - 0.5] {
            assert_eq!(
                single_touch(&mut resolver, left + offset),
                vec![kflag],
                "key {kflag} offset {offset}"
            );
        }
    }
}

#[test]
fn test_bias_zones_pair_with_the_matching_neighbour() {
    let mut resolver = TouchResolver::compile(&layout(), 800).unwrap();
    for kflag in 1..KEY_COUNT - 1 {
        let left = 20.0 + (kflag as u32 * KEY_WIDTH) as f64;
        assert_eq!(single_touch(&mut resolver, left + 1.0), vec![kflag - 1, kflag]);
        assert_eq!(
            single_touch(&mut resolver, left + KEY_WIDTH as f64 - 1.0),
            vec![kflag, kflag + 1]
        );
    }
}

#[test]
fn test_columns_outside_the_row_resolve_to_nothing() {
    let mut resolver = TouchResolver::compile(&layout(), 800).unwrap();
    assert!(single_touch(&mut resolver, 10.0).is_empty());
    assert!(single_touch(&mut resolver, 20.0 + (KEY_COUNT as u32 * KEY_WIDTH) as f64).is_empty());
}

#[test]
fn test_recompile_shift_moves_every_key() {
    // Arrange: shift the whole row 40 px to the right.
    let mut resolver = TouchResolver::compile(&layout(), 800).unwrap();
    let shifted: Vec<KeyElement> = layout()
        .into_iter()
        .map(|mut e| {
            e.rect.left += 40;
            e
        })
        .collect();

    // Act
    resolver.recompile(&shifted, 800).unwrap();

    // Assert: the column that used to be key 0's centre is now its left bias
    // zone, which has no previous key.
    assert_eq!(single_touch(&mut resolver, 60.0), vec![0]);
    assert!(single_touch(&mut resolver, 40.0).is_empty());
}
