//! Property tests for pathfinding, range costs and topping propagation.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use proptest::prelude::*;
use tactics_core::prelude::*;
use tactics_core::topping::linked_toppings;
use tactics_test_utils::determinism::strategies::{
    arb_coord, arb_cost_grid, arb_cost_grid_with_endpoints, arb_dimensions, arb_topping_grid,
};
use tactics_test_utils::fixtures::{battle_on, fighter_at, uniform_grid, ScriptedRng};

/// Plain Dijkstra over four-way moves, used as ground truth.
fn reference_costs(costs: &CostGrid, origin: Coord) -> Vec<Option<u32>> {
    let width = costs.width() as i32;
    let index = |c: Coord| (c.y * width + c.x) as usize;

    let mut dist = vec![None; (costs.width() * costs.height()) as usize];
    let mut heap = BinaryHeap::new();
    dist[index(origin)] = Some(0);
    heap.push(Reverse((0u32, origin)));

    while let Some(Reverse((d, coord))) = heap.pop() {
        if dist[index(coord)].is_some_and(|best| d > best) {
            continue;
        }
        for neighbor in coord.cardinal_neighbors() {
            let Some(weight) = costs.weight(neighbor) else {
                continue;
            };
            if weight == 0 {
                continue;
            }
            let next = d + weight;
            if dist[index(neighbor)].map_or(true, |best| next < best) {
                dist[index(neighbor)] = Some(next);
                heap.push(Reverse((next, neighbor)));
            }
        }
    }
    dist
}

proptest! {
    #[test]
    fn prop_open_grid_path_is_manhattan(
        (width, height) in arb_dimensions(12),
        seed in any::<(u32, u32, u32, u32)>(),
    ) {
        let start = Coord::new((seed.0 % width) as i32, (seed.1 % height) as i32);
        let goal = Coord::new((seed.2 % width) as i32, (seed.3 % height) as i32);
        let pathfinder = Pathfinder::new(CostGrid::uniform(width, height, 1), PathfinderConfig::default());

        let path = pathfinder.find_path(start, goal).unwrap();
        prop_assert_eq!(path.steps(), start.manhattan_distance(goal) as usize);
        prop_assert_eq!(path.cost, start.manhattan_distance(goal));
    }

    #[test]
    fn prop_open_grid_eight_way_path_is_chebyshev(
        (width, height) in arb_dimensions(12),
        seed in any::<(u32, u32, u32, u32)>(),
    ) {
        let start = Coord::new((seed.0 % width) as i32, (seed.1 % height) as i32);
        let goal = Coord::new((seed.2 % width) as i32, (seed.3 % height) as i32);
        let config = PathfinderConfig {
            movement: MovementModel::EightWay,
            heuristic: Heuristic::MaxDxDy,
            ..PathfinderConfig::default()
        };
        let pathfinder = Pathfinder::new(CostGrid::uniform(width, height, 1), config);

        let path = pathfinder.find_path(start, goal).unwrap();
        prop_assert_eq!(path.steps(), start.chebyshev_distance(goal) as usize);
    }

    #[test]
    fn prop_path_is_contiguous_and_avoids_walls((costs, start, goal) in arb_cost_grid_with_endpoints(10)) {
        let pathfinder = Pathfinder::new(costs.clone(), PathfinderConfig::default());
        if let Ok(path) = pathfinder.find_path(start, goal) {
            prop_assert_eq!(path.tiles.first().copied(), Some(start));
            prop_assert_eq!(path.tiles.last().copied(), Some(goal));
            for pair in path.tiles.windows(2) {
                prop_assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
            }
            for &tile in path.tiles.iter().skip(1) {
                prop_assert!(costs.weight(tile).is_some_and(|w| w > 0));
            }
            prop_assert_eq!(path.cost, pathfinder.path_cost(&path.tiles));
        }
    }

    #[test]
    fn prop_astar_matches_dijkstra((costs, start, goal) in arb_cost_grid_with_endpoints(8)) {
        let pathfinder = Pathfinder::new(costs.clone(), PathfinderConfig::default());
        let width = costs.width() as i32;
        let expected = reference_costs(&costs, start)[(goal.y * width + goal.x) as usize];

        match pathfinder.find_path(start, goal) {
            Ok(path) => prop_assert_eq!(Some(path.cost), expected),
            Err(err) => {
                prop_assert_eq!(err, PathError::NotFound);
                prop_assert_eq!(expected, None);
            }
        }
    }

    #[test]
    fn prop_range_costs_match_dijkstra(
        (costs, origin) in arb_cost_grid(10).prop_flat_map(|costs| {
            let (w, h) = (costs.width(), costs.height());
            (Just(costs), arb_coord(w, h))
        }),
        range in 0u32..12,
    ) {
        let pathfinder = Pathfinder::new(costs.clone(), PathfinderConfig::default());
        let matrix = pathfinder.range_costs(origin, range).unwrap();
        let reference = reference_costs(&costs, origin);

        for y in 0..costs.height() as i32 {
            for x in 0..costs.width() as i32 {
                let coord = Coord::new(x, y);
                let expected = reference[(y * costs.width() as i32 + x) as usize]
                    .filter(|&d| d <= range)
                    .unwrap_or(CostMatrix::UNREACHABLE);
                prop_assert_eq!(matrix.get(coord), Some(expected), "at {}", coord);
            }
        }
    }

    #[test]
    fn prop_flood_fill_visits_each_tile_once(
        (grid, origin) in arb_topping_grid(10).prop_flat_map(|grid| {
            let (w, h) = (grid.width(), grid.height());
            (Just(grid), arb_coord(w, h))
        }),
        fire in any::<bool>(),
    ) {
        let element = if fire { Element::Fire } else { Element::Neutral };
        let triggered = linked_toppings(&grid, origin, element);

        let unique: HashSet<Coord> = triggered.iter().map(|t| t.coord).collect();
        prop_assert_eq!(unique.len(), triggered.len());
        prop_assert!(triggered.len() <= (grid.width() * grid.height()) as usize);

        for t in &triggered {
            prop_assert_eq!(grid.topping_at(t.coord).map(|p| p.id), Some(t.id));
        }
        if let Some(first) = triggered.first() {
            prop_assert_eq!(first.coord, origin);
        }
    }

    #[test]
    fn prop_permission_is_consumed_once(bits in any::<u32>(), hit_chance in 0u8..=100) {
        let mut battle = battle_on(uniform_grid(3, 3));
        let attacker = battle.spawn_unit(fighter_at(Team::Player, 0, 0, 10, 1)).unwrap();
        battle.spawn_unit(fighter_at(Team::Ai, 1, 0, 10, 0)).unwrap();

        let jab = Attack::melee("Jab", 1, 1).with_hit_percent(hit_chance);
        let mut rng = ScriptedRng::new(vec![bits]);

        prop_assert!(battle.execute_attack(attacker, Coord::new(1, 0), &jab, &mut rng).is_some());
        prop_assert!(!battle.unit(attacker).unwrap().can_attack);
        prop_assert!(battle.execute_attack(attacker, Coord::new(1, 0), &jab, &mut rng).is_none());
        prop_assert_eq!(rng.draws(), 1);
    }
}
