//! Test fixtures and helpers.
//!
//! Pre-built grids, units and battles, plus random sources that make hit
//! rolls either reproducible or fully scripted.

use rand::{Error, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tactics_core::battle::Battle;
use tactics_core::config::RulesConfig;
use tactics_core::coord::Coord;
use tactics_core::element::Element;
use tactics_core::events::EventLog;
use tactics_core::grid::Grid;
use tactics_core::topping::{HazardField, Obstacle, OilSlick, Topping};
use tactics_core::unit::{Team, UnitSpawnParams};

/// Grid with weight 1 everywhere.
#[must_use]
pub fn uniform_grid(width: u32, height: u32) -> Grid {
    Grid::new(width, height, 1)
}

/// Build a grid from an ASCII map.
///
/// Rows are listed top first, so the last row is `y = 0`. Legend:
///
/// | char | tile |
/// |------|------|
/// | `.` | weight 1 |
/// | `1`-`9` | that weight |
/// | `#` | weight 0 (impassable) |
/// | `O` | weight 1 with an [`Obstacle`] |
/// | `H` | weight 1 with a [`HazardField`] |
/// | `~` | weight 1 with an [`OilSlick`] |
///
/// # Panics
///
/// Panics on ragged rows or unknown characters.
#[must_use]
pub fn grid_from_rows(rows: &[&str]) -> Grid {
    let height = rows.len();
    let width = rows.first().map_or(0, |row| row.chars().count());
    assert!(
        rows.iter().all(|row| row.chars().count() == width),
        "ragged map rows"
    );

    let mut weights = vec![1u32; width * height];
    let mut toppings: Vec<(Coord, Topping)> = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        let y = height - 1 - row_index;
        for (x, ch) in row.chars().enumerate() {
            let coord = Coord::new(x as i32, y as i32);
            let weight = match ch {
                '.' => 1,
                '#' => 0,
                'O' => {
                    toppings.push((coord, Obstacle.into()));
                    1
                }
                'H' => {
                    toppings.push((coord, HazardField::default().into()));
                    1
                }
                '~' => {
                    toppings.push((coord, OilSlick::default().into()));
                    1
                }
                digit @ '1'..='9' => digit.to_digit(10).unwrap_or(1),
                other => panic!("unknown map character {other:?}"),
            };
            weights[y * width + x] = weight;
        }
    }

    let mut grid = Grid::from_weights(width as u32, height as u32, weights)
        .unwrap_or_else(|err| panic!("{err}"));
    for (coord, topping) in toppings {
        grid.place_topping(coord, topping)
            .unwrap_or_else(|err| panic!("{err}"));
    }
    grid
}

/// Spawn parameters for a plain unit: 10 health, attack 0, 4 movement.
#[must_use]
pub fn unit_at(team: Team, x: i32, y: i32) -> UnitSpawnParams {
    UnitSpawnParams {
        name: format!("{team:?} ({x}, {y})"),
        team,
        element: Element::Neutral,
        max_health: 10,
        attack: 0,
        movement: 4,
        position: Coord::new(x, y),
    }
}

/// Spawn parameters with explicit combat stats.
#[must_use]
pub fn fighter_at(team: Team, x: i32, y: i32, max_health: i32, attack: u32) -> UnitSpawnParams {
    UnitSpawnParams {
        max_health,
        attack,
        ..unit_at(team, x, y)
    }
}

/// Battle with default rules and an in-memory event log.
#[must_use]
pub fn battle_on(grid: Grid) -> Battle<EventLog> {
    Battle::new(grid, RulesConfig::default(), EventLog::new())
}

/// Reproducible RNG for tests.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// RNG that replays a fixed sequence of `u32` values, cycling forever.
///
/// Hit rolls use the 32 bits as a fraction of one, so `0` always hits and
/// `u32::MAX` misses anything below a 100% hit chance.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<u32>,
    cursor: usize,
}

impl ScriptedRng {
    /// Replay `values` in order.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        assert!(!values.is_empty(), "ScriptedRng needs at least one value");
        Self { values, cursor: 0 }
    }

    /// Every roll is the lowest possible sample.
    #[must_use]
    pub fn always_hit() -> Self {
        Self::new(vec![0])
    }

    /// Every roll is the highest possible sample.
    #[must_use]
    pub fn always_miss() -> Self {
        Self::new(vec![u32::MAX])
    }

    /// Every roll sits just above `percent`% of the range.
    #[must_use]
    pub fn just_above(percent: u8) -> Self {
        let bits = (u64::from(percent.min(99)) << 32) / 100 + 1;
        Self::new(vec![u32::try_from(bits).unwrap_or(u32::MAX)])
    }

    /// Number of values drawn so far.
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.cursor
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }

    fn next_u64(&mut self) -> u64 {
        let low = u64::from(self.next_u32());
        let high = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
