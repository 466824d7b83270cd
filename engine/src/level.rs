use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Cell, Point};
use crate::entities::EntityRegistry;
use crate::game::Direction;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("malformed dimensions: {0}")]
    MalformedDimensions(String),
    #[error("unknown cell symbol {symbol:?} at ({row}, {col})")]
    UnknownCellSymbol { row: usize, col: usize, symbol: char },
    #[error("row {row} has {found} cells, expected {expected}")]
    RowLength { row: usize, expected: usize, found: usize },
    #[error("{crates} crates but {destinations} destinations")]
    CrateDestinationCountMismatch { crates: usize, destinations: usize },
    #[error("player start ({row}, {col}) is not a free floor cell")]
    PlayerOnInvalidCell { row: usize, col: usize },
    #[error("level has no player start")]
    MissingPlayer,
    #[error("level has more than one player start")]
    MultiplePlayers,
    #[error("malformed player start line: {0}")]
    MalformedStart(String),
    #[error("reading level: {0}")]
    Io(#[from] std::io::Error),
}

/// A level in its text form, before validation.
///
/// ```text
/// 3 6
/// ######
/// #pc x#
/// ######
/// ```
///
/// The header gives `rows cols`; each board line uses ` ` empty, `#` wall,
/// `c` crate, `x` destination, `g` crate on destination, `p` player. An
/// optional trailing `x y` line (column first) names the player start explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub text: String,
}

/// Everything the session needs to start playing a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadedLevel {
    pub name: String,
    pub board: Board,
    pub entities: EntityRegistry,
    pub player_start: Point,
    pub facing: Direction,
}

impl Level {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }

    /// Reads a level file; the file stem becomes the level name.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Level, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "level".to_string());
        Ok(Level { name, text })
    }

    pub fn load(&self) -> Result<LoadedLevel, LoadError> {
        let loaded = parse(&self.name, &self.text)?;
        log::info!(
            "loaded level {:?}: {}x{} with {} crates",
            loaded.name,
            loaded.board.dimensions().0,
            loaded.board.dimensions().1,
            loaded.entities.crates().len()
        );
        Ok(loaded)
    }
}

fn parse_pair(line: &str) -> Option<(i64, i64)> {
    let mut it = line.split_whitespace().map(str::parse::<i64>);
    match (it.next(), it.next(), it.next()) {
        (Some(Ok(a)), Some(Ok(b)), None) => Some((a, b)),
        _ => None,
    }
}

fn parse(name: &str, text: &str) -> Result<LoadedLevel, LoadError> {
    let mut lines = text.lines();
    let header = lines.next().unwrap_or("");
    let (rows, cols) = parse_pair(header)
        .ok_or_else(|| LoadError::MalformedDimensions(format!("expected `rows cols`, got {header:?}")))?;
    if rows <= 0 || cols <= 0 {
        return Err(LoadError::MalformedDimensions(format!("{rows}x{cols}")));
    }
    let (rows, cols) = (rows as usize, cols as usize);

    let mut cells = Vec::with_capacity(rows.saturating_mul(cols).min(text.len()));
    let mut crates = Vec::new();
    let mut destinations = Vec::new();
    let mut marked_start = None;
    for row in 0..rows {
        let line = lines.next().unwrap_or("");
        let found = line.chars().count();
        if found != cols {
            return Err(LoadError::RowLength { row, expected: cols, found });
        }
        for (col, symbol) in line.chars().enumerate() {
            let here = Point::new(row, col);
            let cell = match symbol {
                ' ' => Cell::Empty,
                '#' => Cell::Wall,
                'x' => {
                    destinations.push(here);
                    Cell::Destination
                }
                'c' => {
                    crates.push(here);
                    Cell::Empty
                }
                'g' => {
                    crates.push(here);
                    destinations.push(here);
                    Cell::Destination
                }
                'p' => {
                    if marked_start.replace(here).is_some() {
                        return Err(LoadError::MultiplePlayers);
                    }
                    Cell::Empty
                }
                other => return Err(LoadError::UnknownCellSymbol { row, col, symbol: other }),
            };
            cells.push(cell);
        }
    }

    let mut trailing = lines.filter(|l| !l.trim().is_empty());
    let explicit_start = match trailing.next() {
        None => None,
        Some(line) => {
            let (x, y) = parse_pair(line).ok_or_else(|| LoadError::MalformedStart(line.to_string()))?;
            if let Some(extra) = trailing.next() {
                return Err(LoadError::MalformedStart(format!("unexpected trailing line {extra:?}")));
            }
            if x < 0 || y < 0 || y as usize >= rows || x as usize >= cols {
                return Err(LoadError::PlayerOnInvalidCell { row: y.max(0) as usize, col: x.max(0) as usize });
            }
            Some(Point::new(y as usize, x as usize))
        }
    };

    let player_start = match (marked_start, explicit_start) {
        (Some(a), Some(b)) if a != b => return Err(LoadError::MultiplePlayers),
        (Some(p), _) | (None, Some(p)) => p,
        (None, None) => return Err(LoadError::MissingPlayer),
    };

    let board = Board::new(rows, cols, cells)?;
    let entities = EntityRegistry::new(crates, destinations)?;
    if board.is_wall(player_start) || entities.crate_at(player_start).is_some() {
        return Err(LoadError::PlayerOnInvalidCell { row: player_start.row, col: player_start.col });
    }

    Ok(LoadedLevel { name: name.to_string(), board, entities, player_start, facing: Direction::Down })
}

/// A tiny static level useful for tests/examples.
#[derive(Clone, Debug)]
pub struct SimpleLevel;

impl SimpleLevel {
    /// One push up solves it:
    /// ```text
    /// #####
    /// # x #
    /// # c #
    /// # p #
    /// #####
    /// ```
    pub fn build() -> Level {
        Level::new("simple", "5 5\n#####\n# x #\n# c #\n# p #\n#####\n")
    }
}

/// Tiny deterministic RNG to support seed-based level generation without external deps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LcgRng { state: u64 }

impl LcgRng {
    pub fn new(seed: u64) -> Self { Self { state: seed } }
    #[inline]
    fn step(&mut self) { self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407); }
    pub fn next_u32(&mut self) -> u32 { self.step(); (self.state >> 32) as u32 }
    pub fn gen_range(&mut self, upper: usize) -> usize { if upper == 0 { 0 } else { (self.next_u32() as usize) % upper } }
}

impl Level {
    /// Deterministically generate a walled room with one player and up to
    /// `num_crates` crate/destination pairs on distinct free cells. Crates never
    /// start on a destination.
    pub fn from_seed(width: usize, height: usize, num_crates: usize, seed: u64) -> Level {
        let mut grid = vec![vec![' '; width]; height];
        for (y, row) in grid.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    *cell = '#';
                }
            }
        }
        let mut free: Vec<(usize, usize)> = Vec::new();
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                free.push((x, y));
            }
        }
        let mut rng = LcgRng::new(seed);
        // Each pair needs two cells and the player one more.
        let pairs = num_crates.min(free.len().saturating_sub(1) / 2);
        for symbol in std::iter::repeat('x').take(pairs).chain(std::iter::repeat('c').take(pairs)) {
            let (x, y) = free.swap_remove(rng.gen_range(free.len()));
            grid[y][x] = symbol;
        }
        if !free.is_empty() {
            let (x, y) = free.swap_remove(rng.gen_range(free.len()));
            grid[y][x] = 'p';
        }
        let mut text = format!("{height} {width}\n");
        for row in grid {
            text.extend(row);
            text.push('\n');
        }
        Level::new(format!("seed-{seed}"), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbols_into_terrain_and_entities() {
        let lvl = Level::new("t", "3 6\n######\n#pcxg#\n######\n").load().unwrap();
        assert_eq!(lvl.board.dimensions(), (3, 6));
        assert_eq!(lvl.player_start, Point::new(1, 1));
        assert_eq!(lvl.facing, Direction::Down);
        assert_eq!(lvl.board.cell_at(Point::new(1, 2)).unwrap(), Cell::Empty);
        assert_eq!(lvl.board.cell_at(Point::new(1, 3)).unwrap(), Cell::Destination);
        assert_eq!(lvl.board.cell_at(Point::new(1, 4)).unwrap(), Cell::Destination);
        let crates = lvl.entities.crates();
        assert_eq!(crates.len(), 2);
        assert_eq!(crates[0].position, Point::new(1, 2));
        assert!(!crates[0].on_target);
        assert_eq!(crates[1].position, Point::new(1, 4));
        assert!(crates[1].on_target);
        assert_eq!(lvl.entities.destinations(), &[Point::new(1, 3), Point::new(1, 4)]);
    }

    #[test]
    fn explicit_start_line() {
        let lvl = Level::new("t", "3 5\n#####\n#c x#\n#####\n2 1\n").load().unwrap();
        assert_eq!(lvl.player_start, Point::new(1, 2));
    }

    #[test]
    fn start_line_is_column_first() {
        let lvl = Level::new("t", "4 5\n#####\n#   #\n#cx #\n#####\n3 1\n").load().unwrap();
        assert_eq!(lvl.player_start, Point::new(1, 3));
        // Row-first reading would land on the crate at (2, 1).
        let lvl = Level::new("t", "4 5\n#####\n#   #\n#cx #\n#####\n1 2\n").load();
        assert!(matches!(lvl, Err(LoadError::PlayerOnInvalidCell { row: 2, col: 1 })));
    }

    #[test]
    fn agreeing_marker_and_start_line_are_accepted() {
        let lvl = Level::new("t", "3 5\n#####\n#cpx#\n#####\n2 1").load().unwrap();
        assert_eq!(lvl.player_start, Point::new(1, 2));
        let err = Level::new("t", "3 5\n#####\n#cpx#\n#####\n3 1").load().unwrap_err();
        assert!(matches!(err, LoadError::MultiplePlayers));
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let lvl = Level::new("t", "3 5\r\n#####\r\n#pcx#\r\n#####\r\n").load().unwrap();
        assert_eq!(lvl.entities.crates().len(), 1);
    }

    #[test]
    fn load_failures() {
        let cases: &[(&str, fn(&LoadError) -> bool)] = &[
            ("", |e| matches!(e, LoadError::MalformedDimensions(_))),
            ("0 4\n", |e| matches!(e, LoadError::MalformedDimensions(_))),
            ("two three\n", |e| matches!(e, LoadError::MalformedDimensions(_))),
            ("1 3\n#p?\n", |e| matches!(e, LoadError::UnknownCellSymbol { row: 0, col: 2, symbol: '?' })),
            ("2 3\n#p#\n##\n", |e| matches!(e, LoadError::RowLength { row: 1, expected: 3, found: 2 })),
            ("1 4\npcc \n", |e| matches!(e, LoadError::CrateDestinationCountMismatch { crates: 2, destinations: 0 })),
            ("1 3\n cx\n", |e| matches!(e, LoadError::MissingPlayer)),
            ("1 4\nppcx\n", |e| matches!(e, LoadError::MultiplePlayers)),
            ("1 3\n#cx\n0 0\n", |e| matches!(e, LoadError::PlayerOnInvalidCell { row: 0, col: 0 })),
            ("1 3\n#cx\n1 0\n", |e| matches!(e, LoadError::PlayerOnInvalidCell { row: 0, col: 1 })),
            ("1 3\n cx\n0 1\n", |e| matches!(e, LoadError::PlayerOnInvalidCell { row: 1, col: 0 })),
            ("1 3\n cx\n0 7\n", |e| matches!(e, LoadError::PlayerOnInvalidCell { .. })),
            ("1 3\n cx\nzero\n", |e| matches!(e, LoadError::MalformedStart(_))),
            ("1 3\n cx\n0 0\n0 0\n", |e| matches!(e, LoadError::MalformedStart(_))),
        ];
        for (text, check) in cases {
            let err = Level::new("bad", *text).load().unwrap_err();
            assert!(check(&err), "{text:?} gave {err:?}");
        }
    }

    #[test]
    fn simple_level_loads() {
        let lvl = SimpleLevel::build().load().unwrap();
        assert_eq!(lvl.player_start, Point::new(3, 2));
        assert_eq!(lvl.entities.crates()[0].position, Point::new(2, 2));
        assert_eq!(lvl.entities.destinations(), &[Point::new(1, 2)]);
    }

    #[test]
    fn seeded_levels_are_deterministic_and_valid() {
        let a = Level::from_seed(7, 6, 2, 42);
        let b = Level::from_seed(7, 6, 2, 42);
        assert_eq!(a, b);
        let lvl = a.load().unwrap();
        assert_eq!(lvl.board.dimensions(), (6, 7));
        assert_eq!(lvl.entities.crates().len(), 2);
        assert_eq!(lvl.entities.crates_on_target(), 0);
    }

    #[test]
    fn seeded_level_caps_crates_to_free_space() {
        // 3x3 room has a single free cell: only the player fits.
        let lvl = Level::from_seed(3, 3, 4, 1).load().unwrap();
        assert_eq!(lvl.entities.crates().len(), 0);
        assert_eq!(lvl.player_start, Point::new(1, 1));
    }
}
