use rand::Rng;
use std::fmt;

/// Largest supported board dimension.
pub const MAX_DIM: usize = 12;
const MAX_CELLS: usize = MAX_DIM * MAX_DIM;

/// Tiles placed on a freshly constructed board.
pub const INITIAL_TILES: usize = 2;

/// Stored exponent of a tile; `0` is an empty cell.
pub type Power = u8;
pub type Score = u64;
/// `(row, col)` of a cell.
pub type Coord = (usize, usize);

/// A direction to move/merge tiles.
///
/// Enumeration order (`Action::ALL`) is Left, Up, Right, Down; searches
/// break ties in favour of the earlier action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Up,
    Right,
    Down,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Left, Action::Up, Action::Right, Action::Down];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Action::Left => 0,
            Action::Up => 1,
            Action::Right => 2,
            Action::Down => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Left => "left",
            Action::Up => "up",
            Action::Right => "right",
            Action::Down => "down",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of actions, kept as a bitmask so availability checks never allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const EMPTY: ActionSet = ActionSet(0);

    #[inline]
    pub fn insert(&mut self, action: Action) { self.0 |= 1 << action.index(); }

    #[inline]
    pub fn contains(self, action: Action) -> bool { self.0 & (1 << action.index()) != 0 }

    #[inline]
    pub fn len(self) -> usize { self.0.count_ones() as usize }

    #[inline]
    pub fn is_empty(self) -> bool { self.0 == 0 }

    /// Iterate in `Action::ALL` order.
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |&a| self.contains(a))
    }

    /// Pick one member uniformly at random.
    pub fn choose<R: Rng + ?Sized>(self, rng: &mut R) -> Option<Action> {
        if self.is_empty() {
            return None;
        }
        let nth = rng.gen_range(0..self.len());
        self.iter().nth(nth)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("board size {size} outside supported range 2..={max}")]
    InvalidSize { size: usize, max: usize },
    #[error("merge arity must be at least 2, got {0}")]
    InvalidArity(u32),
    #[error("spawn count must be at least 1, got {0}")]
    InvalidSpawnCount(usize),
    #[error("grid has {got} cells, expected {expected}")]
    GridShape { expected: usize, got: usize },
    #[error("cell ({row}, {col}) is outside a {size}x{size} board")]
    CoordOutOfBounds { row: usize, col: usize, size: usize },
    #[error("tile power {power} does not fit a board with merge arity {arity}")]
    InvalidPower { power: Power, arity: u32 },
    #[error("action `{0}` does not change the board")]
    InvalidAction(Action),
}

/// Game parameters: board dimension `n`, merge arity `t`, spawn count `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameConfig {
    pub size: usize,
    pub arity: u32,
    pub spawn_count: usize,
}

impl Default for GameConfig {
    fn default() -> Self { Self { size: 4, arity: 2, spawn_count: 1 } }
}

impl GameConfig {
    pub fn new(size: usize, arity: u32, spawn_count: usize) -> Result<Self, EngineError> {
        let cfg = Self { size, arity, spawn_count };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(2..=MAX_DIM).contains(&self.size) {
            return Err(EngineError::InvalidSize { size: self.size, max: MAX_DIM });
        }
        if self.arity < 2 {
            return Err(EngineError::InvalidArity(self.arity));
        }
        if self.spawn_count == 0 {
            return Err(EngineError::InvalidSpawnCount(self.spawn_count));
        }
        Ok(())
    }
}

/// Face value `t^power` of a tile, saturating at `u64::MAX`.
#[inline]
pub fn tile_value(arity: u32, power: Power) -> Score {
    (arity as u64).saturating_pow(power as u32)
}

/// A cell may hold `power` only if the tile it merges into still has a face
/// value that fits in a [`Score`].
pub fn check_power(arity: u32, power: Power) -> Result<(), EngineError> {
    match power.checked_add(1).and_then(|next| (arity as u64).checked_pow(next as u32)) {
        Some(_) => Ok(()),
        None => Err(EngineError::InvalidPower { power, arity }),
    }
}

/// An `n x n` board of tile powers plus the running score.
///
/// Cells live in a flat fixed-size buffer, so a `Board` is `Copy` and cloning
/// it for a search branch is a plain memcpy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Power; MAX_CELLS],
    config: GameConfig,
    score: Score,
}

impl Board {
    /// An empty board with score 0 and no tiles.
    pub fn empty(config: GameConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Board { cells: [0; MAX_CELLS], config, score: 0 })
    }

    /// Construct a board and place the two starting tiles.
    ///
    /// ```
    /// use gen_2048::engine::{Board, GameConfig};
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let b = Board::new(GameConfig::default(), &mut rng).unwrap();
    /// assert_eq!(b.empty_count(), 14);
    /// assert_eq!(b.score(), 0);
    /// ```
    pub fn new<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Result<Self, EngineError> {
        let mut board = Board::empty(config)?;
        for _ in 0..INITIAL_TILES {
            board.spawn_random_tile(rng);
        }
        Ok(board)
    }

    /// Build a board from row-major powers and a starting score. Every power
    /// must pass [`check_power`].
    ///
    /// ```
    /// use gen_2048::engine::{Board, GameConfig};
    /// let cfg = GameConfig::new(2, 2, 1).unwrap();
    /// let b = Board::from_grid(cfg, &[1, 1, 0, 0], 10).unwrap();
    /// assert_eq!(b.score(), 10);
    /// assert!(Board::from_grid(cfg, &[1, 1, 0], 0).is_err());
    /// ```
    pub fn from_grid(config: GameConfig, grid: &[Power], score: Score) -> Result<Self, EngineError> {
        let mut board = Board::empty(config)?;
        let expected = config.size * config.size;
        if grid.len() != expected {
            return Err(EngineError::GridShape { expected, got: grid.len() });
        }
        for &p in grid {
            check_power(config.arity, p)?;
        }
        board.cells[..expected].copy_from_slice(grid);
        board.score = score;
        Ok(board)
    }

    #[inline]
    pub fn config(&self) -> GameConfig { self.config }

    #[inline]
    pub fn size(&self) -> usize { self.config.size }

    #[inline]
    pub fn arity(&self) -> u32 { self.config.arity }

    #[inline]
    pub fn spawn_count(&self) -> usize { self.config.spawn_count }

    /// Cumulative merge reward.
    #[inline]
    pub fn score(&self) -> Score { self.score }

    /// Row-major view of the grid.
    #[inline]
    pub fn cells(&self) -> &[Power] { &self.cells[..self.size() * self.size()] }

    pub fn cell_power(&self, (row, col): Coord) -> Option<Power> {
        let n = self.size();
        (row < n && col < n).then(|| self.cells[row * n + col])
    }

    /// Overwrite one cell. Used to materialize a specific spawn outcome on a
    /// copied board; never part of normal play. Rejects powers that fail
    /// [`check_power`].
    pub fn set_cell_power(&mut self, (row, col): Coord, power: Power) -> Result<(), EngineError> {
        let n = self.size();
        if row >= n || col >= n {
            return Err(EngineError::CoordOutOfBounds { row, col, size: n });
        }
        check_power(self.arity(), power)?;
        self.cells[row * n + col] = power;
        Ok(())
    }

    #[inline]
    pub(crate) fn place(&mut self, (row, col): Coord, power: Power) {
        let n = self.size();
        debug_assert!(row < n && col < n);
        self.cells[row * n + col] = power;
    }

    /// True if sliding in `action` would change at least one cell.
    pub fn is_action_available(&self, action: Action) -> bool {
        let n = self.size();
        let mut line = [0 as Power; MAX_DIM];
        (0..n).any(|idx| {
            self.read_line(action, idx, &mut line);
            line_can_move(&line[..n], self.arity())
        })
    }

    pub fn available_actions(&self) -> ActionSet {
        let mut set = ActionSet::EMPTY;
        for action in Action::ALL {
            if self.is_action_available(action) {
                set.insert(action);
            }
        }
        set
    }

    /// True if no action changes the board.
    ///
    /// ```
    /// use gen_2048::engine::{Board, GameConfig};
    /// let cfg = GameConfig::new(2, 2, 1).unwrap();
    /// assert!(Board::from_grid(cfg, &[1, 2, 2, 1], 0).unwrap().game_over());
    /// assert!(!Board::from_grid(cfg, &[1, 1, 2, 3], 0).unwrap().game_over());
    /// ```
    #[inline]
    pub fn game_over(&self) -> bool { Action::ALL.iter().all(|&a| !self.is_action_available(a)) }

    /// Slide/merge in `action`, then place `spawn_count` random tiles if the
    /// board changed. Returns the reward of this move (0 when unavailable).
    ///
    /// ```
    /// use gen_2048::engine::{Action, Board, GameConfig};
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let cfg = GameConfig::new(4, 2, 1).unwrap();
    /// let mut b = Board::from_grid(cfg, &[1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 0).unwrap();
    /// let mut rng = StdRng::seed_from_u64(1);
    /// assert_eq!(b.apply(Action::Left, &mut rng), 4);
    /// assert_eq!(b.score(), 4);
    /// assert_eq!(b.empty_count(), 14);
    /// ```
    pub fn apply<R: Rng + ?Sized>(&mut self, action: Action, rng: &mut R) -> Score {
        match self.slide(action) {
            Some(reward) => {
                for _ in 0..self.spawn_count() {
                    self.spawn_random_tile(rng);
                }
                reward
            }
            None => 0,
        }
    }

    /// Like [`Board::apply`] but fails on an unavailable action instead of
    /// silently doing nothing.
    pub fn try_apply<R: Rng + ?Sized>(&mut self, action: Action, rng: &mut R) -> Result<Score, EngineError> {
        if !self.is_action_available(action) {
            return Err(EngineError::InvalidAction(action));
        }
        Ok(self.apply(action, rng))
    }

    /// Slide/merge without spawning. Returns the reward (0 when unavailable).
    pub fn apply_without_spawn(&mut self, action: Action) -> Score { self.slide(action).unwrap_or(0) }

    /// The board after sliding in `action` (no spawn), or `None` if the
    /// action is unavailable.
    #[inline]
    pub fn shifted(&self, action: Action) -> Option<Board> {
        let mut next = *self;
        next.slide(action).map(|_| next)
    }

    /// Place one random tile (power 1 at 90%, power 2 at 10%) into a uniformly
    /// chosen empty cell. No-op on a full board.
    pub fn spawn_random_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Coord> {
        let empty = self.empty_count();
        if empty == 0 {
            return None;
        }
        let mut index = rng.gen_range(0..empty);
        let power = generate_random_power(rng);
        let n = self.size();
        for (idx, cell) in self.cells[..n * n].iter_mut().enumerate() {
            if *cell != 0 {
                continue;
            }
            if index == 0 {
                *cell = power;
                return Some((idx / n, idx % n));
            }
            index -= 1;
        }
        None
    }

    /// Empty cells in row-major order.
    pub fn spawn_points(&self) -> Vec<Coord> {
        let n = self.size();
        self.cells()
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p == 0)
            .map(|(idx, _)| (idx / n, idx % n))
            .collect()
    }

    #[inline]
    pub fn empty_count(&self) -> usize { self.cells().iter().filter(|&&p| p == 0).count() }

    /// Number of adjacent (4-neighbour) pairs of equal filled tiles.
    pub fn available_merge_count(&self) -> u32 {
        let n = self.size();
        let mut pairs = 0;
        for row in 0..n {
            for col in 0..n {
                let p = self.cells[row * n + col];
                if p == 0 {
                    continue;
                }
                // Right and down only: each pair is seen exactly once.
                if col + 1 < n && self.cells[row * n + col + 1] == p {
                    pairs += 1;
                }
                if row + 1 < n && self.cells[(row + 1) * n + col] == p {
                    pairs += 1;
                }
            }
        }
        pairs
    }

    /// Negated sum of power gaps between each tile and the nearest tile to
    /// its right and below (empty cells are skipped). Zero means smooth.
    pub fn smoothness(&self) -> i64 {
        let n = self.size();
        let mut total = 0i64;
        for row in 0..n {
            for col in 0..n {
                let p = self.cells[row * n + col];
                if p == 0 {
                    continue;
                }
                let right = (col + 1..n).map(|c| self.cells[row * n + c]).find(|&q| q != 0);
                let down = (row + 1..n).map(|r| self.cells[r * n + col]).find(|&q| q != 0);
                for q in right.into_iter().chain(down) {
                    total -= (p as i64 - q as i64).abs();
                }
            }
        }
        total
    }

    #[inline]
    pub fn max_power(&self) -> Power { self.cells().iter().copied().max().unwrap_or(0) }

    /// Face value of the largest tile, `t^max_power`.
    #[inline]
    pub fn max_tile(&self) -> Score { tile_value(self.arity(), self.max_power()) }

    fn slide(&mut self, action: Action) -> Option<Score> {
        let n = self.size();
        let arity = self.arity();
        let mut line = [0 as Power; MAX_DIM];
        let mut merged = [0 as Power; MAX_DIM];
        let mut reward = 0;
        let mut changed = false;
        for idx in 0..n {
            self.read_line(action, idx, &mut line);
            reward = merge_line(&line[..n], &mut merged[..n], arity).saturating_add(reward);
            if line[..n] != merged[..n] {
                changed = true;
                self.write_line(action, idx, &merged);
            }
        }
        if !changed {
            return None;
        }
        self.score = self.score.saturating_add(reward);
        Some(reward)
    }

    #[inline]
    fn read_line(&self, action: Action, idx: usize, out: &mut [Power; MAX_DIM]) {
        let n = self.size();
        for (pos, slot) in out[..n].iter_mut().enumerate() {
            *slot = self.cells[cell_index(n, action, idx, pos)];
        }
    }

    #[inline]
    fn write_line(&mut self, action: Action, idx: usize, line: &[Power; MAX_DIM]) {
        let n = self.size();
        for (pos, &p) in line[..n].iter().enumerate() {
            self.cells[cell_index(n, action, idx, pos)] = p;
        }
    }
}

/// Map position `pos` of line `idx` (position 0 is the edge tiles move
/// towards) to a flat cell index.
#[inline(always)]
fn cell_index(n: usize, action: Action, idx: usize, pos: usize) -> usize {
    match action {
        Action::Left => idx * n + pos,
        Action::Right => idx * n + (n - 1 - pos),
        Action::Up => pos * n + idx,
        Action::Down => (n - 1 - pos) * n + idx,
    }
}

/// Compact `line` towards index 0, merging every run of `arity` equal tiles
/// into one tile of the next power. Writes the result into `out` and returns
/// the reward.
pub(crate) fn merge_line(line: &[Power], out: &mut [Power], arity: u32) -> Score {
    debug_assert_eq!(line.len(), out.len());
    let mut write = 0;
    let mut run_value: Power = 0;
    let mut run_len = 0u32;
    let mut reward = 0;
    for &p in line {
        if p == 0 {
            continue;
        }
        if p == run_value {
            run_len += 1;
            if run_len == arity {
                out[write] = p + 1;
                write += 1;
                reward = tile_value(arity, p + 1).saturating_add(reward);
                run_value = 0;
                run_len = 0;
            }
        } else {
            for _ in 0..run_len {
                out[write] = run_value;
                write += 1;
            }
            run_value = p;
            run_len = 1;
        }
    }
    for _ in 0..run_len {
        out[write] = run_value;
        write += 1;
    }
    out[write..].fill(0);
    reward
}

/// True iff [`merge_line`] would change `line`: a gap precedes a tile, or
/// `arity` equal tiles sit next to each other once gaps are removed.
pub(crate) fn line_can_move(line: &[Power], arity: u32) -> bool {
    let mut seen_empty = false;
    let mut prev: Power = 0;
    let mut run_len = 0u32;
    for &p in line {
        if p == 0 {
            seen_empty = true;
            continue;
        }
        if seen_empty {
            return true;
        }
        if p == prev {
            run_len += 1;
            if run_len == arity {
                return true;
            }
        } else {
            prev = p;
            run_len = 1;
        }
    }
    false
}

fn generate_random_power<R: Rng + ?Sized>(rng: &mut R) -> Power { if rng.gen_range(0..10) < 9 { 1 } else { 2 } }

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.size();
        let rows: Vec<&[Power]> = self.cells().chunks(n).collect();
        f.debug_struct("Board")
            .field("size", &n)
            .field("arity", &self.arity())
            .field("spawn_count", &self.spawn_count())
            .field("score", &self.score)
            .field("rows", &rows)
            .finish()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.size();
        let rule = "-".repeat(8 * n + 1);
        writeln!(f, "{rule}")?;
        for row in self.cells().chunks(n) {
            let cells: Vec<String> = row.iter().map(|&p| format_val(self.arity(), p)).collect();
            writeln!(f, "|{}|", cells.join("|"))?;
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

fn format_val(arity: u32, power: Power) -> String {
    match power {
        0 => String::from("       "),
        p => format!("{:>7}", tile_value(arity, p)),
    }
}
