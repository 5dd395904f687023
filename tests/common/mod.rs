// Not every test binary exercises every game
#![allow(dead_code)]

use tierbase::{Game, Move, Position, Tier, TierPosition, Value};

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

const X: u8 = 1;
const O: u8 = 2;

/// 3x3 tic-tac-toe in a single tier of 3^9 positions, encoded base 3
/// (cell i is digit i; 0 empty, 1 X, 2 O). X moves first; whose turn it is
/// follows from the mark counts.
pub struct TicTacToe {
    /// Expose native parent enumeration, or make the solver build a
    /// reverse graph
    pub native_parents: bool,
}

impl TicTacToe {
    pub fn board(position: Position) -> [u8; 9] {
        let mut cells = [0u8; 9];
        let mut rest = position;

        for cell in &mut cells {
            *cell = (rest % 3) as u8;
            rest /= 3;
        }

        cells
    }

    pub fn position(cells: &[u8; 9]) -> Position {
        cells
            .iter()
            .rev()
            .fold(0, |acc, &cell| acc * 3 + i64::from(cell))
    }

    fn counts(cells: &[u8; 9]) -> (usize, usize) {
        let x = cells.iter().filter(|&&c| c == X).count();
        let o = cells.iter().filter(|&&c| c == O).count();
        (x, o)
    }

    fn has_line(cells: &[u8; 9], mark: u8) -> bool {
        LINES
            .iter()
            .any(|line| line.iter().all(|&i| cells[i] == mark))
    }

    fn mover(cells: &[u8; 9]) -> u8 {
        let (x, o) = Self::counts(cells);
        if x == o {
            X
        } else {
            O
        }
    }
}

impl Game for TicTacToe {
    fn name(&self) -> &str {
        "tictactoe"
    }

    fn variant(&self) -> &str {
        "default"
    }

    fn initial_tier(&self) -> Tier {
        0
    }

    fn tier_size(&self, _tier: Tier) -> Position {
        19_683
    }

    fn child_tiers(&self, _tier: Tier) -> Vec<Tier> {
        vec![]
    }

    fn is_legal(&self, position: TierPosition) -> bool {
        let cells = Self::board(position.position);
        let (x, o) = Self::counts(&cells);

        if x != o && x != o + 1 {
            return false;
        }

        let x_line = Self::has_line(&cells, X);
        let o_line = Self::has_line(&cells, O);

        // Lines belong to whoever moved last
        !(x_line && o_line) && !(x_line && x != o + 1) && !(o_line && x != o)
    }

    fn primitive(&self, position: TierPosition) -> Value {
        let cells = Self::board(position.position);
        let opponent = 3 - Self::mover(&cells);

        if Self::has_line(&cells, opponent) {
            return Value::Lose;
        }

        let (x, o) = Self::counts(&cells);

        if x + o == 9 {
            Value::Tie
        } else {
            Value::Undecided
        }
    }

    fn generate_moves(&self, position: TierPosition) -> Vec<Move> {
        let cells = Self::board(position.position);

        (0..9)
            .filter(|&i| cells[i as usize] == 0)
            .collect()
    }

    fn do_move(&self, position: TierPosition, mv: Move) -> TierPosition {
        let cells = Self::board(position.position);
        let mover = Self::mover(&cells);

        TierPosition::new(
            position.tier,
            position.position + i64::from(mover) * 3i64.pow(mv as u32),
        )
    }

    fn supports_canonical_parents(&self) -> bool {
        self.native_parents
    }

    fn canonical_parents(&self, child: TierPosition, parent_tier: Tier) -> Vec<Position> {
        let cells = Self::board(child.position);
        let (x, o) = Self::counts(&cells);

        if x + o == 0 {
            return vec![];
        }

        // The mark placed last belongs to the player who is not to move
        let last = if x == o { O } else { X };
        let mut parents = vec![];

        for i in 0..9 {
            if cells[i] != last {
                continue;
            }

            let parent = child.position - i64::from(last) * 3i64.pow(i as u32);
            let tp = TierPosition::new(parent_tier, parent);

            if self.is_legal(tp) && self.primitive(tp) == Value::Undecided {
                parents.push(parent);
            }
        }

        parents
    }
}

/// Two one-position tiers: tier 1 position 0 has a single move into tier 0
/// position 0, which is a primitive loss.
pub struct ChainGame;

impl Game for ChainGame {
    fn name(&self) -> &str {
        "chain"
    }

    fn variant(&self) -> &str {
        "default"
    }

    fn initial_tier(&self) -> Tier {
        1
    }

    fn tier_size(&self, _tier: Tier) -> Position {
        1
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        if tier == 1 {
            vec![0]
        } else {
            vec![]
        }
    }

    fn is_legal(&self, _position: TierPosition) -> bool {
        true
    }

    fn primitive(&self, position: TierPosition) -> Value {
        if position.tier == 0 {
            Value::Lose
        } else {
            Value::Undecided
        }
    }

    fn generate_moves(&self, position: TierPosition) -> Vec<Move> {
        if position.tier == 1 {
            vec![0]
        } else {
            vec![]
        }
    }

    fn do_move(&self, _position: TierPosition, _mv: Move) -> TierPosition {
        TierPosition::new(0, 0)
    }

    fn supports_canonical_parents(&self) -> bool {
        true
    }

    fn canonical_parents(&self, child: TierPosition, parent_tier: Tier) -> Vec<Position> {
        if child.tier == 0 && parent_tier == 1 {
            vec![0]
        } else {
            vec![]
        }
    }
}

/// Two positions in one tier, each with a single move to the other and
/// neither primitive: the canonical draw-inducing cycle.
pub struct CycleGame;

impl Game for CycleGame {
    fn name(&self) -> &str {
        "cycle"
    }

    fn variant(&self) -> &str {
        "default"
    }

    fn initial_tier(&self) -> Tier {
        0
    }

    fn tier_size(&self, _tier: Tier) -> Position {
        2
    }

    fn child_tiers(&self, _tier: Tier) -> Vec<Tier> {
        vec![]
    }

    fn is_legal(&self, _position: TierPosition) -> bool {
        true
    }

    fn primitive(&self, _position: TierPosition) -> Value {
        Value::Undecided
    }

    fn generate_moves(&self, _position: TierPosition) -> Vec<Move> {
        vec![0]
    }

    fn do_move(&self, position: TierPosition, _mv: Move) -> TierPosition {
        TierPosition::new(position.tier, 1 - position.position)
    }
}

/// One tier of four positions with a mirror symmetry: 2 maps onto 1 and
/// 3 onto 0. Position 0 is a primitive loss, position 1 moves into 0 (and
/// the mirrors do the mirrored thing).
pub struct MirrorGame;

impl Game for MirrorGame {
    fn name(&self) -> &str {
        "mirror"
    }

    fn variant(&self) -> &str {
        "default"
    }

    fn initial_tier(&self) -> Tier {
        0
    }

    fn tier_size(&self, _tier: Tier) -> Position {
        4
    }

    fn child_tiers(&self, _tier: Tier) -> Vec<Tier> {
        vec![]
    }

    fn is_legal(&self, _position: TierPosition) -> bool {
        true
    }

    fn primitive(&self, position: TierPosition) -> Value {
        if position.position == 0 || position.position == 3 {
            Value::Lose
        } else {
            Value::Undecided
        }
    }

    fn generate_moves(&self, _position: TierPosition) -> Vec<Move> {
        vec![0]
    }

    fn do_move(&self, position: TierPosition, _mv: Move) -> TierPosition {
        // 1 -> 0, and the mirror 2 -> 3
        if position.position == 1 {
            TierPosition::new(position.tier, 0)
        } else {
            TierPosition::new(position.tier, 3)
        }
    }

    fn canonical_position(&self, position: TierPosition) -> Position {
        if position.position >= 2 {
            3 - position.position
        } else {
            position.position
        }
    }
}

/// Three tiers of one position each: tier 2 moves into tiers 0 and 1, and
/// tier 1 is symmetric to tier 0 (its mirror image). Tier 0 position 0 is a
/// primitive loss.
pub struct MirrorTierGame;

impl Game for MirrorTierGame {
    fn name(&self) -> &str {
        "mirrortier"
    }

    fn variant(&self) -> &str {
        "default"
    }

    fn initial_tier(&self) -> Tier {
        2
    }

    fn tier_size(&self, _tier: Tier) -> Position {
        1
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        if tier == 2 {
            vec![0, 1]
        } else {
            vec![]
        }
    }

    fn is_legal(&self, _position: TierPosition) -> bool {
        true
    }

    fn primitive(&self, position: TierPosition) -> Value {
        if position.tier == 2 {
            Value::Undecided
        } else {
            Value::Lose
        }
    }

    fn generate_moves(&self, position: TierPosition) -> Vec<Move> {
        if position.tier == 2 {
            vec![0, 1]
        } else {
            vec![]
        }
    }

    fn do_move(&self, _position: TierPosition, mv: Move) -> TierPosition {
        TierPosition::new(mv, 0)
    }

    fn supports_canonical_parents(&self) -> bool {
        true
    }

    fn canonical_parents(&self, child: TierPosition, parent_tier: Tier) -> Vec<Position> {
        if child.tier == 0 && parent_tier == 2 {
            vec![0]
        } else {
            vec![]
        }
    }

    fn canonical_tier(&self, tier: Tier) -> Tier {
        if tier == 1 {
            0
        } else {
            tier
        }
    }

    fn position_in_symmetric_tier(&self, position: TierPosition, _symmetric: Tier) -> Position {
        position.position
    }
}

/// A do-nothing game whose only purpose is giving probes and the database a
/// tier of the wanted size; never solved through the worker.
pub struct StrideGame {
    pub size: Position,
}

impl Game for StrideGame {
    fn name(&self) -> &str {
        "stride"
    }

    fn variant(&self) -> &str {
        "default"
    }

    fn initial_tier(&self) -> Tier {
        0
    }

    fn tier_size(&self, _tier: Tier) -> Position {
        self.size
    }

    fn child_tiers(&self, _tier: Tier) -> Vec<Tier> {
        vec![]
    }

    fn is_legal(&self, _position: TierPosition) -> bool {
        true
    }

    fn primitive(&self, _position: TierPosition) -> Value {
        Value::Undecided
    }

    fn generate_moves(&self, _position: TierPosition) -> Vec<Move> {
        vec![]
    }

    fn do_move(&self, position: TierPosition, _mv: Move) -> TierPosition {
        position
    }
}
