//! Dice rolling and check resolution
//!
//! Every check in the engine is a d20 roll plus a modifier compared against a
//! difficulty class. The margin of success or failure is measured in degrees
//! of five points each.

use serde::{Deserialize, Serialize};

/// Source of random die rolls
///
/// Rules code never touches a random number generator directly so that
/// resolution can be replayed with scripted rolls.
pub trait Dice: Send + Sync {
    /// Roll a single die, returning a value in `1..=sides`
    fn roll(&self, sides: u32) -> i32;

    fn d20(&self) -> i32 {
        self.roll(20)
    }
}

/// Maximum number of failure degrees tracked by any effect table
pub const MAX_FAILURE_DEGREES: u8 = 4;

/// A single d20 check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRoll {
    /// The face shown on the die
    pub natural: i32,
    pub modifier: i32,
    pub dc: i32,
}

impl CheckRoll {
    pub fn roll(dice: &dyn Dice, modifier: i32, dc: i32) -> Self {
        Self {
            natural: dice.d20(),
            modifier,
            dc,
        }
    }

    pub fn total(&self) -> i32 {
        self.natural + self.modifier
    }

    pub fn is_natural_20(&self) -> bool {
        self.natural == 20
    }

    pub fn is_natural_1(&self) -> bool {
        self.natural == 1
    }

    /// Degrees of success or failure, with a natural 20 bumping the result one step
    pub fn outcome(&self) -> CheckOutcome {
        let outcome = CheckOutcome::from_margin(self.total(), self.dc);
        if self.is_natural_20() {
            outcome.improved()
        } else {
            outcome
        }
    }

    /// Plain pass/fail without degrees
    pub fn succeeds(&self) -> bool {
        self.total() >= self.dc
    }
}

/// Result of comparing a check total against a DC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "degrees", rename_all = "snake_case")]
pub enum CheckOutcome {
    Success(u8),
    Failure(u8),
}

impl CheckOutcome {
    /// Each full five points past the DC is one more degree
    pub fn from_margin(result: i32, dc: i32) -> Self {
        if result >= dc {
            let degrees = 1 + (result - dc) / 5;
            Self::Success(degrees.clamp(1, u8::MAX as i32) as u8)
        } else {
            let degrees = 1 + (dc - result - 1) / 5;
            Self::Failure(degrees.clamp(1, MAX_FAILURE_DEGREES as i32) as u8)
        }
    }

    pub fn improved(self) -> Self {
        match self {
            Self::Failure(1) => Self::Success(1),
            Self::Failure(n) => Self::Failure(n - 1),
            Self::Success(n) => Self::Success(n.saturating_add(1)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn failure_degrees(&self) -> u8 {
        match self {
            Self::Failure(n) => *n,
            Self::Success(_) => 0,
        }
    }

    pub fn success_degrees(&self) -> u8 {
        match self {
            Self::Success(n) => *n,
            Self::Failure(_) => 0,
        }
    }
}

#[cfg(test)]
pub use scripted::ScriptedDice;

#[cfg(test)]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::Dice;

    /// Dice that return a fixed sequence of faces
    pub struct ScriptedDice {
        faces: Mutex<VecDeque<i32>>,
    }

    impl ScriptedDice {
        pub fn new(faces: impl IntoIterator<Item = i32>) -> Self {
            Self {
                faces: Mutex::new(faces.into_iter().collect()),
            }
        }

        pub fn remaining(&self) -> usize {
            self.faces.lock().map(|f| f.len()).unwrap_or(0)
        }
    }

    impl Dice for ScriptedDice {
        fn roll(&self, _sides: u32) -> i32 {
            self.faces
                .lock()
                .ok()
                .and_then(|mut faces| faces.pop_front())
                .expect("scripted dice ran out of faces")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_degrees_by_margin() {
        assert_eq!(CheckOutcome::from_margin(20, 20), CheckOutcome::Success(1));
        assert_eq!(CheckOutcome::from_margin(25, 20), CheckOutcome::Success(2));
        assert_eq!(CheckOutcome::from_margin(19, 20), CheckOutcome::Failure(1));
        assert_eq!(CheckOutcome::from_margin(15, 20), CheckOutcome::Failure(1));
        assert_eq!(CheckOutcome::from_margin(14, 20), CheckOutcome::Failure(2));
        assert_eq!(CheckOutcome::from_margin(5, 20), CheckOutcome::Failure(3));
        assert_eq!(CheckOutcome::from_margin(4, 20), CheckOutcome::Failure(4));
        assert_eq!(CheckOutcome::from_margin(-30, 20), CheckOutcome::Failure(4));
    }

    #[test]
    fn test_natural_twenty_improves_one_degree() {
        let roll = CheckRoll { natural: 20, modifier: -3, dc: 20 };
        assert_eq!(roll.outcome(), CheckOutcome::Success(1));

        let roll = CheckRoll { natural: 20, modifier: -10, dc: 20 };
        assert_eq!(roll.outcome(), CheckOutcome::Failure(1));
    }

    #[test]
    fn test_scripted_dice_replays_faces() {
        let dice = ScriptedDice::new([3, 17]);
        assert_eq!(dice.d20(), 3);
        assert_eq!(dice.roll(6), 17);
        assert_eq!(dice.remaining(), 0);
    }
}
