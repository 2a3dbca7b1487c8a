//! Random dice backed by the thread-local generator

use rand::Rng;

use crate::domain::value_objects::Dice;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDice;

impl Dice for SystemDice {
    fn roll(&self, sides: u32) -> i32 {
        let sides = sides.max(1) as i32;
        rand::thread_rng().gen_range(1..=sides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolls_stay_on_the_die() {
        let dice = SystemDice;
        for _ in 0..200 {
            let face = dice.d20();
            assert!((1..=20).contains(&face));
        }
        assert_eq!(dice.roll(1), 1);
        assert_eq!(dice.roll(0), 1);
    }
}
