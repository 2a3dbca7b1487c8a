//! Initiative-ordered turn tracker shared by character combat and warfare
//!
//! The tracker moves through `Setup -> Active -> Ended`. While active it
//! keeps a pointer to the acting entry; adding, removing or re-rolling
//! entries never moves the turn away from whoever is currently acting,
//! except when that entry itself is removed.

use std::cmp::Reverse;
use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// Something that can occupy a slot in the initiative order
pub trait TurnEntry {
    type Id: Copy + Eq + Debug + Display;

    fn turn_id(&self) -> Self::Id;
    fn initiative(&self) -> Option<i32>;
    fn set_initiative(&mut self, initiative: i32);
    /// Bonus used to break initiative ties
    fn tiebreaker(&self) -> i32;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnOrderError {
    #[error("turn order has not started")]
    NotStarted,
    #[error("turn order has already started")]
    AlreadyStarted,
    #[error("turn order has ended")]
    Ended,
    #[error("turn order has no participants")]
    Empty,
    #[error("participant is already in the turn order: {0}")]
    Duplicate(String),
    #[error("participant is not in the turn order: {0}")]
    UnknownParticipant(String),
    #[error("participant has no initiative: {0}")]
    MissingInitiative(String),
    #[error("no participant is able to take a turn")]
    NoEligibleParticipant,
    #[error("already at the first turn of the first round")]
    AtFirstTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TurnState {
    Setup,
    Active { round: u32, current: usize },
    Ended { rounds: u32 },
}

/// Describes a change of acting participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnChange<Id> {
    pub ended: Option<Id>,
    pub started: Id,
    pub round: u32,
    pub new_round: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    seq: u64,
    entry: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOrder<T> {
    slots: Vec<Slot<T>>,
    state: TurnState,
    next_seq: u64,
}

impl<T> Default for TurnOrder<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            state: TurnState::Setup,
            next_seq: 0,
        }
    }
}

impl<T: TurnEntry> TurnOrder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn round(&self) -> u32 {
        match self.state {
            TurnState::Setup => 0,
            TurnState::Active { round, .. } => round,
            TurnState::Ended { rounds } => rounds,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TurnState::Active { .. })
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, TurnState::Ended { .. })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries in turn order (insertion order before the start)
    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().map(|s| &s.entry)
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().map(|s| &mut s.entry)
    }

    pub fn position(&self, id: T::Id) -> Option<usize> {
        self.slots.iter().position(|s| s.entry.turn_id() == id)
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.slots.iter().find(|s| s.entry.turn_id() == id).map(|s| &s.entry)
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .find(|s| s.entry.turn_id() == id)
            .map(|s| &mut s.entry)
    }

    pub fn current(&self) -> Option<&T> {
        match self.state {
            TurnState::Active { current, .. } => self.slots.get(current).map(|s| &s.entry),
            _ => None,
        }
    }

    pub fn current_id(&self) -> Option<T::Id> {
        self.current().map(|e| e.turn_id())
    }

    pub fn add(&mut self, entry: T) -> Result<(), TurnOrderError> {
        if self.is_ended() {
            return Err(TurnOrderError::Ended);
        }
        let id = entry.turn_id();
        if self.position(id).is_some() {
            return Err(TurnOrderError::Duplicate(id.to_string()));
        }
        if self.is_active() && entry.initiative().is_none() {
            return Err(TurnOrderError::MissingInitiative(id.to_string()));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.push(Slot { seq, entry });
        if self.is_active() {
            self.resort();
        }
        Ok(())
    }

    pub fn remove(&mut self, id: T::Id) -> Result<T, TurnOrderError> {
        if self.is_ended() {
            return Err(TurnOrderError::Ended);
        }
        let index = self
            .position(id)
            .ok_or_else(|| TurnOrderError::UnknownParticipant(id.to_string()))?;
        let removed = self.slots.remove(index).entry;

        if let TurnState::Active { round, current } = self.state {
            if self.slots.is_empty() {
                self.state = TurnState::Ended { rounds: round };
            } else if index < current {
                self.state = TurnState::Active { round, current: current - 1 };
            } else if index == current && current >= self.slots.len() {
                // The last actor of the round left, so the next round begins
                self.state = TurnState::Active { round: round + 1, current: 0 };
            }
        }
        Ok(removed)
    }

    pub fn set_initiative(&mut self, id: T::Id, initiative: i32) -> Result<(), TurnOrderError> {
        if self.is_ended() {
            return Err(TurnOrderError::Ended);
        }
        let entry = self
            .get_mut(id)
            .ok_or_else(|| TurnOrderError::UnknownParticipant(id.to_string()))?;
        entry.set_initiative(initiative);
        if self.is_active() {
            self.resort();
        }
        Ok(())
    }

    /// Sort by initiative and hand the first turn to the top of the order
    pub fn start(&mut self) -> Result<TurnChange<T::Id>, TurnOrderError> {
        self.start_where(|_| false)
    }

    /// Start with the first entry in order that `skip` does not exclude
    pub fn start_where(
        &mut self,
        skip: impl Fn(&T) -> bool,
    ) -> Result<TurnChange<T::Id>, TurnOrderError> {
        match self.state {
            TurnState::Setup => {}
            TurnState::Active { .. } => return Err(TurnOrderError::AlreadyStarted),
            TurnState::Ended { .. } => return Err(TurnOrderError::Ended),
        }
        if self.slots.is_empty() {
            return Err(TurnOrderError::Empty);
        }
        if let Some(missing) = self.slots.iter().find(|s| s.entry.initiative().is_none()) {
            return Err(TurnOrderError::MissingInitiative(
                missing.entry.turn_id().to_string(),
            ));
        }

        self.sort_slots();
        let current = self
            .slots
            .iter()
            .position(|s| !skip(&s.entry))
            .ok_or(TurnOrderError::NoEligibleParticipant)?;
        self.state = TurnState::Active { round: 1, current };
        Ok(TurnChange {
            ended: None,
            started: self.slots[current].entry.turn_id(),
            round: 1,
            new_round: true,
        })
    }

    /// Advance to the next entry that `skip` does not exclude
    pub fn advance_where(
        &mut self,
        skip: impl Fn(&T) -> bool,
    ) -> Result<TurnChange<T::Id>, TurnOrderError> {
        let (mut round, current) = match self.state {
            TurnState::Setup => return Err(TurnOrderError::NotStarted),
            TurnState::Ended { .. } => return Err(TurnOrderError::Ended),
            TurnState::Active { round, current } => (round, current),
        };
        let ended = self.slots.get(current).map(|s| s.entry.turn_id());
        let len = self.slots.len();

        let mut index = current;
        let mut new_round = false;
        for _ in 0..len {
            index += 1;
            if index >= len {
                index = 0;
                round += 1;
                new_round = true;
            }
            if !skip(&self.slots[index].entry) {
                self.state = TurnState::Active { round, current: index };
                return Ok(TurnChange {
                    ended,
                    started: self.slots[index].entry.turn_id(),
                    round,
                    new_round,
                });
            }
        }
        Err(TurnOrderError::NoEligibleParticipant)
    }

    pub fn advance(&mut self) -> Result<TurnChange<T::Id>, TurnOrderError> {
        self.advance_where(|_| false)
    }

    /// Step back one turn
    pub fn previous(&mut self) -> Result<TurnChange<T::Id>, TurnOrderError> {
        self.previous_where(|_| false)
    }

    /// Step back to the closest earlier entry that `skip` does not exclude
    pub fn previous_where(
        &mut self,
        skip: impl Fn(&T) -> bool,
    ) -> Result<TurnChange<T::Id>, TurnOrderError> {
        let (mut round, current) = match self.state {
            TurnState::Setup => return Err(TurnOrderError::NotStarted),
            TurnState::Ended { .. } => return Err(TurnOrderError::Ended),
            TurnState::Active { round, current } => (round, current),
        };
        let ended = self.slots.get(current).map(|s| s.entry.turn_id());
        let len = self.slots.len();

        let mut index = current;
        for _ in 0..len {
            if index > 0 {
                index -= 1;
            } else if round > 1 {
                round -= 1;
                index = len - 1;
            } else {
                return Err(TurnOrderError::AtFirstTurn);
            }
            if !skip(&self.slots[index].entry) {
                self.state = TurnState::Active { round, current: index };
                return Ok(TurnChange {
                    ended,
                    started: self.slots[index].entry.turn_id(),
                    round,
                    new_round: false,
                });
            }
        }
        Err(TurnOrderError::NoEligibleParticipant)
    }

    pub fn end(&mut self) -> Result<u32, TurnOrderError> {
        if self.is_ended() {
            return Err(TurnOrderError::Ended);
        }
        let rounds = self.round();
        self.state = TurnState::Ended { rounds };
        Ok(rounds)
    }

    fn sort_slots(&mut self) {
        self.slots.sort_by_key(|s| {
            (
                Reverse(s.entry.initiative().unwrap_or(i32::MIN)),
                Reverse(s.entry.tiebreaker()),
                s.seq,
            )
        });
    }

    fn resort(&mut self) {
        let acting = self.current_id();
        self.sort_slots();
        if let (Some(id), TurnState::Active { round, .. }) = (acting, self.state) {
            if let Some(current) = self.position(id) {
                self.state = TurnState::Active { round, current };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Entry {
        id: u32,
        initiative: Option<i32>,
        bonus: i32,
    }

    impl TurnEntry for Entry {
        type Id = u32;

        fn turn_id(&self) -> u32 {
            self.id
        }

        fn initiative(&self) -> Option<i32> {
            self.initiative
        }

        fn set_initiative(&mut self, initiative: i32) {
            self.initiative = Some(initiative);
        }

        fn tiebreaker(&self) -> i32 {
            self.bonus
        }
    }

    fn entry(id: u32, initiative: i32, bonus: i32) -> Entry {
        Entry { id, initiative: Some(initiative), bonus }
    }

    fn started(entries: Vec<Entry>) -> TurnOrder<Entry> {
        let mut order = TurnOrder::new();
        for e in entries {
            order.add(e).unwrap();
        }
        order.start().unwrap();
        order
    }

    fn ids(order: &TurnOrder<Entry>) -> Vec<u32> {
        order.entries().map(|e| e.id).collect()
    }

    #[test]
    fn test_start_sorts_by_initiative_then_bonus_then_insertion() {
        let order = started(vec![
            entry(1, 12, 0),
            entry(2, 18, 1),
            entry(3, 12, 4),
            entry(4, 12, 0),
        ]);
        assert_eq!(ids(&order), vec![2, 3, 1, 4]);
        assert_eq!(order.current_id(), Some(2));
        assert_eq!(order.round(), 1);
    }

    #[test]
    fn test_start_requires_initiative_and_participants() {
        let mut order: TurnOrder<Entry> = TurnOrder::new();
        assert_eq!(order.start(), Err(TurnOrderError::Empty));

        order.add(Entry { id: 1, initiative: None, bonus: 0 }).unwrap();
        assert!(matches!(order.start(), Err(TurnOrderError::MissingInitiative(_))));
    }

    #[test]
    fn test_advance_wraps_into_new_round() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0)]);

        let change = order.advance().unwrap();
        assert_eq!(change.ended, Some(1));
        assert_eq!(change.started, 2);
        assert!(!change.new_round);

        let change = order.advance().unwrap();
        assert_eq!(change.started, 1);
        assert!(change.new_round);
        assert_eq!(change.round, 2);
    }

    #[test]
    fn test_advance_skips_excluded_entries() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0), entry(3, 5, 0)]);
        let change = order.advance_where(|e| e.id == 2).unwrap();
        assert_eq!(change.started, 3);

        let result = order.advance_where(|_| true);
        assert_eq!(result, Err(TurnOrderError::NoEligibleParticipant));
    }

    #[test]
    fn test_remove_before_current_keeps_actor() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0), entry(3, 5, 0)]);
        order.advance().unwrap();
        order.advance().unwrap();
        assert_eq!(order.current_id(), Some(3));

        order.remove(1).unwrap();
        assert_eq!(order.current_id(), Some(3));
    }

    #[test]
    fn test_remove_current_passes_turn() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0), entry(3, 5, 0)]);
        order.advance().unwrap();
        order.remove(2).unwrap();
        assert_eq!(order.current_id(), Some(3));

        // Removing the last actor of the round begins the next round
        order.remove(3).unwrap();
        assert_eq!(order.current_id(), Some(1));
        assert_eq!(order.round(), 2);

        order.remove(1).unwrap();
        assert!(order.is_ended());
    }

    #[test]
    fn test_add_during_combat_keeps_actor() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0)]);
        order.advance().unwrap();
        order.add(entry(3, 20, 0)).unwrap();

        assert_eq!(ids(&order), vec![3, 1, 2]);
        assert_eq!(order.current_id(), Some(2));
        assert!(matches!(order.add(entry(3, 1, 0)), Err(TurnOrderError::Duplicate(_))));
    }

    #[test]
    fn test_set_initiative_resorts_keeping_actor() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0), entry(3, 5, 0)]);
        order.set_initiative(3, 30).unwrap();
        assert_eq!(ids(&order), vec![3, 1, 2]);
        assert_eq!(order.current_id(), Some(1));
    }

    #[test]
    fn test_previous_steps_back_across_rounds() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0)]);
        assert_eq!(order.previous(), Err(TurnOrderError::AtFirstTurn));

        order.advance().unwrap();
        order.advance().unwrap();
        assert_eq!(order.round(), 2);

        let change = order.previous().unwrap();
        assert_eq!(change.started, 2);
        assert_eq!(order.round(), 1);
    }

    #[test]
    fn test_ended_order_rejects_mutation() {
        let mut order = started(vec![entry(1, 15, 0)]);
        assert_eq!(order.end(), Ok(1));
        assert_eq!(order.advance(), Err(TurnOrderError::Ended));
        assert_eq!(order.add(entry(2, 1, 0)), Err(TurnOrderError::Ended));
        assert_eq!(order.end(), Err(TurnOrderError::Ended));
    }

    #[test]
    fn test_start_skips_excluded_entries() {
        let mut order = TurnOrder::new();
        for e in [entry(1, 20, 0), entry(2, 15, 0), entry(3, 5, 0)] {
            order.add(e).unwrap();
        }
        let change = order.start_where(|e| e.id == 1).unwrap();
        assert_eq!(change.started, 2);
        assert_eq!(order.current_id(), Some(2));
        assert_eq!(order.round(), 1);
    }

    #[test]
    fn test_start_with_nobody_eligible_stays_in_setup() {
        let mut order = TurnOrder::new();
        order.add(entry(1, 20, 0)).unwrap();
        assert_eq!(order.start_where(|_| true), Err(TurnOrderError::NoEligibleParticipant));
        assert_eq!(order.state(), TurnState::Setup);
    }

    #[test]
    fn test_previous_skips_excluded_entries() {
        let mut order = started(vec![entry(1, 15, 0), entry(2, 10, 0), entry(3, 5, 0)]);
        order.advance().unwrap();
        order.advance().unwrap();
        assert_eq!(order.current_id(), Some(3));

        let change = order.previous_where(|e| e.id == 2).unwrap();
        assert_eq!(change.started, 1);
        assert_eq!(change.ended, Some(3));

        // Nothing earlier than the first turn of round one
        assert_eq!(order.previous_where(|e| e.id == 2), Err(TurnOrderError::AtFirstTurn));
    }
}
