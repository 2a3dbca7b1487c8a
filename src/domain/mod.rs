//! Domain layer - Core game rules with no external dependencies
//!
//! This layer contains:
//! - Entities: Character, Item, Room, Combat, Domain, Unit, Fortification
//! - Value Objects: ids, dice, conditions, turn order, warfare tables
//! - Domain Events: notifications pushed to room members
//! - Domain Services: attack and warfare resolution

pub mod entities;
pub mod events;
pub mod services;
pub mod value_objects;
