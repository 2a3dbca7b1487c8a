//! Room entity - a campaign table and its members

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{RoomId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomRole {
    Gm,
    Player,
    Spectator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMember {
    pub user_id: UserId,
    pub role: RoomRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub gm: UserId,
    pub members: Vec<RoomMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: impl Into<String>, gm: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: RoomId::new(),
            name: name.into(),
            description: String::new(),
            members: vec![RoomMember {
                user_id: gm.clone(),
                role: RoomRole::Gm,
                joined_at: now,
            }],
            gm,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn member(&self, user_id: &UserId) -> Option<&RoomMember> {
        self.members.iter().find(|m| &m.user_id == user_id)
    }

    pub fn is_gm(&self, user_id: &UserId) -> bool {
        &self.gm == user_id
    }

    /// Add a member; re-joining keeps the original membership
    pub fn join(&mut self, user_id: UserId, role: RoomRole) -> &RoomMember {
        if let Some(index) = self.members.iter().position(|m| m.user_id == user_id) {
            return &self.members[index];
        }
        let role = if role == RoomRole::Gm && !self.is_gm(&user_id) {
            RoomRole::Player
        } else {
            role
        };
        self.members.push(RoomMember {
            user_id,
            role,
            joined_at: Utc::now(),
        });
        self.updated_at = Utc::now();
        &self.members[self.members.len() - 1]
    }

    /// Remove a member; the GM cannot leave their own room
    pub fn leave(&mut self, user_id: &UserId) -> bool {
        if self.is_gm(user_id) {
            return false;
        }
        let before = self.members.len();
        self.members.retain(|m| &m.user_id != user_id);
        let removed = self.members.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }
}
