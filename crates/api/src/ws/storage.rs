use axum::extract::ws::Message;
use bson::oid::ObjectId;
use dashmap::DashMap;
use realtydesk_services::support::{Caller, CallerRole};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Outbound queue of one connection, drained by its writer task.
pub type WsSender = mpsc::UnboundedSender<Message>;

#[derive(Debug, Clone)]
pub struct Connection {
    pub user_id: Option<ObjectId>,
    pub role: CallerRole,
    pub sender: WsSender,
}

/// Live WebSocket connections and their case-room memberships.
///
/// Membership lives only as long as the connection: removing a connection
/// drops it from every room it joined.
pub struct WsStorage {
    connections: DashMap<String, Connection>,
    rooms: DashMap<ObjectId, HashSet<String>>,
    memberships: DashMap<String, HashSet<ObjectId>>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    pub fn add(&self, connection_id: String, caller: &Caller, sender: WsSender) {
        self.connections.insert(
            connection_id,
            Connection {
                user_id: caller.user_id,
                role: caller.role,
                sender,
            },
        );
    }

    pub fn remove(&self, connection_id: &str) {
        if let Some((_, rooms)) = self.memberships.remove(connection_id) {
            for room in rooms {
                self.drop_member(&room, connection_id);
            }
        }
        self.connections.remove(connection_id);
    }

    pub fn join(&self, connection_id: &str, room: ObjectId) {
        self.rooms
            .entry(room)
            .or_default()
            .insert(connection_id.to_string());
        self.memberships
            .entry(connection_id.to_string())
            .or_default()
            .insert(room);
    }

    pub fn leave(&self, connection_id: &str, room: ObjectId) {
        if let Some(mut rooms) = self.memberships.get_mut(connection_id) {
            rooms.remove(&room);
        }
        self.drop_member(&room, connection_id);
    }

    pub fn is_member(&self, connection_id: &str, room: ObjectId) -> bool {
        self.rooms
            .get(&room)
            .is_some_and(|members| members.contains(connection_id))
    }

    pub fn sender(&self, connection_id: &str) -> Option<WsSender> {
        self.connections.get(connection_id).map(|c| c.sender.clone())
    }

    /// Senders of every connection in `room`, optionally skipping one.
    pub fn room_senders(&self, room: ObjectId, except: Option<&str>) -> Vec<WsSender> {
        let members: Vec<String> = self
            .rooms
            .get(&room)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();

        members
            .iter()
            .filter(|id| Some(id.as_str()) != except)
            .filter_map(|id| self.sender(id))
            .collect()
    }

    /// Senders of every admin or agent connection.
    pub fn staff_senders(&self) -> Vec<WsSender> {
        self.connections
            .iter()
            .filter(|c| c.role.is_staff())
            .map(|c| c.sender.clone())
            .collect()
    }

    pub fn room_size(&self, room: ObjectId) -> usize {
        self.rooms.get(&room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn drop_member(&self, room: &ObjectId, connection_id: &str) {
        let empty = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.remove(connection_id);
                members.is_empty()
            }
            None => false,
        };
        if empty {
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
