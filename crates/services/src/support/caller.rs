use bson::oid::ObjectId;
use realtydesk_db::models::ActorRole;
use serde::{Deserialize, Serialize};

use crate::auth::RoleClaim;

/// Legacy numeric role codes issued by the identity provider.
pub mod role_codes {
    pub const SUPER_ADMIN: i64 = 1000;
    pub const AGENT: i64 = 2000;
    pub const AGENT_MANAGER: i64 = 3000;
    pub const AGENT_ASSISTANT: i64 = 7000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    SuperAdmin,
    Agent,
    Client,
    Unauthenticated,
}

/// The identity the auth layer resolved for a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Option<ObjectId>,
    pub role: CallerRole,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl CallerRole {
    /// Maps whatever role claim the identity provider put in the token.
    pub fn from_claim(claim: &RoleClaim) -> Self {
        match claim {
            RoleClaim::Code(role_codes::SUPER_ADMIN) => CallerRole::SuperAdmin,
            RoleClaim::Code(
                role_codes::AGENT | role_codes::AGENT_MANAGER | role_codes::AGENT_ASSISTANT,
            ) => CallerRole::Agent,
            RoleClaim::Code(_) => CallerRole::Client,
            RoleClaim::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "superadmin" | "super_admin" | "super admin" | "super-admin" => {
                    CallerRole::SuperAdmin
                }
                "agent" => CallerRole::Agent,
                _ => CallerRole::Client,
            },
        }
    }

    /// Role recorded when this caller opens or closes a case.
    pub fn actor(&self) -> ActorRole {
        match self {
            CallerRole::SuperAdmin => ActorRole::SuperAdmin,
            CallerRole::Agent => ActorRole::Agent,
            CallerRole::Client | CallerRole::Unauthenticated => ActorRole::Client,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, CallerRole::SuperAdmin | CallerRole::Agent)
    }
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: CallerRole::Unauthenticated,
            display_name: None,
            email: None,
        }
    }

    pub fn authenticated(user_id: ObjectId, role: CallerRole) -> Self {
        Self {
            user_id: Some(user_id),
            role,
            display_name: None,
            email: None,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == CallerRole::SuperAdmin
    }

    /// Identity of an authenticated agent.
    pub fn agent_id(&self) -> Option<ObjectId> {
        match self.role {
            CallerRole::Agent => self.user_id,
            _ => None,
        }
    }
}
