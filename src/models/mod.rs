// Data models shared between the store, the engine, and the HTTP layer.
// Field layout follows the persisted schema in migrations/0001_init.sql.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The four fixed experiment roles. Registration assigns them in order;
/// each can be held by at most one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Buyer1,
    Buyer2,
    Seller1,
    Seller2,
}

/// Endowments and valuation tiers attached to a role at registration
#[derive(Debug, Clone, Copy)]
pub struct RoleProfile {
    pub participant_id: &'static str,
    pub initial_money: f64,
    pub endowment: f64,
    pub mv_first: f64,
    pub mv_second: f64,
}

impl Role {
    /// Assignment order used by registration
    pub const ALL: [Role; 4] = [Role::Buyer1, Role::Buyer2, Role::Seller1, Role::Seller2];

    pub fn is_buyer(&self) -> bool {
        matches!(self, Role::Buyer1 | Role::Buyer2)
    }

    /// Fixed experiment parameters for this role
    pub fn profile(&self) -> RoleProfile {
        match self {
            Role::Buyer1 => RoleProfile {
                participant_id: "b1",
                initial_money: 100.0,
                endowment: 0.0,
                mv_first: 8.0,
                mv_second: 6.0,
            },
            Role::Buyer2 => RoleProfile {
                participant_id: "b2",
                initial_money: 120.0,
                endowment: 0.0,
                mv_first: 10.0,
                mv_second: 8.0,
            },
            Role::Seller1 => RoleProfile {
                participant_id: "s1",
                initial_money: 0.0,
                endowment: 14.0,
                mv_first: 6.0,
                mv_second: 4.0,
            },
            Role::Seller2 => RoleProfile {
                participant_id: "s2",
                initial_money: 0.0,
                endowment: 16.0,
                mv_first: 8.0,
                mv_second: 6.0,
            },
        }
    }
}

/// Order side tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderSide {
    Bid,
    Ask,
}

/// Registered participant with accumulated token balance
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Participant {
    pub participant_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub initial_money: f64,
    pub endowment: f64,
    pub mv_first: f64,
    pub mv_second: f64,
    pub tokens: f64,
}

/// Persisted order record. Immutable once written; matching operates on
/// working copies, never on these rows.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub participant_id: String,
    pub price: f64,
    pub quantity: i64,
    pub side: OrderSide,
    pub round_number: i64,
}

/// Order fields accepted at submission, before they gain a round scope
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub price: f64,
    pub quantity: i64,
    pub side: OrderSide,
}

/// Round-level clearing outcome, one row per cleared round
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct RoundResult {
    pub round_number: i64,
    pub uniform_price: f64,
    pub total_quantity: i64,
}

/// Authoritative per-participant settlement record for one round
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct ParticipantRoundResult {
    pub round_number: i64,
    pub participant_id: String,
    pub executed_quantity: i64,
    pub profit: f64,
}
