// Persistence seam for the auction engine. The engine only sees the
// `AuctionStore` trait; `SqliteStore` is the production implementation.

use async_trait::async_trait;

use crate::database::DatabasePool;
use crate::error::Result;
use crate::models::{NewOrder, Order, Participant, ParticipantRoundResult, Role, RoundResult};

/// Participant fields fixed at registration time
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub participant_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub initial_money: f64,
    pub endowment: f64,
    pub mv_first: f64,
    pub mv_second: f64,
}

/// Everything a cleared round persists. Written in a single transaction:
/// either the round row, every participant row, and every token increment
/// land together, or none of them do.
#[derive(Debug, Clone)]
pub struct RoundSettlement {
    pub round: RoundResult,
    pub participant_results: Vec<ParticipantRoundResult>,
}

#[async_trait]
pub trait AuctionStore: Send + Sync {
    async fn insert_participant(&self, new: &NewParticipant) -> Result<Participant>;
    async fn find_participant(&self, participant_id: &str) -> Result<Option<Participant>>;
    async fn list_participants(&self) -> Result<Vec<Participant>>;

    async fn insert_survey_response(
        &self,
        participant_id: &str,
        answer1: Option<&str>,
        answer2: Option<&str>,
    ) -> Result<()>;

    /// Record a participant's order set for one round. All rows in one
    /// transaction; a half-written order set would corrupt clearing.
    async fn insert_orders(
        &self,
        participant_id: &str,
        round_number: i64,
        orders: &[NewOrder],
    ) -> Result<()>;

    async fn round_orders(&self, round_number: i64) -> Result<Vec<Order>>;
    async fn round_submitters(&self, round_number: i64) -> Result<Vec<String>>;
    async fn has_submitted(&self, participant_id: &str, round_number: i64) -> Result<bool>;

    /// Number of rounds with a persisted clearing result. Drives state
    /// recovery after a restart.
    async fn cleared_round_count(&self) -> Result<i64>;

    async fn find_round_result(&self, round_number: i64) -> Result<Option<RoundResult>>;
    async fn find_participant_round_result(
        &self,
        participant_id: &str,
        round_number: i64,
    ) -> Result<Option<ParticipantRoundResult>>;

    async fn commit_settlement(&self, settlement: &RoundSettlement) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: DatabasePool,
}

impl SqliteStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuctionStore for SqliteStore {
    async fn insert_participant(&self, new: &NewParticipant) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants
                (participant_id, first_name, last_name, role,
                 initial_money, endowment, mv_first, mv_second, tokens)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            RETURNING participant_id, first_name, last_name, role,
                      initial_money, endowment, mv_first, mv_second, tokens
            "#,
        )
        .bind(&new.participant_id)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.role)
        .bind(new.initial_money)
        .bind(new.endowment)
        .bind(new.mv_first)
        .bind(new.mv_second)
        .fetch_one(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn find_participant(&self, participant_id: &str) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT participant_id, first_name, last_name, role,
                   initial_money, endowment, mv_first, mv_second, tokens
            FROM participants
            WHERE participant_id = ?
            "#,
        )
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT participant_id, first_name, last_name, role,
                   initial_money, endowment, mv_first, mv_second, tokens
            FROM participants
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn insert_survey_response(
        &self,
        participant_id: &str,
        answer1: Option<&str>,
        answer2: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO survey_responses (participant_id, answer1, answer2) VALUES (?, ?, ?)",
        )
        .bind(participant_id)
        .bind(answer1)
        .bind(answer2)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_orders(
        &self,
        participant_id: &str,
        round_number: i64,
        orders: &[NewOrder],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for order in orders {
            sqlx::query(
                r#"
                INSERT INTO orders (participant_id, price, quantity, side, round_number)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(participant_id)
            .bind(order.price)
            .bind(order.quantity)
            .bind(order.side)
            .bind(round_number)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn round_orders(&self, round_number: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, participant_id, price, quantity, side, round_number
            FROM orders
            WHERE round_number = ?
            ORDER BY id
            "#,
        )
        .bind(round_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn round_submitters(&self, round_number: i64) -> Result<Vec<String>> {
        let submitters = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT participant_id FROM orders WHERE round_number = ?",
        )
        .bind(round_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(submitters)
    }

    async fn has_submitted(&self, participant_id: &str, round_number: i64) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE participant_id = ? AND round_number = ?",
        )
        .bind(participant_id)
        .bind(round_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn cleared_round_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM round_results")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn find_round_result(&self, round_number: i64) -> Result<Option<RoundResult>> {
        let result = sqlx::query_as::<_, RoundResult>(
            r#"
            SELECT round_number, uniform_price, total_quantity
            FROM round_results
            WHERE round_number = ?
            "#,
        )
        .bind(round_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_participant_round_result(
        &self,
        participant_id: &str,
        round_number: i64,
    ) -> Result<Option<ParticipantRoundResult>> {
        let result = sqlx::query_as::<_, ParticipantRoundResult>(
            r#"
            SELECT round_number, participant_id, executed_quantity, profit
            FROM participant_round_results
            WHERE participant_id = ? AND round_number = ?
            "#,
        )
        .bind(participant_id)
        .bind(round_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn commit_settlement(&self, settlement: &RoundSettlement) -> Result<()> {
        // Dropping the transaction on an early return rolls everything back
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO round_results (round_number, uniform_price, total_quantity)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(settlement.round.round_number)
        .bind(settlement.round.uniform_price)
        .bind(settlement.round.total_quantity)
        .execute(&mut *tx)
        .await?;

        for result in &settlement.participant_results {
            sqlx::query(
                r#"
                INSERT INTO participant_round_results
                    (round_number, participant_id, executed_quantity, profit)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(result.round_number)
            .bind(&result.participant_id)
            .bind(result.executed_quantity)
            .bind(result.profit)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE participants SET tokens = tokens + ? WHERE participant_id = ?")
                .bind(result.profit)
                .bind(&result.participant_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
