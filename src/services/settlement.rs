// Per-participant settlement over the trade events of one cleared round.
//
// Each participant carries two valuation tiers. For buyers the first trade
// event of the round is valued at mv_first and every later event at
// mv_second (diminishing marginal value); for sellers the first event is
// costed at mv_second and later events at mv_first. The inverted tier order
// on the sell side is part of the experiment design, not an accident.

use crate::models::Participant;
use crate::services::clearing::TradeEvent;

/// Settlement figures for one participant in one round
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantSettlement {
    pub participant_id: String,
    pub executed_quantity: i64,
    pub profit: f64,
}

/// Compute executed quantity and profit for every registered participant.
///
/// Ordering matters: `trades` must be in the sequence matching occurred,
/// because the first event is valued at a different tier than the rest.
/// Participants with no trade events settle at quantity 0, profit 0 and
/// still get a result entry.
pub fn settle_round(
    trades: &[TradeEvent],
    uniform_price: f64,
    participants: &[Participant],
) -> Vec<ParticipantSettlement> {
    participants
        .iter()
        .map(|p| {
            let fills: Vec<i64> = trades
                .iter()
                .filter(|t| {
                    if p.role.is_buyer() {
                        t.buyer == p.participant_id
                    } else {
                        t.seller == p.participant_id
                    }
                })
                .map(|t| t.quantity)
                .collect();

            let executed_quantity: i64 = fills.iter().sum();
            let profit = if p.role.is_buyer() {
                buyer_profit(&fills, uniform_price, p.mv_first, p.mv_second)
            } else {
                seller_profit(&fills, uniform_price, p.mv_first, p.mv_second)
            };

            ParticipantSettlement {
                participant_id: p.participant_id.clone(),
                executed_quantity,
                profit,
            }
        })
        .collect()
}

fn buyer_profit(fills: &[i64], price: f64, mv_first: f64, mv_second: f64) -> f64 {
    match fills.split_first() {
        None => 0.0,
        Some((first, rest)) => {
            let rest_quantity: i64 = rest.iter().sum();
            (mv_first - price) * *first as f64 + (mv_second - price) * rest_quantity as f64
        }
    }
}

fn seller_profit(fills: &[i64], price: f64, mv_first: f64, mv_second: f64) -> f64 {
    match fills.split_first() {
        None => 0.0,
        Some((first, rest)) => {
            let rest_quantity: i64 = rest.iter().sum();
            (price - mv_second) * *first as f64 + (price - mv_first) * rest_quantity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn participant(id: &str, role: Role, mv_first: f64, mv_second: f64) -> Participant {
        Participant {
            participant_id: id.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            initial_money: 0.0,
            endowment: 0.0,
            mv_first,
            mv_second,
            tokens: 0.0,
        }
    }

    fn trade(buyer: &str, seller: &str, quantity: i64) -> TradeEvent {
        TradeEvent {
            buyer: buyer.to_string(),
            seller: seller.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_buyer_two_events_uses_both_tiers() {
        // (8-7)*3 + (6-7)*2 = 1
        let participants = [participant("b1", Role::Buyer1, 8.0, 6.0)];
        let trades = [trade("b1", "s1", 3), trade("b1", "s2", 2)];
        let results = settle_round(&trades, 7.0, &participants);

        assert_eq!(results[0].executed_quantity, 5);
        assert_eq!(results[0].profit, 1.0);
    }

    #[test]
    fn test_seller_single_event_uses_second_tier() {
        // (5.5-4)*5 = 7.5
        let participants = [participant("s1", Role::Seller1, 6.0, 4.0)];
        let trades = [trade("b1", "s1", 5)];
        let results = settle_round(&trades, 5.5, &participants);

        assert_eq!(results[0].executed_quantity, 5);
        assert_eq!(results[0].profit, 7.5);
    }

    #[test]
    fn test_seller_multiple_events_inverts_tier_order() {
        // First event at mv_second, later events at mv_first:
        // (7-4)*2 + (7-6)*3 = 9
        let participants = [participant("s1", Role::Seller1, 6.0, 4.0)];
        let trades = [trade("b1", "s1", 2), trade("b2", "s1", 3)];
        let results = settle_round(&trades, 7.0, &participants);

        assert_eq!(results[0].executed_quantity, 5);
        assert_eq!(results[0].profit, 9.0);
    }

    #[test]
    fn test_untraded_participant_settles_to_zero() {
        let participants = [
            participant("b1", Role::Buyer1, 8.0, 6.0),
            participant("b2", Role::Buyer2, 10.0, 8.0),
        ];
        let trades = [trade("b1", "s1", 4)];
        let results = settle_round(&trades, 7.0, &participants);

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].participant_id, "b2");
        assert_eq!(results[1].executed_quantity, 0);
        assert_eq!(results[1].profit, 0.0);
    }

    #[test]
    fn test_single_trade_spread_is_conserved() {
        // buyer profit + seller profit = (buyer mv_first - seller mv_second) * qty,
        // independent of the uniform price
        let participants = [
            participant("b1", Role::Buyer1, 8.0, 6.0),
            participant("s1", Role::Seller1, 6.0, 4.0),
        ];
        let trades = [trade("b1", "s1", 4)];
        let results = settle_round(&trades, 6.5, &participants);

        let total: f64 = results.iter().map(|r| r.profit).sum();
        assert_eq!(total, (8.0 - 4.0) * 4.0);
    }

    #[test]
    fn test_events_count_not_order_count() {
        // One submitted order filled by two counter-orders is two trade
        // instances for tier purposes
        let participants = [participant("b1", Role::Buyer1, 8.0, 6.0)];
        let trades = [trade("b1", "s1", 1), trade("b1", "s2", 1)];
        let results = settle_round(&trades, 7.0, &participants);

        // (8-7)*1 + (6-7)*1 = 0
        assert_eq!(results[0].profit, 0.0);
        assert_eq!(results[0].executed_quantity, 2);
    }
}
