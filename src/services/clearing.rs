// Uniform-price call-auction clearing.
// Orders accumulate for a round and are crossed in a single batch; every
// matched unit trades at one uniform price.

/// Working copy of one order for matching. Snapshots are decremented in
/// place during the sweep; the persisted order rows stay untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub owner: String,
    pub price: f64,
    pub quantity: i64,
}

impl OrderSnapshot {
    pub fn new(owner: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self {
            owner: owner.into(),
            price,
            quantity,
        }
    }
}

/// One matched fill, in the order matching occurred. A single order crossed
/// by several counter-orders produces several events with the same owner.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub buyer: String,
    pub seller: String,
    pub quantity: i64,
}

/// Result of clearing one round
#[derive(Debug, Clone, PartialEq)]
pub struct ClearingOutcome {
    pub uniform_price: f64,
    pub total_quantity: i64,
    pub trades: Vec<TradeEvent>,
}

impl ClearingOutcome {
    /// Sentinel outcome for a round where nothing crossed. Not an error.
    pub fn no_trade() -> Self {
        Self {
            uniform_price: 0.0,
            total_quantity: 0,
            trades: Vec::new(),
        }
    }
}

/// Cross buy orders against sell orders at a single uniform price.
///
/// Bids are taken highest price first, asks lowest price first; among
/// equally priced orders the smaller quantity goes first, which reduces
/// residual fragmentation. The sweep trades `min(remaining, remaining)`
/// at each step and stops as soon as the current bid no longer meets the
/// current ask. The uniform price is the midpoint of the bid and ask
/// prices of the final clearing trade.
pub fn clear_market(bids: &[OrderSnapshot], asks: &[OrderSnapshot]) -> ClearingOutcome {
    if bids.is_empty() || asks.is_empty() {
        return ClearingOutcome::no_trade();
    }

    let mut bids = bids.to_vec();
    let mut asks = asks.to_vec();
    bids.sort_by(|a, b| {
        b.price
            .total_cmp(&a.price)
            .then(a.quantity.cmp(&b.quantity))
    });
    asks.sort_by(|a, b| {
        a.price
            .total_cmp(&b.price)
            .then(a.quantity.cmp(&b.quantity))
    });

    let mut trades = Vec::new();
    let mut total_quantity = 0i64;
    let mut last_bid_price = 0.0f64;
    let mut last_ask_price = 0.0f64;
    let mut i = 0;
    let mut j = 0;

    while i < bids.len() && j < asks.len() {
        if bids[i].price < asks[j].price {
            break;
        }

        let quantity = bids[i].quantity.min(asks[j].quantity);
        total_quantity += quantity;
        last_bid_price = bids[i].price;
        last_ask_price = asks[j].price;

        trades.push(TradeEvent {
            buyer: bids[i].owner.clone(),
            seller: asks[j].owner.clone(),
            quantity,
        });

        bids[i].quantity -= quantity;
        asks[j].quantity -= quantity;
        if bids[i].quantity == 0 {
            i += 1;
        }
        if asks[j].quantity == 0 {
            j += 1;
        }
    }

    if total_quantity == 0 {
        return ClearingOutcome::no_trade();
    }

    ClearingOutcome {
        uniform_price: (last_bid_price + last_ask_price) / 2.0,
        total_quantity,
        trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bid(owner: &str, price: f64, quantity: i64) -> OrderSnapshot {
        OrderSnapshot::new(owner, price, quantity)
    }

    #[test]
    fn test_empty_sides_do_not_trade() {
        assert_eq!(clear_market(&[], &[]), ClearingOutcome::no_trade());
        assert_eq!(
            clear_market(&[bid("b1", 10.0, 5)], &[]),
            ClearingOutcome::no_trade()
        );
        assert_eq!(
            clear_market(&[], &[bid("s1", 3.0, 5)]),
            ClearingOutcome::no_trade()
        );
    }

    #[test]
    fn test_no_cross_means_no_trade() {
        // Best bid 5 below best ask 6, quantities irrelevant
        let outcome = clear_market(&[bid("b1", 5.0, 10)], &[bid("s1", 6.0, 10)]);
        assert_eq!(outcome, ClearingOutcome::no_trade());
    }

    #[test]
    fn test_single_full_match() {
        let outcome = clear_market(&[bid("b1", 8.0, 5)], &[bid("s1", 6.0, 5)]);
        assert_eq!(outcome.total_quantity, 5);
        assert_eq!(outcome.uniform_price, 7.0);
        assert_eq!(
            outcome.trades,
            vec![TradeEvent {
                buyer: "b1".into(),
                seller: "s1".into(),
                quantity: 5,
            }]
        );
    }

    #[test]
    fn test_multi_order_sweep_uses_final_pair_for_price() {
        // Bids (10,5),(9,3); asks (7,4),(8,6):
        //   4 @ (10,7), 1 @ (10,8), 3 @ (9,8); price = (9+8)/2
        let bids = [bid("b1", 10.0, 5), bid("b2", 9.0, 3)];
        let asks = [bid("s1", 7.0, 4), bid("s2", 8.0, 6)];
        let outcome = clear_market(&bids, &asks);

        assert_eq!(outcome.total_quantity, 8);
        assert_eq!(outcome.uniform_price, 8.5);
        assert_eq!(outcome.trades.len(), 3);
        assert_eq!(outcome.trades[0].quantity, 4);
        assert_eq!(outcome.trades[1].quantity, 1);
        assert_eq!(outcome.trades[2].quantity, 3);
        // b1 is exhausted across two asks: two events, same owner
        assert_eq!(outcome.trades[0].buyer, "b1");
        assert_eq!(outcome.trades[1].buyer, "b1");
        assert_eq!(outcome.trades[2].buyer, "b2");
        assert_eq!(outcome.trades[1].seller, "s2");
    }

    #[test]
    fn test_equal_prices_smaller_quantity_first() {
        let bids = [bid("big", 10.0, 9), bid("small", 10.0, 2)];
        let asks = [bid("s1", 10.0, 2)];
        let outcome = clear_market(&bids, &asks);

        assert_eq!(outcome.total_quantity, 2);
        assert_eq!(outcome.trades[0].buyer, "small");
        assert_eq!(outcome.uniform_price, 10.0);
    }

    #[test]
    fn test_partial_fill_stops_at_price_gap() {
        // Second bid (4.0) is below the remaining ask (5.0); only the
        // first bid trades and only partially fills the ask.
        let bids = [bid("b1", 6.0, 3), bid("b2", 4.0, 5)];
        let asks = [bid("s1", 5.0, 10)];
        let outcome = clear_market(&bids, &asks);

        assert_eq!(outcome.total_quantity, 3);
        assert_eq!(outcome.uniform_price, 5.5);
        assert_eq!(outcome.trades.len(), 1);
    }

    proptest! {
        // Traded volume can never exceed the thinner side of the book
        #[test]
        fn prop_volume_bounded_by_thinner_side(
            bid_orders in prop::collection::vec((1u32..100, 1i64..50), 0..6),
            ask_orders in prop::collection::vec((1u32..100, 1i64..50), 0..6),
        ) {
            let bids: Vec<OrderSnapshot> = bid_orders
                .iter()
                .map(|(p, q)| OrderSnapshot::new("b", *p as f64, *q))
                .collect();
            let asks: Vec<OrderSnapshot> = ask_orders
                .iter()
                .map(|(p, q)| OrderSnapshot::new("s", *p as f64, *q))
                .collect();

            let outcome = clear_market(&bids, &asks);

            let bid_total: i64 = bids.iter().map(|o| o.quantity).sum();
            let ask_total: i64 = asks.iter().map(|o| o.quantity).sum();
            prop_assert!(outcome.total_quantity <= bid_total.min(ask_total));

            let event_total: i64 = outcome.trades.iter().map(|t| t.quantity).sum();
            prop_assert_eq!(event_total, outcome.total_quantity);
        }
    }
}
