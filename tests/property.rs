use proptest::prelude::*;
use tickfeed::book::OrderBook;
use tickfeed::wire::{self, MarketUpdate};

proptest! {
    // For every price, the final quantity equals the quantity of the last
    // applied update at that price (a plain last-write-wins map is the model).
    #[test]
    fn book_matches_last_write_wins_model(updates in prop::collection::vec(any_update(), 1..2000)) {
        let book = OrderBook::new();
        let mut model = std::collections::HashMap::<u32, u32>::new();

        for upd in &updates {
            book.apply(upd);
            model.insert(upd.price, upd.qty);
        }

        let levels = book.snapshot();
        prop_assert_eq!(levels.len(), model.len());
        for lvl in &levels {
            prop_assert_eq!(Some(&lvl.qty), model.get(&lvl.price));
        }

        // Sorted ascending, no duplicate prices.
        for w in levels.windows(2) {
            prop_assert!(w[0].price < w[1].price);
        }
    }

    // Decode never accepts anything but an exact 16-byte frame, and accepted
    // frames round-trip bit-exactly.
    #[test]
    fn decode_enforces_framing(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        match wire::decode(&bytes) {
            Ok(upd) => {
                prop_assert_eq!(bytes.len(), wire::RECORD_LEN);
                let encoded = wire::encode(&upd);
                prop_assert_eq!(encoded.as_slice(), bytes.as_slice());
            }
            Err(wire::FrameError::Length { got }) => {
                prop_assert_eq!(got, bytes.len());
                prop_assert_ne!(got, wire::RECORD_LEN);
            }
        }
    }
}

fn any_update() -> impl Strategy<Value = MarketUpdate> {
    (any::<u64>(), 0u32..5_000u32, 0u32..10_000u32)
        .prop_map(|(ts_us, price, qty)| MarketUpdate { ts_us, price, qty })
}
