//! Property tests for the cart pricing invariant.

use chrono::Utc;
use domain::{CartAggregate, ItemKey, Money, NewCartItem, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
enum Op {
    Add {
        product: u8,
        color: u8,
        quantity: i64,
        price_cents: i64,
    },
    Update {
        product: u8,
        color: Option<u8>,
        quantity: i64,
    },
    Remove {
        product: u8,
        color: Option<u8>,
    },
    Clear,
}

const COLORS: [&str; 3] = ["", "red", "black"];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..4, 0u8..3, 1i64..20, 1i64..500_000).prop_map(|(product, color, quantity, price_cents)| {
            Op::Add { product, color, quantity, price_cents }
        }),
        2 => (0u8..4, prop::option::of(0u8..3), 0i64..20)
            .prop_map(|(product, color, quantity)| Op::Update { product, color, quantity }),
        2 => (0u8..4, prop::option::of(0u8..3))
            .prop_map(|(product, color)| Op::Remove { product, color }),
        1 => Just(Op::Clear),
    ]
}

fn key(product: u8, color: Option<u8>) -> ItemKey {
    ItemKey::from_parts(
        format!("P{product}"),
        color.map(|c| COLORS[c as usize].to_string()),
        None,
    )
}

fn expected_total(cart: &CartAggregate) -> Decimal {
    let raw: Decimal = cart
        .items()
        .iter()
        .map(|i| i.price.amount() * Decimal::from(i.quantity))
        .sum();
    raw.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Property: after any sequence of mutations the stored total equals
    /// round2(sum(quantity * price)) over the current lines.
    #[test]
    fn total_matches_line_items(ops in prop::collection::vec(op(), 1..40)) {
        let mut cart = CartAggregate::empty(UserId::new("u"), Utc::now());

        for op in ops {
            let now = Utc::now();
            match op {
                Op::Add { product, color, quantity, price_cents } => {
                    let item = NewCartItem {
                        product_id: Some(format!("P{product}")),
                        quantity: Some(quantity),
                        price: Some(Money::from_cents(price_cents)),
                        selected_color: Some(COLORS[color as usize].to_string()),
                        ..Default::default()
                    }
                    .validate(now)
                    .unwrap();
                    cart.add_item(item, now);
                }
                Op::Update { product, color, quantity } => {
                    cart.update_item(&key(product, color), quantity, now).unwrap();
                }
                Op::Remove { product, color } => {
                    cart.remove_item(&key(product, color), now);
                }
                Op::Clear => cart.clear(now),
            }

            prop_assert_eq!(cart.total_price().amount(), expected_total(&cart));
        }
    }

    /// Property: a zero-quantity update leaves no line matching the key.
    #[test]
    fn zero_update_removes_every_match(
        adds in prop::collection::vec((0u8..3, 0u8..3), 1..15),
        target in (0u8..3, prop::option::of(0u8..3)),
    ) {
        let mut cart = CartAggregate::empty(UserId::new("u"), Utc::now());
        for (product, color) in adds {
            let item = NewCartItem {
                product_id: Some(format!("P{product}")),
                quantity: Some(1),
                price: Some(Money::from_units(10)),
                selected_color: Some(COLORS[color as usize].to_string()),
                ..Default::default()
            }
            .validate(Utc::now())
            .unwrap();
            cart.add_item(item, Utc::now());
        }

        let key = key(target.0, target.1);
        cart.update_item(&key, 0, Utc::now()).unwrap();

        prop_assert!(!cart.items().iter().any(|i| key.matches(i)));
    }

    /// Property: invalid add requests never produce a line item.
    #[test]
    fn invalid_adds_are_rejected(quantity in -10i64..=0, price_cents in -1000i64..=0) {
        let bad_quantity = NewCartItem {
            product_id: Some("P1".to_string()),
            quantity: Some(quantity),
            price: Some(Money::from_units(1)),
            ..Default::default()
        };
        prop_assert!(bad_quantity.validate(Utc::now()).is_err());

        let bad_price = NewCartItem {
            product_id: Some("P1".to_string()),
            quantity: Some(1),
            price: Some(Money::from_cents(price_cents)),
            ..Default::default()
        };
        prop_assert!(bad_price.validate(Utc::now()).is_err());
    }
}
