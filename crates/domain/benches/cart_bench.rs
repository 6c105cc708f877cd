use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{CartAggregate, CartItem, ItemKey, Money, NewCartItem, UserId};

fn make_item(i: usize) -> CartItem {
    NewCartItem {
        product_id: Some(format!("P{}", i % 50)),
        quantity: Some((i % 5 + 1) as i64),
        price: Some(Money::from_cents(1999 + i as i64)),
        selected_color: Some(if i % 2 == 0 { "red" } else { "black" }.to_string()),
        selected_size: Some("M".to_string()),
        ..Default::default()
    }
    .validate(Utc::now())
    .unwrap()
}

fn filled_cart(n: usize) -> CartAggregate {
    let mut cart = CartAggregate::empty(UserId::new("bench"), Utc::now());
    for i in 0..n {
        cart.add_item(make_item(i), Utc::now());
    }
    cart
}

fn bench_compute_total(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart/compute_total");
    for n in [10, 100, 1000] {
        let cart = filled_cart(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &cart, |b, cart| {
            b.iter(|| CartAggregate::compute_total(cart.items()));
        });
    }
    group.finish();
}

fn bench_update_item(c: &mut Criterion) {
    let cart = filled_cart(100);
    let key = ItemKey::variant("P49", "black", "M");

    c.bench_function("cart/update_item", |b| {
        b.iter_batched(
            || cart.clone(),
            |mut cart| cart.update_item(&key, 3, Utc::now()).unwrap(),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_compute_total, bench_update_item);
criterion_main!(benches);
