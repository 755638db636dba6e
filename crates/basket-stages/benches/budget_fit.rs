//! Benchmarks for the greedy budget fitting loop.
//!
//! Run with: cargo bench -p basket-stages

use basket_core::{AgentId, Basket, BasketItem, Catalog, Product, TagFilter};
use basket_stages::{BudgetAgent, BudgetRequest};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Catalog with `roles` roles of `per_role` products each, prices spread 10..=10*per_role.
fn build_catalog(roles: usize, per_role: usize) -> Catalog {
    let mut products = Vec::with_capacity(roles * per_role);
    for r in 0..roles {
        for p in 0..per_role {
            products.push(Product {
                id: (r * per_role + p) as u64,
                name: format!("product-{}-{}", r, p),
                price_per_unit: 10.0 * (p + 1) as f64,
                unit: "kg".to_string(),
                tags: Default::default(),
                ingredient_role: format!("role-{}", r),
                rating: None,
            });
        }
    }
    Catalog::new(products, Vec::new()).unwrap()
}

/// Most expensive product of every role.
fn build_basket(catalog: &Catalog, roles: usize) -> Basket {
    let mut basket = Basket::new();
    for r in 0..roles {
        if let Some(product) = catalog.products_for_role(&format!("role-{}", r)).last() {
            basket.push(BasketItem::from_product(product, 1.0, AgentId::Compatibility, "bench"));
        }
    }
    basket
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("budget_fit");
    let agent = BudgetAgent::default();

    for roles in [4, 16, 64] {
        let catalog = build_catalog(roles, 50);
        let basket = build_basket(&catalog, roles);
        // Cheapest-per-role total, so every role gets swapped once
        let budget = 10.0 * roles as f64;

        group.bench_with_input(BenchmarkId::new("to_floor", roles), &roles, |b, _| {
            b.iter(|| {
                let fit = agent.fit(
                    black_box(BudgetRequest {
                        basket: basket.clone(),
                        budget_rub: Some(budget),
                        filter: TagFilter::default(),
                    }),
                    &catalog,
                );
                black_box(fit.replacements.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("already_fits", roles), &roles, |b, _| {
            b.iter(|| {
                let fit = agent.fit(
                    black_box(BudgetRequest {
                        basket: basket.clone(),
                        budget_rub: Some(f64::MAX),
                        filter: TagFilter::default(),
                    }),
                    &catalog,
                );
                black_box(fit.within_budget)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
