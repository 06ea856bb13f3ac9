use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tally_core::processors::{FeeProcessor, PromotionProcessor, TaxProcessor};
use tally_core::promotion::filter_valid;
use tally_core::{
    resolve_rate, Adjustment, AdjustmentType, ChainTaxRateResolver, Compatibility, CoreError,
    CoreResult, Order, OrderItem, Price, PriceCalculator, ProcessorRegistration, Promotion,
    PromotionOffer, PromotionStorage, TaxRate, TaxRatePercentage, TaxType, TaxZone,
    TaxZoneResolver,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn usd(number: rust_decimal::Decimal) -> Price {
    Price::new(number, "USD").unwrap()
}

struct Catalog(Vec<Promotion>);

impl PromotionStorage for Catalog {
    fn load_valid(
        &self,
        order_type_id: &str,
        store_id: &str,
        today: NaiveDate,
    ) -> CoreResult<Vec<Promotion>> {
        Ok(filter_valid(&self.0, order_type_id, store_id, today))
    }
}

fn spring_sale() -> Promotion {
    Promotion {
        id: "spring".to_string(),
        name: "Spring sale".to_string(),
        store_ids: BTreeSet::from(["1".to_string()]),
        order_type_ids: BTreeSet::from(["default".to_string()]),
        start_date: date(2024, 1, 1),
        end_date: Some(date(2024, 12, 31)),
        status: true,
        weight: 0,
        offer: PromotionOffer::OrderPercentageOff {
            percentage: dec!(0.1),
        },
        compatibility: Compatibility::Any,
    }
}

fn us_sales_tax() -> TaxType {
    TaxType {
        id: "sales_tax".to_string(),
        label: "Sales tax".to_string(),
        display_inclusive: false,
        zones: vec![Arc::new(TaxZone {
            id: "us".to_string(),
            label: "United States".to_string(),
            territories: vec!["US".to_string()],
            rates: vec![TaxRate::new(
                "standard",
                "Sales tax",
                vec![
                    TaxRatePercentage {
                        number: dec!(0.10),
                        start_date: date(2020, 1, 1),
                    },
                    TaxRatePercentage {
                        number: dec!(0.15),
                        start_date: date(2023, 1, 1),
                    },
                ],
            )
            .unwrap()],
        })],
    }
}

fn order() -> Order {
    let mut order = Order::new("default", "1", "USD", date(2024, 6, 15))
        .unwrap()
        .with_customer_country("US");
    order
        .add_item(OrderItem::new("a", "Mug", dec!(2), usd(dec!(25))))
        .unwrap();
    order
        .add_item(OrderItem::new("b", "Kettle", dec!(1), usd(dec!(50))))
        .unwrap();
    order
}

/// promotion(300) -> fee(200) -> tax(100)
fn full_chain() -> PriceCalculator {
    PriceCalculator::assemble(vec![
        ProcessorRegistration::new(
            "tax",
            TaxProcessor::new(
                vec![us_sales_tax()],
                Arc::new(TaxZoneResolver::new()),
                Arc::new(ChainTaxRateResolver::default()),
                2,
            ),
        )
        .with_priority(100)
        .with_adjustment_type(AdjustmentType::Tax),
        ProcessorRegistration::new(
            "promotion",
            PromotionProcessor::new(Arc::new(Catalog(vec![spring_sale()])), 2),
        )
        .with_priority(300)
        .with_adjustment_type(AdjustmentType::Promotion),
        ProcessorRegistration::new(
            "fee",
            FeeProcessor::new("handling", "Handling", dec!(0.05), 2).unwrap(),
        )
        .with_priority(200)
        .with_adjustment_type(AdjustmentType::Fee),
    ])
    .unwrap()
}

#[test]
fn test_eligibility_by_store() {
    let promotions = vec![spring_sale()];
    let today = date(2024, 6, 15);

    assert_eq!(filter_valid(&promotions, "default", "1", today).len(), 1);
    assert!(filter_valid(&promotions, "default", "2", today).is_empty());
}

#[test]
fn test_rate_schedule() {
    let tax_type = us_sales_tax();
    let zone = &tax_type.zones[0];

    assert_eq!(resolve_rate(zone, "standard", date(2022, 6, 1)).unwrap(), dec!(0.10));
    assert_eq!(resolve_rate(zone, "standard", date(2023, 1, 1)).unwrap(), dec!(0.15));
    assert!(resolve_rate(zone, "standard", date(2019, 1, 1))
        .unwrap_err()
        .is_percentage_not_found());
}

#[test]
fn test_full_chain_totals() {
    let calculator = full_chain();
    let ids: Vec<&str> = calculator.processors().iter().map(|p| p.0).collect();
    assert_eq!(ids, vec!["promotion", "fee", "tax"]);

    let mut order = order();
    calculator.process(&mut order).unwrap();

    // 100 - 10 promotion, + 5% fee on 90, + 15% tax on 45 per item
    assert_eq!(order.adjustments()[0].amount().number(), dec!(4.50));
    assert_eq!(order.items()[0].adjustments()[0].amount().number(), dec!(-5.00));
    assert_eq!(order.items()[0].adjustments()[1].amount().number(), dec!(6.75));
    assert_eq!(order.total_price().unwrap().number(), dec!(108.00));
}

#[test]
fn test_process_is_idempotent() {
    let calculator = full_chain();
    let mut order = order();

    calculator.process(&mut order).unwrap();
    let first = order.collect_adjustments();
    calculator.process(&mut order).unwrap();

    assert_eq!(order.collect_adjustments(), first);
    assert_eq!(order.total_price().unwrap().number(), dec!(108.00));
}

#[test]
fn test_locked_adjustment_survives_recalculation() {
    let calculator = full_chain();
    let mut order = order();
    order.items_mut()[0]
        .add_adjustment(
            Adjustment::new(AdjustmentType::Promotion, "Manager discount", usd(dec!(-1)))
                .with_locked(true),
        )
        .unwrap();

    calculator.process(&mut order).unwrap();
    calculator.process(&mut order).unwrap();

    let locked: Vec<_> = order
        .collect_adjustments()
        .into_iter()
        .filter(|a| a.is_locked())
        .collect();
    assert_eq!(locked.len(), 1);
    assert!(order.has_adjustment_from(AdjustmentType::Promotion, "spring"));
}

#[test]
fn test_later_processor_sees_earlier_adjustments() {
    let calculator = PriceCalculator::assemble(vec![
        ProcessorRegistration::new(
            "fee",
            FeeProcessor::new("handling", "Handling", dec!(0.1), 2).unwrap(),
        )
        .with_priority(5)
        .with_adjustment_type(AdjustmentType::Fee),
        ProcessorRegistration::new(
            "promotion",
            PromotionProcessor::new(Arc::new(Catalog(vec![spring_sale()])), 2),
        )
        .with_priority(10)
        .with_adjustment_type(AdjustmentType::Promotion),
    ])
    .unwrap();

    let mut order = order();
    calculator.process(&mut order).unwrap();

    // 10% of the discounted 90, not of 100
    assert_eq!(order.adjustments()[0].amount().number(), dec!(9.00));
}

#[test]
fn test_chain_fails_fast() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let ran_c = Arc::clone(&ran);

    let calculator = PriceCalculator::assemble(vec![
        ProcessorRegistration::new("a", |order: &mut Order| -> CoreResult<()> {
            order.add_adjustment(Adjustment::new(
                AdjustmentType::Shipping,
                "Shipping",
                Price::new(dec!(4.99), "USD")?,
            ))
        })
        .with_priority(10)
        .with_adjustment_type(AdjustmentType::Shipping),
        ProcessorRegistration::new("b", |_: &mut Order| -> CoreResult<()> {
            Err(CoreError::External("rate service unavailable".to_string()))
        })
        .with_priority(5)
        .with_adjustment_type(AdjustmentType::Custom),
        ProcessorRegistration::new("c", move |_: &mut Order| -> CoreResult<()> {
            ran_c.lock().unwrap().push("c");
            Ok(())
        })
        .with_priority(1)
        .with_adjustment_type(AdjustmentType::Tax),
    ])
    .unwrap();

    let mut order = order();
    let err = calculator.process(&mut order).unwrap_err();

    match err {
        CoreError::Processor { processor, .. } => assert_eq!(processor, "b"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(order.adjustments().len(), 1);
    assert_eq!(order.adjustments()[0].adjustment_type(), AdjustmentType::Shipping);
    assert!(ran.lock().unwrap().is_empty());
}
