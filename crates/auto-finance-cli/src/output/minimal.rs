use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Headline field per command, most specific first. The payment fields come
/// before the totals so a schedule prints what the borrower pays each month.
const HEADLINE_KEYS: [&str; 8] = [
    "accelerated_payment",
    "regular_payment",
    "scheduled_payment",
    "lowest_payment_fraction",
    "cheapest",
    "max_gap",
    "final_value",
    "total_interest",
];

/// Print just the headline answer, e.g. the monthly payment or peak GAP
/// exposure, rounded to cents when it is a decimal amount.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Object(map) => match headline(map) {
            Some(val) => println!("{}", format_minimal(val)),
            None => match map.iter().next() {
                Some((key, val)) => println!("{}: {}", key, format_minimal(val)),
                None => println!("{{}}"),
            },
        },
        other => println!("{}", format_minimal(other)),
    }
}

fn headline(map: &Map<String, Value>) -> Option<&Value> {
    HEADLINE_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !v.is_null())
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => match Decimal::from_str(s) {
            Ok(d) if d.scale() > 2 => d
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                .to_string(),
            _ => s.clone(),
        },
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
