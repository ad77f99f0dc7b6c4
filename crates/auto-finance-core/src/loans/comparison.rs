//! Side-by-side comparison of independent loan offers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::AutoFinanceError;
use crate::loans::amortization::LoanTerms;
use crate::loans::early_payoff::simulate;
use crate::types::*;
use crate::AutoFinanceResult;

/// A named loan offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanOffer {
    pub name: String,
    pub terms: LoanTerms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferComparisonInput {
    pub offers: Vec<LoanOffer>,
}

/// Headline figures for one offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferSummary {
    pub name: String,
    /// 1 = cheapest by total paid.
    pub rank: u32,
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_paid: Money,
    pub periods_to_payoff: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferComparisonOutput {
    /// Offers in input order.
    pub offers: Vec<OfferSummary>,
    pub cheapest: String,
    /// Total paid by the most expensive offer minus the cheapest.
    pub max_savings: Money,
}

fn summarize(offer: &LoanOffer) -> AutoFinanceResult<OfferSummary> {
    let schedule = simulate(&offer.terms).map_err(|e| match e {
        AutoFinanceError::InvalidInput { field, reason } => AutoFinanceError::InvalidInput {
            field: format!("offers[{}].{field}", offer.name),
            reason,
        },
        other => other,
    })?;
    Ok(OfferSummary {
        name: offer.name.clone(),
        rank: 0,
        monthly_payment: schedule.scheduled_payment + offer.terms.extra_payment(),
        total_interest: schedule.total_interest,
        total_paid: schedule.total_paid,
        periods_to_payoff: schedule.periods_to_payoff,
    })
}

#[cfg(feature = "parallel")]
fn summarize_all(offers: &[LoanOffer]) -> AutoFinanceResult<Vec<OfferSummary>> {
    offers.par_iter().map(summarize).collect()
}

#[cfg(not(feature = "parallel"))]
fn summarize_all(offers: &[LoanOffer]) -> AutoFinanceResult<Vec<OfferSummary>> {
    offers.iter().map(summarize).collect()
}

/// Simulate every offer and rank them by total cash paid.
pub fn compare_offers(
    input: &OfferComparisonInput,
) -> AutoFinanceResult<ComputationOutput<OfferComparisonOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.offers.is_empty() {
        return Err(AutoFinanceError::invalid(
            "offers",
            "At least one offer is required",
        ));
    }
    if input.offers.len() == 1 {
        warnings.push("Only one offer supplied; nothing to compare against".into());
    }

    let mut offers = summarize_all(&input.offers)?;

    // Stable sort keeps input order on ties.
    let mut order: Vec<usize> = (0..offers.len()).collect();
    order.sort_by(|&a, &b| offers[a].total_paid.cmp(&offers[b].total_paid));
    for (rank, &idx) in order.iter().enumerate() {
        offers[idx].rank = rank as u32 + 1;
    }

    let cheapest = &offers[order[0]];
    let dearest = &offers[order[order.len() - 1]];
    let output = OfferComparisonOutput {
        cheapest: cheapest.name.clone(),
        max_savings: (dearest.total_paid - cheapest.total_paid).max(Decimal::ZERO),
        offers,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Loan offer comparison (ranked by total paid)",
        &serde_json::json!({
            "offers": input.offers.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(),
            "parallel": cfg!(feature = "parallel"),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn offer(name: &str, rate: Decimal, term: u32) -> LoanOffer {
        LoanOffer {
            name: name.into(),
            terms: LoanTerms::new(dec!(25000), rate, term),
        }
    }

    #[test]
    fn test_lower_rate_ranks_first() {
        let input = OfferComparisonInput {
            offers: vec![
                offer("Dealer", dec!(6.9), 60),
                offer("Credit union", dec!(4.5), 60),
            ],
        };
        let out = compare_offers(&input).unwrap().result;
        assert_eq!(out.cheapest, "Credit union");
        assert_eq!(out.offers[0].name, "Dealer");
        assert_eq!(out.offers[0].rank, 2);
        assert_eq!(out.offers[1].rank, 1);
        assert!(out.max_savings > Decimal::ZERO);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let input = OfferComparisonInput {
            offers: vec![offer("A", dec!(5), 48), offer("B", dec!(5), 48)],
        };
        let out = compare_offers(&input).unwrap().result;
        assert_eq!(out.offers[0].rank, 1);
        assert_eq!(out.offers[1].rank, 2);
        assert_eq!(out.cheapest, "A");
        assert_eq!(out.max_savings, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_offer_named_in_error() {
        let input = OfferComparisonInput {
            offers: vec![offer("Broken", dec!(5), 0)],
        };
        let err = compare_offers(&input).unwrap_err();
        assert!(err.to_string().contains("offers[Broken]"));
    }

    #[test]
    fn test_empty_rejected() {
        let input = OfferComparisonInput { offers: vec![] };
        assert!(compare_offers(&input).is_err());
    }
}
