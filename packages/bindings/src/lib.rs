use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

#[napi]
pub fn amortize(input_json: String) -> NapiResult<String> {
    let input: auto_finance_core::loans::amortization::LoanTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        auto_finance_core::loans::amortization::amortize(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn early_payoff(input_json: String) -> NapiResult<String> {
    let input: auto_finance_core::loans::amortization::LoanTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = auto_finance_core::loans::early_payoff::analyze_early_payoff(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn structure_balloon(input_json: String) -> NapiResult<String> {
    let input: auto_finance_core::loans::balloon::BalloonTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        auto_finance_core::loans::balloon::structure_balloon(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn balloon_options(input_json: String) -> NapiResult<String> {
    let input: auto_finance_core::loans::balloon::BalloonOptionsInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = auto_finance_core::loans::balloon::compare_balloon_options(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_offers(input_json: String) -> NapiResult<String> {
    let input: auto_finance_core::loans::comparison::OfferComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        auto_finance_core::loans::comparison::compare_offers(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Collateral
// ---------------------------------------------------------------------------

#[napi]
pub fn project_depreciation(input_json: String) -> NapiResult<String> {
    let input: auto_finance_core::collateral::depreciation::DepreciationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = auto_finance_core::collateral::depreciation::project_depreciation(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn gap_analysis(input_json: String) -> NapiResult<String> {
    let input: auto_finance_core::collateral::gap::GapInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        auto_finance_core::collateral::gap::analyze_loan_gap(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
