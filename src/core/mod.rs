mod engine;
mod error;
mod types;

pub use engine::{project, summarize, validate_inputs};
pub use error::ProjectionError;
pub use types::{
    AssetAmounts, AssetClass, EARLY_WITHDRAWAL_PENALTY_RATE, HouseholdBudget, MAX_HORIZON_YEARS,
    Projection, ReturnRates, SimulationInputs, Summary, TaxBranch, YearRecord,
};
