use serde::Serialize;

pub const EARLY_WITHDRAWAL_PENALTY_RATE: f64 = 0.10;
pub const MAX_HORIZON_YEARS: u32 = 1_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AssetClass {
    Ira,
    Stocks,
    Bonds,
    Cash,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Ira,
        AssetClass::Stocks,
        AssetClass::Bonds,
        AssetClass::Cash,
    ];
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAmounts {
    pub ira: f64,
    pub stocks: f64,
    pub bonds: f64,
    pub cash: f64,
}

impl AssetAmounts {
    pub fn get(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Ira => self.ira,
            AssetClass::Stocks => self.stocks,
            AssetClass::Bonds => self.bonds,
            AssetClass::Cash => self.cash,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        AssetClass::ALL
            .into_iter()
            .map(move |class| (class, self.get(class)))
    }

    pub fn total(&self) -> f64 {
        self.ira + self.stocks + self.bonds + self.cash
    }

    pub fn plus(&self, other: &AssetAmounts) -> AssetAmounts {
        AssetAmounts {
            ira: self.ira + other.ira,
            stocks: self.stocks + other.stocks,
            bonds: self.bonds + other.bonds,
            cash: self.cash + other.cash,
        }
    }

    pub fn weighted_by(&self, rates: &AssetAmounts) -> f64 {
        self.iter()
            .map(|(class, amount)| amount * rates.get(class))
            .sum()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRates {
    pub categories: AssetAmounts,
    /// Applied to the balance carried over from prior years.
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInputs {
    pub initial_investment: f64,
    pub monthly_savings: f64,
    pub category_contributions: AssetAmounts,
    pub return_rates: ReturnRates,
    pub horizon_years: u32,
    pub inflation_rate: f64,
    pub current_age: u32,
    pub early_withdrawal_age: u32,
    pub income_tax_rate: f64,
    pub capital_gains_tax_rate: f64,
    pub early_withdrawal_penalty_rate: f64,
}

impl SimulationInputs {
    pub fn annual_savings(&self) -> f64 {
        self.monthly_savings * 12.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxBranch {
    EarlyWithdrawal,
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub contribution: f64,
    pub gain: f64,
    pub cumulative_contributions_by_category: AssetAmounts,
    pub cumulative_total_contributions: f64,
    pub cumulative_investment_gains: f64,
    pub year_end_balance: f64,
    pub inflation_adjusted_balance: f64,
    pub taxes_paid: f64,
    pub early_withdrawal_penalty: f64,
    pub tax_branch: TaxBranch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub horizon_years: u32,
    pub total_contributions: f64,
    pub total_gains: f64,
    pub final_balance: f64,
    pub final_inflation_adjusted_balance: f64,
    pub total_taxes_paid: f64,
    pub total_early_withdrawal_penalty: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub records: Vec<YearRecord>,
    pub summary: Summary,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdBudget {
    pub annual_salary: f64,
    pub estimated_take_home_pay: f64,
    pub annual_living_expenses: f64,
}

impl HouseholdBudget {
    pub fn monthly_living_expenses(&self) -> f64 {
        self.annual_living_expenses / 12.0
    }
}
