use super::error::ProjectionError;
use super::types::{
    AssetAmounts, MAX_HORIZON_YEARS, Projection, SimulationInputs, Summary, TaxBranch, YearRecord,
};

pub fn project(inputs: &SimulationInputs) -> Result<Projection, ProjectionError> {
    validate_inputs(inputs)?;

    let mut records: Vec<YearRecord> = Vec::with_capacity(inputs.horizon_years as usize);
    for year_index in 0..inputs.horizon_years {
        let record = next_year_record(inputs, year_index, records.last());
        records.push(record);
    }

    let summary = summarize(&records)?;
    Ok(Projection { records, summary })
}

pub fn validate_inputs(inputs: &SimulationInputs) -> Result<(), ProjectionError> {
    if inputs.horizon_years < 1 {
        return Err(ProjectionError::invalid("horizon_years", "must be >= 1"));
    }
    if inputs.horizon_years > MAX_HORIZON_YEARS {
        return Err(ProjectionError::invalid(
            "horizon_years",
            format!("must be <= {MAX_HORIZON_YEARS}"),
        ));
    }

    let contributions = &inputs.category_contributions;
    let rates = &inputs.return_rates.categories;
    for (field, value) in [
        ("initial_investment", inputs.initial_investment),
        ("monthly_savings", inputs.monthly_savings),
        ("ira_contribution", contributions.ira),
        ("stocks_contribution", contributions.stocks),
        ("bonds_contribution", contributions.bonds),
        ("cash_contribution", contributions.cash),
        ("ira_return_rate", rates.ira),
        ("stocks_return_rate", rates.stocks),
        ("bonds_return_rate", rates.bonds),
        ("cash_return_rate", rates.cash),
        ("total_return_rate", inputs.return_rates.total),
        ("inflation_rate", inputs.inflation_rate),
        ("income_tax_rate", inputs.income_tax_rate),
        ("capital_gains_tax_rate", inputs.capital_gains_tax_rate),
        (
            "early_withdrawal_penalty_rate",
            inputs.early_withdrawal_penalty_rate,
        ),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ProjectionError::invalid(
                field,
                format!("must be a finite value >= 0 (got {value})"),
            ));
        }
    }

    Ok(())
}

fn next_year_record(
    inputs: &SimulationInputs,
    year_index: u32,
    previous: Option<&YearRecord>,
) -> YearRecord {
    let categories = &inputs.category_contributions;
    let rates = &inputs.return_rates;
    let recurring = inputs.annual_savings() + categories.total();
    let category_gain = categories.weighted_by(&rates.categories);

    let (contribution, gain, carried_balance) = match previous {
        None => (
            inputs.initial_investment + recurring,
            inputs.initial_investment * rates.total + category_gain,
            0.0,
        ),
        Some(prev) => (
            recurring,
            prev.year_end_balance * rates.total + category_gain,
            prev.year_end_balance,
        ),
    };

    let zero = AssetAmounts::default();
    let (prev_categories, prev_contributions, prev_gains) = previous
        .map(|prev| {
            (
                &prev.cumulative_contributions_by_category,
                prev.cumulative_total_contributions,
                prev.cumulative_investment_gains,
            )
        })
        .unwrap_or((&zero, 0.0, 0.0));

    let cumulative_investment_gains = prev_gains + gain;
    let year_end_balance = carried_balance + contribution + gain;
    let inflation_adjusted_balance =
        year_end_balance / inflation_factor(inputs.inflation_rate, year_index + 1);

    let tax_branch = tax_branch_for_year(inputs, year_index);
    let (taxes_paid, early_withdrawal_penalty) = match tax_branch {
        TaxBranch::EarlyWithdrawal => (
            cumulative_investment_gains * inputs.capital_gains_tax_rate,
            year_end_balance * inputs.early_withdrawal_penalty_rate,
        ),
        TaxBranch::Standard => (year_end_balance * inputs.income_tax_rate, 0.0),
    };

    YearRecord {
        year: year_index + 1,
        contribution,
        gain,
        cumulative_contributions_by_category: prev_categories.plus(categories),
        cumulative_total_contributions: prev_contributions + contribution,
        cumulative_investment_gains,
        year_end_balance,
        inflation_adjusted_balance,
        taxes_paid,
        early_withdrawal_penalty,
        tax_branch,
    }
}

fn tax_branch_for_year(inputs: &SimulationInputs, year_index: u32) -> TaxBranch {
    let simulated_age = u64::from(inputs.current_age) + u64::from(year_index);
    if simulated_age < u64::from(inputs.early_withdrawal_age) {
        TaxBranch::EarlyWithdrawal
    } else {
        TaxBranch::Standard
    }
}

fn inflation_factor(inflation_rate: f64, elapsed_years: u32) -> f64 {
    (1.0 + inflation_rate).powi(elapsed_years as i32)
}

pub fn summarize(records: &[YearRecord]) -> Result<Summary, ProjectionError> {
    let Some(last) = records.last() else {
        return Err(ProjectionError::invalid(
            "horizon_years",
            "projection produced no years",
        ));
    };

    Ok(Summary {
        horizon_years: records.len() as u32,
        total_contributions: last.cumulative_total_contributions,
        total_gains: last.cumulative_investment_gains,
        final_balance: last.year_end_balance,
        final_inflation_adjusted_balance: last.inflation_adjusted_balance,
        total_taxes_paid: records.iter().map(|r| r.taxes_paid).sum(),
        total_early_withdrawal_penalty: records.iter().map(|r| r.early_withdrawal_penalty).sum(),
    })
}

impl Summary {
    pub fn average_annual_return(&self) -> Result<f64, ProjectionError> {
        if self.total_contributions == 0.0 {
            return Err(ProjectionError::UndefinedAverageReturn);
        }
        let growth = self.final_balance / self.total_contributions;
        Ok(growth.powf(1.0 / f64::from(self.horizon_years)) - 1.0)
    }
}
