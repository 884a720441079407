// Copyright (c) 2024 Botho Foundation

//! Governance parameters.
//!
//! Parameters are plain serde structs stored as one blob per module under
//! `params/{clock,oracle,treasury,budget}` and threaded through
//! [`crate::Context`]. Every table takes serde defaults so that a TOML file
//! only needs to name what it overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    dec::Dec,
    error::{StabilityError, StabilityResult},
    store::{get_value, set_value, KvStore, StoreResult},
    types::{validate_denom, Coin},
};

const KEY_CLOCK: &[u8] = b"params/clock";
const KEY_ORACLE: &[u8] = b"params/oracle";
const KEY_TREASURY: &[u8] = b"params/treasury";
const KEY_BUDGET: &[u8] = b"params/budget";

/// Epoch length and the native denomination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockParams {
    /// Denomination whose supply backs the stable denominations.
    pub native_denom: String,

    /// Blocks per epoch; treasury policy is updated on the last block.
    pub blocks_per_epoch: u64,
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            native_denom: "ubth".to_string(),
            blocks_per_epoch: 100_800, // ~1 week at 6s blocks
        }
    }
}

/// Oracle voting parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleParams {
    /// Blocks per voting period.
    pub vote_period: u64,

    /// Fraction of bonded power that must reveal for a price to update.
    pub vote_threshold: Dec,

    /// Relative tolerance around the median that still earns a reward.
    pub reward_band: Dec,

    /// Voting periods over which the reward pool is paid out.
    pub reward_distribution_window: u64,

    /// Missed periods at which the staking module is signalled.
    pub miss_threshold: u64,

    /// Voting periods after which every miss counter resets.
    pub miss_window: u64,

    /// Accepted denominations. Empty accepts any well-formed denom.
    pub whitelist: Vec<String>,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            vote_period: 10,                      // 1 minute at 6s blocks
            vote_threshold: Dec::with_prec(67, 2), // 2/3 + ε of bonded power
            reward_band: Dec::with_prec(1, 2),     // ±1% of the median
            reward_distribution_window: 10_080,   // 1 week of periods
            miss_threshold: 10,
            miss_window: 10_080,
            whitelist: Vec::new(),
        }
    }
}

/// Bounds applied to a controlled rate each time it is updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConstraints {
    pub rate_min: Dec,
    pub rate_max: Dec,
    /// Largest allowed change per update, in either direction.
    pub change_rate_max: Dec,
}

impl PolicyConstraints {
    /// Limit `proposed` to within `change_rate_max` of `previous`, then to
    /// `[rate_min, rate_max]`. When `previous` is in range both bounds hold.
    pub fn clamp(&self, previous: Dec, proposed: Dec) -> Dec {
        let step_limited = proposed.clamp_to(
            previous - self.change_rate_max,
            previous + self.change_rate_max,
        );
        step_limited.clamp_to(self.rate_min, self.rate_max)
    }

    /// Whether `rate` lies in `[rate_min, rate_max]`.
    pub fn contains(&self, rate: Dec) -> bool {
        rate >= self.rate_min && rate <= self.rate_max
    }

    fn validate(&self, name: &str) -> StabilityResult<()> {
        if self.rate_min.is_negative() || self.change_rate_max.is_negative() {
            return Err(invalid(format!("{name}: bounds must not be negative")));
        }
        if self.rate_min > self.rate_max {
            return Err(invalid(format!("{name}: rate_min exceeds rate_max")));
        }
        Ok(())
    }
}

/// What happens to the deposit of a program that fails its vote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositPolicy {
    #[default]
    Burn,
    Refund,
}

/// Tax and seigniorage policy parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasuryParams {
    pub tax_policy: PolicyConstraints,

    pub reward_policy: PolicyConstraints,

    /// Per-transaction tax cap for denominations not in `tax_caps`.
    pub default_tax_cap: u64,

    pub tax_caps: BTreeMap<String, u64>,

    /// Below this effective tax ratio the rate grows multiplicatively.
    pub tax_ratio_floor: Dec,

    /// Effective tax ratio the additive step steers toward.
    pub tax_ratio_target: Dec,

    /// Growth factor applied in the multiplicative branch; must exceed one.
    pub mining_increment: Dec,

    /// Target share of seigniorage in total miner income.
    pub seigniorage_burden_target: Dec,

    /// Epochs kept in the indicator window.
    pub window_length: u64,

    /// Epochs after genesis during which policy is not updated.
    pub window_probation: u64,
}

impl Default for TreasuryParams {
    fn default() -> Self {
        Self {
            tax_policy: PolicyConstraints {
                rate_min: Dec::with_prec(5, 4),        // 0.05%
                rate_max: Dec::with_prec(1, 2),        // 1%
                change_rate_max: Dec::with_prec(25, 5), // 0.025% per epoch
            },
            reward_policy: PolicyConstraints {
                rate_min: Dec::ZERO,
                rate_max: Dec::ONE,
                change_rate_max: Dec::ONE,
            },
            default_tax_cap: 1_000_000,
            tax_caps: BTreeMap::new(),
            tax_ratio_floor: Dec::with_prec(2, 4),  // 0.02%
            tax_ratio_target: Dec::with_prec(1, 3), // 0.1%
            mining_increment: Dec::with_prec(107, 2),
            seigniorage_burden_target: Dec::with_prec(67, 2),
            window_length: 4,
            window_probation: 12,
        }
    }
}

impl TreasuryParams {
    pub fn tax_cap(&self, denom: &str) -> u64 {
        self.tax_caps
            .get(denom)
            .copied()
            .unwrap_or(self.default_tax_cap)
    }
}

/// Budget program parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetParams {
    /// Blocks between submission and the single evaluation of a program.
    pub vote_period: u64,

    /// Approving fraction of voting power needed, inclusive.
    pub threshold: Dec,

    /// Fixed deposit escrowed on submission.
    pub deposit: Coin,

    pub rejected_deposit: DepositPolicy,

    pub max_title_len: usize,

    pub max_description_len: usize,

    /// Pay the budget pool out to active programs at each epoch end.
    pub fund_active_programs: bool,
}

impl Default for BudgetParams {
    fn default() -> Self {
        Self {
            vote_period: 100_800, // ~1 week at 6s blocks
            threshold: Dec::with_prec(5, 1),
            deposit: Coin::new("usdr", 100_000_000),
            rejected_deposit: DepositPolicy::Burn,
            max_title_len: 140,
            max_description_len: 5000,
            fund_active_programs: true,
        }
    }
}

/// All engine parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub clock: ClockParams,
    pub oracle: OracleParams,
    pub treasury: TreasuryParams,
    pub budget: BudgetParams,
}

fn invalid(msg: String) -> StabilityError {
    StabilityError::InvalidParams(msg)
}

fn check_fraction(name: &str, value: Dec) -> StabilityResult<()> {
    if value.is_negative() || value > Dec::ONE {
        return Err(invalid(format!("{name} must be within [0, 1], got {value}")));
    }
    Ok(())
}

fn check_nonzero(name: &str, value: u64) -> StabilityResult<()> {
    if value == 0 {
        return Err(invalid(format!("{name} must be positive")));
    }
    Ok(())
}

impl Params {
    pub fn validate(&self) -> StabilityResult<()> {
        validate_denom(&self.clock.native_denom)?;
        check_nonzero("clock.blocks_per_epoch", self.clock.blocks_per_epoch)?;

        let oracle = &self.oracle;
        check_nonzero("oracle.vote_period", oracle.vote_period)?;
        check_nonzero(
            "oracle.reward_distribution_window",
            oracle.reward_distribution_window,
        )?;
        check_nonzero("oracle.miss_window", oracle.miss_window)?;
        check_fraction("oracle.vote_threshold", oracle.vote_threshold)?;
        check_fraction("oracle.reward_band", oracle.reward_band)?;
        for denom in &oracle.whitelist {
            validate_denom(denom)?;
        }

        let treasury = &self.treasury;
        treasury.tax_policy.validate("treasury.tax_policy")?;
        treasury.reward_policy.validate("treasury.reward_policy")?;
        if treasury.reward_policy.rate_max > Dec::ONE {
            return Err(invalid("treasury.reward_policy: rate_max exceeds one".into()));
        }
        check_nonzero("treasury.window_length", treasury.window_length)?;
        if treasury.mining_increment <= Dec::ONE {
            return Err(invalid("treasury.mining_increment must exceed 1".into()));
        }
        check_fraction("treasury.tax_ratio_floor", treasury.tax_ratio_floor)?;
        check_fraction("treasury.tax_ratio_target", treasury.tax_ratio_target)?;
        check_fraction(
            "treasury.seigniorage_burden_target",
            treasury.seigniorage_burden_target,
        )?;

        let budget = &self.budget;
        check_nonzero("budget.vote_period", budget.vote_period)?;
        check_fraction("budget.threshold", budget.threshold)?;
        validate_denom(&budget.deposit.denom)?;
        Ok(())
    }

    /// Load stored parameters; modules never written fall back to defaults.
    pub fn load(store: &dyn KvStore) -> StoreResult<Self> {
        Ok(Self {
            clock: get_value(store, KEY_CLOCK)?.unwrap_or_default(),
            oracle: get_value(store, KEY_ORACLE)?.unwrap_or_default(),
            treasury: get_value(store, KEY_TREASURY)?.unwrap_or_default(),
            budget: get_value(store, KEY_BUDGET)?.unwrap_or_default(),
        })
    }

    pub fn save(&self, store: &mut dyn KvStore) -> StoreResult<()> {
        set_value(store, KEY_CLOCK, &self.clock)?;
        set_value(store, KEY_ORACLE, &self.oracle)?;
        set_value(store, KEY_TREASURY, &self.treasury)?;
        set_value(store, KEY_BUDGET, &self.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        Params::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut params = Params::default();
        params.oracle.vote_period = 0;
        assert!(matches!(params.validate(), Err(StabilityError::InvalidParams(_))));

        let mut params = Params::default();
        params.treasury.mining_increment = Dec::ONE;
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.budget.threshold = dec("1.5");
        assert!(params.validate().is_err());

        let mut params = Params::default();
        params.treasury.tax_policy.rate_min = dec("0.5");
        params.treasury.tax_policy.rate_max = dec("0.1");
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_policy_clamp() {
        let policy = TreasuryParams::default().tax_policy;
        // step limited to +0.00025
        assert_eq!(policy.clamp(dec("0.001"), dec("0.005")), dec("0.00125"));
        // step limited to -0.00025
        assert_eq!(policy.clamp(dec("0.001"), dec("0")), dec("0.00075"));
        // bounded below by rate_min
        assert_eq!(policy.clamp(dec("0.0006"), dec("0.0001")), dec("0.0005"));
        // bounded above by rate_max
        assert_eq!(policy.clamp(dec("0.0099"), dec("0.02")), dec("0.01"));
    }

    #[test]
    fn test_tax_cap_lookup() {
        let mut treasury = TreasuryParams::default();
        treasury.tax_caps.insert("ukrw".into(), 1_500_000_000);
        assert_eq!(treasury.tax_cap("ukrw"), 1_500_000_000);
        assert_eq!(treasury.tax_cap("usdr"), 1_000_000);
    }

    #[test]
    fn test_load_save() {
        let mut store = MemStore::new();
        assert_eq!(Params::load(&store).unwrap(), Params::default());

        let mut params = Params::default();
        params.oracle.vote_period = 5;
        params.budget.rejected_deposit = DepositPolicy::Refund;
        params.save(&mut store).unwrap();
        assert_eq!(Params::load(&store).unwrap(), params);
    }

    #[test]
    fn test_toml_partial_override() {
        let params: Params = toml::from_str(
            r#"
            [oracle]
            vote_period = 5
            vote_threshold = "0.5"

            [budget]
            rejected_deposit = "refund"
            "#,
        )
        .unwrap();
        assert_eq!(params.oracle.vote_period, 5);
        assert_eq!(params.oracle.vote_threshold, dec("0.5"));
        assert_eq!(params.oracle.reward_band, OracleParams::default().reward_band);
        assert_eq!(params.budget.rejected_deposit, DepositPolicy::Refund);
    }
}
