//! C7: opportunity engine orchestration — runs all six calculators, applies
//! the filter pipeline, and groups the survivors by category (spec §4.7).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::opportunity::{ActionCategory, OpportunitiesByCategory};
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::repositories::DismissedFilterRepository;
use crate::domain::scorer::Scorer;
use crate::domain::security::Security;

use super::calculators;
use super::filters;

pub struct OpportunityConfig {
    pub profit_taking_gain_threshold: f64,
    pub averaging_down_loss_threshold: f64,
    pub lot_value_eur: Decimal,
    pub opportunity_buy_min_score: f64,
    pub max_per_group: usize,
    pub excluded_tags: HashSet<String>,
}

impl Default for OpportunityConfig {
    fn default() -> Self {
        Self {
            profit_taking_gain_threshold: 0.15,
            averaging_down_loss_threshold: 0.10,
            lot_value_eur: Decimal::new(500, 0),
            opportunity_buy_min_score: 0.6,
            max_per_group: 3,
            excluded_tags: HashSet::new(),
        }
    }
}

pub struct OpportunityService {
    dismissed: Arc<dyn DismissedFilterRepository>,
    config: OpportunityConfig,
}

impl OpportunityService {
    pub fn new(dismissed: Arc<dyn DismissedFilterRepository>, config: OpportunityConfig) -> Self {
        Self { dismissed, config }
    }

    pub fn config(&self) -> &OpportunityConfig {
        &self.config
    }

    pub async fn generate(
        &self,
        snapshot: &PortfolioSnapshot,
        securities: &HashMap<String, Security>,
        scorer: &dyn Scorer,
        scoring_inputs: &HashMap<String, crate::domain::scorer::ScoringInputs>,
        country_weights: (&HashMap<String, f64>, &HashMap<String, f64>),
        industry_weights: (&HashMap<String, f64>, &HashMap<String, f64>),
    ) -> SentinelResult<OpportunitiesByCategory> {
        let scores: HashMap<String, f64> = scoring_inputs
            .iter()
            .map(|(isin, inputs)| (isin.clone(), scorer.score(inputs).total))
            .collect();

        let mut all = Vec::new();
        all.extend(calculators::profit_taking(
            snapshot,
            securities,
            self.config.profit_taking_gain_threshold,
        ));
        all.extend(calculators::averaging_down(
            snapshot,
            securities,
            self.config.averaging_down_loss_threshold,
            self.config.lot_value_eur,
        ));
        all.extend(calculators::opportunity_buys(
            snapshot,
            securities,
            &scores,
            self.config.lot_value_eur,
            self.config.opportunity_buy_min_score,
        ));
        all.extend(calculators::rebalance_sells(
            snapshot,
            securities,
            country_weights.0,
            country_weights.1,
            |s| Some(s.country.clone()),
        ));
        all.extend(calculators::rebalance_buys(
            securities,
            country_weights.0,
            country_weights.1,
            |s| Some(s.country.clone()),
            self.config.lot_value_eur,
        ));
        all.extend(calculators::weight_based(snapshot, securities, |s| {
            industry_weights.1.get(&s.industry).copied()
        }));

        let dismissed_pairs: HashSet<(Isin, String)> = self
            .dismissed
            .all()
            .await?
            .into_iter()
            .map(|(isin, calc, _reason)| (isin, calc))
            .collect();

        let filtered = filters::exclude_dismissed(all, &dismissed_pairs);
        let filtered = filters::exclude_by_tag(filtered, securities, &self.config.excluded_tags);
        let filtered = filters::cap_per_group(
            filtered,
            securities,
            |s| Some(s.industry.clone()),
            self.config.max_per_group,
        );

        let mut grouped: OpportunitiesByCategory = HashMap::new();
        for candidate in filtered {
            grouped.entry(candidate.category).or_default().push(candidate);
        }
        for category in ActionCategory::all() {
            grouped.entry(category).or_default();
        }
        Ok(grouped)
    }
}
