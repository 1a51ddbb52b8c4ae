//! Strategy definitions and the immutable catalog.
//!
//! A catalog is built once at startup and passed into the engines; entries
//! are read-only templates. Callers needing different weights supply an
//! override at call time rather than mutating the catalog.

use crate::domain::error::SiftError;
use crate::domain::filters::{Filter, FilterSet};
use crate::domain::weights::WeightProfile;
use std::collections::BTreeMap;

pub const DEFAULT_MAX_RESULTS: usize = 50;

#[derive(Debug, Clone)]
pub struct StrategyDefinition {
    pub name: String,
    pub description: String,
    pub weights: WeightProfile,
    pub filters: FilterSet,
    pub max_results: usize,
}

impl StrategyDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        weights: WeightProfile,
        filters: FilterSet,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            weights,
            filters,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Immutable name → definition map.
#[derive(Debug, Clone, Default)]
pub struct StrategyCatalog {
    strategies: BTreeMap<String, StrategyDefinition>,
}

impl StrategyCatalog {
    pub fn new(definitions: Vec<StrategyDefinition>) -> Result<Self, SiftError> {
        let mut strategies = BTreeMap::new();
        for def in definitions {
            def.weights.validate()?;
            strategies.insert(def.name.clone(), def);
        }
        Ok(Self { strategies })
    }

    /// The four built-in short-horizon strategies.
    pub fn builtin() -> Self {
        let definitions = vec![
            StrategyDefinition::new(
                "momentum_breakout",
                "Strong momentum with improving technicals breaking out of range",
                WeightProfile::new(0.35, 0.40, 0.20, 0.05, 0.0),
                FilterSet::new(vec![
                    Filter::MinScore(70.0),
                    Filter::MinVolumeRatio(1.5),
                    Filter::MinPriceChange5d(2.0),
                    Filter::RsiRange { min: 30.0, max: 80.0 },
                ]),
            ),
            StrategyDefinition::new(
                "technical_reversal",
                "Oversold names with repairing technical indicators",
                WeightProfile::new(0.50, 0.20, 0.15, 0.15, 0.0),
                FilterSet::new(vec![
                    Filter::MinScore(60.0),
                    Filter::MinVolumeRatio(1.2),
                    Filter::RsiRange { min: 15.0, max: 35.0 },
                    Filter::KdjOversold,
                ]),
            ),
            StrategyDefinition::new(
                "volume_surge",
                "Price breakouts confirmed by expanding volume",
                WeightProfile::new(0.30, 0.25, 0.35, 0.10, 0.0),
                FilterSet::new(vec![
                    Filter::MinScore(65.0),
                    Filter::MinVolumeRatio(2.0),
                    Filter::MinTurnoverRate(3.0),
                    Filter::PriceAboveMa20,
                ]),
            ),
            StrategyDefinition::new(
                "balanced_growth",
                "Steady names scoring well across every dimension",
                WeightProfile::new(0.40, 0.25, 0.20, 0.15, 0.0),
                FilterSet::new(vec![
                    Filter::MinScore(75.0),
                    Filter::MinVolumeRatio(1.0),
                    Filter::MinPriceChange5d(1.0),
                    Filter::MaxVolatilityScore(40.0),
                    Filter::MaAlignment,
                ]),
            ),
        ];
        // Built-in weights are statically valid.
        Self::new(definitions).expect("builtin catalog")
    }

    pub fn get(&self, name: &str) -> Result<&StrategyDefinition, SiftError> {
        self.strategies
            .get(name)
            .ok_or_else(|| SiftError::UnknownStrategy { name: name.into() })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategyDefinition> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// A new catalog with `definition` added or replaced. The original is
    /// untouched.
    pub fn with(&self, definition: StrategyDefinition) -> Result<Self, SiftError> {
        definition.weights.validate()?;
        let mut strategies = self.strategies.clone();
        strategies.insert(definition.name.clone(), definition);
        Ok(Self { strategies })
    }
}
