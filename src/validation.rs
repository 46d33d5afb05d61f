//! Pre-flight validation of trading configurations
//!
//! The orchestrator refuses to start unless every critical check passes.

use crate::config::TradingConfig;
use crate::core::types::{
    Strategy, MAX_GRID_COUNT, MAX_LEVERAGE, MAX_TAKE_PROFIT, MIN_GRID_COUNT, MIN_LEVERAGE,
    MIN_SEED_AMOUNT, MIN_TAKE_PROFIT, PRICE_DECIMALS,
};
use tracing::{error, info, warn};

/// Validation result with detailed findings
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub passed: bool,
    pub checks: Vec<ValidationCheck>,
}

#[derive(Debug, Clone)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub level: ValidationLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Critical,  // Must pass for trading to start
    Warning,   // Should pass, but trading can start
    Info,      // Informational only
}

impl ValidationResult {
    pub fn new() -> Self {
        ValidationResult {
            passed: true,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, check: ValidationCheck) {
        if !check.passed && check.level == ValidationLevel::Critical {
            self.passed = false;
        }
        self.checks.push(check);
    }

    pub fn critical_failures(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Critical)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Warning)
            .collect()
    }

    /// Human-readable violations, one per failed critical check
    pub fn errors(&self) -> Vec<String> {
        self.critical_failures()
            .into_iter()
            .map(|c| c.message.clone())
            .collect()
    }

    pub fn display(&self) {
        info!("🔍 Configuration Validation");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        for check in &self.checks {
            let icon = if check.passed {
                "✅"
            } else {
                match check.level {
                    ValidationLevel::Critical => "❌",
                    ValidationLevel::Warning => "⚠️",
                    ValidationLevel::Info => "ℹ️",
                }
            };

            info!("{} {} - {}", icon, check.name, check.message);
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if !self.passed {
            let failures = self.critical_failures();
            error!("❌ Validation failed: {} critical issue(s)", failures.len());
            for failure in failures {
                error!("   • {}: {}", failure.name, failure.message);
            }
        } else {
            let warnings = self.warnings();
            if !warnings.is_empty() {
                warn!("⚠️  {} warning(s) detected", warnings.len());
                for warning in warnings {
                    warn!("   • {}: {}", warning.name, warning.message);
                }
            }
            info!("✅ All critical checks passed");
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Rule checks for a candidate trading configuration
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &TradingConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.add_check(Self::check_symbol(config));
        result.add_check(Self::check_leverage(config));
        for check in Self::check_price_range(config) {
            result.add_check(check);
        }
        result.add_check(Self::check_grid_count(config));
        if let Some(check) = Self::check_direction(config) {
            result.add_check(check);
        }
        if let Some(check) = Self::check_grid_spacing(config) {
            result.add_check(check);
        }
        result.add_check(Self::check_take_profit(config));
        for check in Self::check_seed_amount(config) {
            result.add_check(check);
        }

        result
    }

    fn check_symbol(config: &TradingConfig) -> ValidationCheck {
        let passed = !config.symbol.trim().is_empty();
        ValidationCheck {
            name: "Symbol".to_string(),
            passed,
            message: if passed {
                config.symbol.clone()
            } else {
                "Coin symbol is required".to_string()
            },
            level: ValidationLevel::Critical,
        }
    }

    fn check_leverage(config: &TradingConfig) -> ValidationCheck {
        let passed = (MIN_LEVERAGE..=MAX_LEVERAGE).contains(&config.leverage);
        ValidationCheck {
            name: "Leverage".to_string(),
            passed,
            message: if passed {
                format!("{}x", config.leverage)
            } else {
                format!("Leverage must be between {} and {}", MIN_LEVERAGE, MAX_LEVERAGE)
            },
            level: ValidationLevel::Critical,
        }
    }

    fn check_price_range(config: &TradingConfig) -> Vec<ValidationCheck> {
        let mut checks = Vec::new();

        if !config.from_price.is_finite() || !config.to_price.is_finite() {
            checks.push(ValidationCheck {
                name: "Price Range".to_string(),
                passed: false,
                message: "Prices must be finite numbers".to_string(),
                level: ValidationLevel::Critical,
            });
            return checks;
        }

        if config.from_price == config.to_price {
            checks.push(ValidationCheck {
                name: "Price Range".to_string(),
                passed: false,
                message: "From price must be different from to price".to_string(),
                level: ValidationLevel::Critical,
            });
        }

        if config.from_price <= 0.0 || config.to_price <= 0.0 {
            checks.push(ValidationCheck {
                name: "Price Range".to_string(),
                passed: false,
                message: "Prices must be greater than 0".to_string(),
                level: ValidationLevel::Critical,
            });
        }

        if checks.is_empty() {
            checks.push(ValidationCheck {
                name: "Price Range".to_string(),
                passed: true,
                message: format!("{:.2} - {:.2}", config.from_price, config.to_price),
                level: ValidationLevel::Info,
            });
        }

        checks
    }

    /// Long ladders step down from `from_price`, short ladders up from
    /// `to_price`. A range given the other way round only sets the width.
    fn check_direction(config: &TradingConfig) -> Option<ValidationCheck> {
        let (inverted, hint) = match config.strategy {
            Strategy::Long => (config.from_price < config.to_price, "long grids buy below from_price"),
            Strategy::Short => (config.to_price < config.from_price, "short grids sell above to_price"),
        };
        if !inverted {
            return None;
        }

        Some(ValidationCheck {
            name: "Grid Direction".to_string(),
            passed: false,
            message: format!(
                "Range {:.2} -> {:.2} is inverted: {}, the other bound only sets the width",
                config.from_price, config.to_price, hint
            ),
            level: ValidationLevel::Warning,
        })
    }

    fn check_grid_spacing(config: &TradingConfig) -> Option<ValidationCheck> {
        if config.grid_count == 0 {
            return None;
        }

        let tick = 10f64.powi(-(PRICE_DECIMALS as i32));
        let step = (config.to_price - config.from_price).abs() / config.grid_count as f64;
        if !step.is_finite() || step == 0.0 || step >= tick {
            return None;
        }

        Some(ValidationCheck {
            name: "Grid Spacing".to_string(),
            passed: false,
            message: format!("Step {:.4} is below the {} price tick; levels will round onto each other", step, tick),
            level: ValidationLevel::Warning,
        })
    }

    fn check_grid_count(config: &TradingConfig) -> ValidationCheck {
        let passed = (MIN_GRID_COUNT..=MAX_GRID_COUNT).contains(&config.grid_count);
        ValidationCheck {
            name: "Grid Count".to_string(),
            passed,
            message: if passed {
                format!("{} levels", config.grid_count)
            } else {
                format!("Grid count must be between {} and {}", MIN_GRID_COUNT, MAX_GRID_COUNT)
            },
            level: ValidationLevel::Critical,
        }
    }

    fn check_take_profit(config: &TradingConfig) -> ValidationCheck {
        let pct = config.take_profit_percent;
        let passed = (MIN_TAKE_PROFIT..=MAX_TAKE_PROFIT).contains(&pct);
        ValidationCheck {
            name: "Take Profit".to_string(),
            passed,
            message: if passed {
                format!("{:.2}%", pct)
            } else {
                format!("Take profit must be between {}% and {}%", MIN_TAKE_PROFIT, MAX_TAKE_PROFIT)
            },
            level: ValidationLevel::Critical,
        }
    }

    fn check_seed_amount(config: &TradingConfig) -> Vec<ValidationCheck> {
        let mut checks = Vec::new();

        if !config.seed_amount.is_finite() {
            checks.push(ValidationCheck {
                name: "Seed Amount".to_string(),
                passed: false,
                message: "Seed amount must be a finite number".to_string(),
                level: ValidationLevel::Critical,
            });
            return checks;
        }

        if config.seed_amount <= 0.0 {
            checks.push(ValidationCheck {
                name: "Seed Amount".to_string(),
                passed: false,
                message: "Seed amount must be greater than 0".to_string(),
                level: ValidationLevel::Critical,
            });
        }

        if config.seed_amount < MIN_SEED_AMOUNT {
            checks.push(ValidationCheck {
                name: "Seed Amount".to_string(),
                passed: false,
                message: format!("Minimum seed amount is ${}", MIN_SEED_AMOUNT),
                level: ValidationLevel::Critical,
            });
        }

        if checks.is_empty() {
            checks.push(ValidationCheck {
                name: "Seed Amount".to_string(),
                passed: true,
                message: format!("${:.2}", config.seed_amount),
                level: ValidationLevel::Info,
            });
        }

        checks
    }
}
