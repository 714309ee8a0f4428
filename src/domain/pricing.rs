//! Per-model pricing entity.

use rust_decimal::Decimal;

use super::foundation::{CostAmount, ModelId, Timestamp, TokenCount, ValidationError};

/// Monetary rate for a model, expressed per million tokens.
///
/// Read-only from the gateway's perspective; rows are seeded externally.
#[derive(Debug, Clone, PartialEq)]
pub struct Pricing {
    model: ModelId,
    input_price_per_million: Decimal,
    output_price_per_million: Decimal,
    max_context: i32,
    updated_at: Timestamp,
}

impl Pricing {
    /// Creates a pricing row, enforcing non-negative prices and a positive
    /// context window.
    pub fn new(
        model: ModelId,
        input_price_per_million: Decimal,
        output_price_per_million: Decimal,
        max_context: i32,
        updated_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if input_price_per_million.is_sign_negative()
            || output_price_per_million.is_sign_negative()
        {
            return Err(ValidationError::invalid_format(
                "price",
                "prices must be non-negative",
            ));
        }
        if max_context <= 0 {
            return Err(ValidationError::out_of_range(
                "max_context",
                1.0,
                f64::from(i32::MAX),
                f64::from(max_context),
            ));
        }
        Ok(Self {
            model,
            input_price_per_million,
            output_price_per_million,
            max_context,
            updated_at,
        })
    }

    /// The model this pricing applies to.
    pub fn model(&self) -> &ModelId {
        &self.model
    }

    /// USD per million input tokens.
    pub fn input_price_per_million(&self) -> Decimal {
        self.input_price_per_million
    }

    /// USD per million output tokens.
    pub fn output_price_per_million(&self) -> Decimal {
        self.output_price_per_million
    }

    /// Maximum context window of the model, in tokens.
    pub fn max_context(&self) -> i32 {
        self.max_context
    }

    /// When this row was last refreshed.
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Computes the cost of a request:
    /// `(input / 1e6) * input_price + (output / 1e6) * output_price`.
    pub fn cost(&self, input_tokens: TokenCount, output_tokens: TokenCount) -> CostAmount {
        let million = Decimal::from(1_000_000u32);
        let input = Decimal::from(input_tokens.as_u32()) / million * self.input_price_per_million;
        let output =
            Decimal::from(output_tokens.as_u32()) / million * self.output_price_per_million;
        // Component amounts are non-negative, so construction cannot fail.
        CostAmount::new(input + output).unwrap_or(CostAmount::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pricing(input: Decimal, output: Decimal) -> Pricing {
        Pricing::new(
            ModelId::new("a/x").unwrap(),
            input,
            output,
            128_000,
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn computes_cost_per_million_tokens() {
        let p = pricing(dec!(1.0), dec!(2.0));
        let cost = p.cost(TokenCount::new(100), TokenCount::new(200));
        // 100/1e6 * 1.0 + 200/1e6 * 2.0 = 0.0005
        assert_eq!(cost.as_decimal(), dec!(0.0005));
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        let p = pricing(dec!(3.0), dec!(15.0));
        assert_eq!(p.cost(TokenCount::ZERO, TokenCount::ZERO), CostAmount::ZERO);
    }

    #[test]
    fn rejects_negative_prices() {
        let result = Pricing::new(
            ModelId::new("a/x").unwrap(),
            dec!(-1.0),
            dec!(2.0),
            128_000,
            Timestamp::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_positive_context() {
        let result = Pricing::new(
            ModelId::new("a/x").unwrap(),
            dec!(1.0),
            dec!(2.0),
            0,
            Timestamp::now(),
        );
        assert!(result.is_err());
    }
}
