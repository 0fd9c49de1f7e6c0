use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::OrderDish,
};

const BPS_DENOMINATOR: i64 = 10_000;

/// Largest quantity a single cart line may carry.
pub const MAX_LINE_QUANTITY: i32 = 1_000;

/// Flat-rate delivery with a free-delivery threshold plus a percentage
/// service fee. Amounts are minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PricingPolicy {
    pub base_rate: i64,
    pub free_delivery_threshold: i64,
    /// Service fee in basis points (1200 = 12%).
    pub service_fee_bps: i64,
}

impl PricingPolicy {
    pub fn new(base_rate: i64, free_delivery_threshold: i64, service_fee_bps: i64) -> Self {
        Self {
            base_rate,
            free_delivery_threshold,
            service_fee_bps,
        }
    }

    /// Builds a policy from a fractional percentage such as `0.12`.
    pub fn with_percentage(base_rate: i64, free_delivery_threshold: i64, percentage: f64) -> Self {
        Self::new(
            base_rate,
            free_delivery_threshold,
            (percentage * BPS_DENOMINATOR as f64).round() as i64,
        )
    }

    fn validate(&self) -> AppResult<()> {
        if self.base_rate < 0 || self.free_delivery_threshold < 0 || self.service_fee_bps < 0 {
            return Err(AppError::Validation(
                "pricing policy values must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::new(2_500, 25_000, 1_200)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub service_fee: i64,
    pub total: i64,
}

/// One cook's slice of a checkout: its own subtotal and an even share of the
/// whole-cart fees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPricing {
    pub cooker_id: Uuid,
    pub dishes: Vec<OrderDish>,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub service_fee: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartPricing {
    pub quote: Quote,
    pub orders: Vec<OrderPricing>,
}

pub fn validate_line_items(items: &[OrderDish]) -> AppResult<()> {
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "quantity for dish {} must be at least 1, got {}",
                item.dish_id, item.quantity
            )));
        }
        if item.quantity > MAX_LINE_QUANTITY {
            return Err(AppError::Validation(format!(
                "quantity for dish {} must be at most {MAX_LINE_QUANTITY}, got {}",
                item.dish_id, item.quantity
            )));
        }
        if item.unit_price < 0 {
            return Err(AppError::Validation(format!(
                "unit price for dish {} must not be negative",
                item.dish_id
            )));
        }
    }
    Ok(())
}

fn amount_too_large() -> AppError {
    AppError::Validation("order amount too large".into())
}

/// Sum of `quantity * unit_price` over `items`, refusing amounts that overflow.
pub fn sum_line_totals(items: &[OrderDish]) -> AppResult<i64> {
    items.iter().try_fold(0i64, |acc, item| {
        item.line_total()
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(amount_too_large)
    })
}

pub fn checked_total(subtotal: i64, delivery_fee: i64, service_fee: i64) -> AppResult<i64> {
    subtotal
        .checked_add(delivery_fee)
        .and_then(|sum| sum.checked_add(service_fee))
        .ok_or_else(amount_too_large)
}

pub fn compute_quote(items: &[OrderDish], policy: &PricingPolicy) -> AppResult<Quote> {
    policy.validate()?;
    validate_line_items(items)?;

    let subtotal = sum_line_totals(items)?;
    let delivery_fee = if !items.is_empty() && subtotal >= policy.free_delivery_threshold {
        0
    } else {
        policy.base_rate
    };
    // Round half up; subtotal and bps are both non-negative here.
    let service_fee = subtotal
        .checked_mul(policy.service_fee_bps)
        .and_then(|scaled| scaled.checked_add(BPS_DENOMINATOR / 2))
        .ok_or_else(amount_too_large)?
        / BPS_DENOMINATOR;

    Ok(Quote {
        subtotal,
        delivery_fee,
        service_fee,
        total: checked_total(subtotal, delivery_fee, service_fee)?,
    })
}

/// Splits `fee` into `parts` shares that sum to `fee`. The first
/// `fee % parts` shares carry one extra minor unit.
pub fn split_fee(fee: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = fee / n;
    let remainder = fee % n;
    (0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Groups `lines` by cook, prices the whole cart once and hands every cook an
/// even share of the cart-level fees. The customer pays the same fees no
/// matter how many cooks fulfil the cart.
pub fn price_cart(lines: &[(Uuid, OrderDish)], policy: &PricingPolicy) -> AppResult<CartPricing> {
    let all: Vec<OrderDish> = lines.iter().map(|(_, dish)| dish.clone()).collect();
    let quote = compute_quote(&all, policy)?;

    let mut by_cook: BTreeMap<Uuid, Vec<OrderDish>> = BTreeMap::new();
    for (cooker_id, dish) in lines {
        by_cook.entry(*cooker_id).or_default().push(dish.clone());
    }

    let delivery_shares = split_fee(quote.delivery_fee, by_cook.len());
    let service_shares = split_fee(quote.service_fee, by_cook.len());

    let orders = by_cook
        .into_iter()
        .zip(delivery_shares.into_iter().zip(service_shares))
        .map(|((cooker_id, dishes), (delivery_fee, service_fee))| {
            let subtotal = sum_line_totals(&dishes)?;
            Ok(OrderPricing {
                cooker_id,
                dishes,
                subtotal,
                delivery_fee,
                service_fee,
                total: checked_total(subtotal, delivery_fee, service_fee)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(CartPricing { quote, orders })
}
