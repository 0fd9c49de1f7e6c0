use chrono::{DateTime, Duration, Utc};
use password_hash::rand_core::{OsRng, RngCore};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Order, OrderStatus},
    services::state_machine::{MAX_WRITE_ATTEMPTS, OrderStateMachine, Trigger},
};

pub const CODE_LENGTH: usize = 4;
const CODE_SPACE: u32 = 10_000;

/// Uniform 4-digit code, `"0000"` to `"9999"`.
pub fn generate_code() -> String {
    // Reject the top partial bucket so every code is equally likely.
    let zone = u32::MAX - u32::MAX % CODE_SPACE;
    loop {
        let n = OsRng.next_u32();
        if n < zone {
            return format!("{:0width$}", n % CODE_SPACE, width = CODE_LENGTH);
        }
    }
}

pub fn validate_code_format(code: &str) -> AppResult<()> {
    if code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "delivery code must be exactly 4 digits".into(),
        ))
    }
}

/// Lockout applied after repeated wrong codes on one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePolicy {
    pub max_attempts: i32,
    pub lockout: Duration,
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum VerificationFailure {
    AlreadyDelivered,
    NotDelivering,
    Locked { until: DateTime<Utc> },
    IncorrectCode { attempts_left: i32 },
}

impl VerificationFailure {
    pub fn message(&self) -> &'static str {
        match self {
            VerificationFailure::AlreadyDelivered => "already delivered",
            VerificationFailure::NotDelivering => "not in delivering state",
            VerificationFailure::Locked { .. } => "too many attempts",
            VerificationFailure::IncorrectCode { .. } => "incorrect code",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub success: bool,
    pub message: String,
    pub failure: Option<VerificationFailure>,
    /// State of the order after the attempt.
    pub order: Order,
}

impl VerificationOutcome {
    fn delivered(order: Order) -> Self {
        Self {
            success: true,
            message: "delivered".into(),
            failure: None,
            order,
        }
    }

    fn failed(failure: VerificationFailure, order: Order) -> Self {
        Self {
            success: false,
            message: failure.message().into(),
            failure: Some(failure),
            order,
        }
    }
}

/// The only path into `delivered`.
#[derive(Clone)]
pub struct DeliveryCodeVerifier {
    machine: OrderStateMachine,
    policy: CodePolicy,
}

impl DeliveryCodeVerifier {
    pub fn new(machine: OrderStateMachine, policy: CodePolicy) -> Self {
        Self { machine, policy }
    }

    pub fn policy(&self) -> CodePolicy {
        self.policy
    }

    /// The live order carrying `code`. Delivered orders and orders not yet
    /// picked up never match.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Order> {
        validate_code_format(code)?;
        let mut matches = self.machine.repository().find_live_by_code(code).await?;
        match matches.len() {
            0 => Err(AppError::NotFound),
            1 => Ok(matches.remove(0)),
            n => {
                tracing::warn!(code_matches = n, "delivery code collision among live orders");
                Err(AppError::AmbiguousCode)
            }
        }
    }

    /// Re-checks the code against the order at write time and, on a match,
    /// moves it to `delivered` in the same conditional write.
    pub async fn verify(
        &self,
        order_id: Uuid,
        entered_code: &str,
    ) -> AppResult<VerificationOutcome> {
        validate_code_format(entered_code)?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let order = self.machine.get(order_id).await?;

            if order.is_delivered {
                return Ok(VerificationOutcome::failed(
                    VerificationFailure::AlreadyDelivered,
                    order,
                ));
            }
            if order.status != OrderStatus::Delivering {
                return Ok(VerificationOutcome::failed(
                    VerificationFailure::NotDelivering,
                    order,
                ));
            }

            let now = Utc::now();
            if let Some(until) = order.code_locked_until.filter(|until| *until > now) {
                return Ok(VerificationOutcome::failed(
                    VerificationFailure::Locked { until },
                    order,
                ));
            }

            if entered_code != order.delivery_code {
                let next = self.record_failed_attempt(&order, now);
                if !self
                    .machine
                    .repository()
                    .update_if_version(&next, order.version)
                    .await?
                {
                    continue;
                }
                tracing::info!(
                    order_id = %order.id,
                    attempts = next.failed_code_attempts,
                    locked = next.code_locked_until.is_some(),
                    "incorrect delivery code"
                );
                let failure = match next.code_locked_until {
                    Some(until) if until > now => VerificationFailure::Locked { until },
                    _ => VerificationFailure::IncorrectCode {
                        attempts_left: self.policy.max_attempts - next.failed_code_attempts,
                    },
                };
                return Ok(VerificationOutcome::failed(failure, next));
            }

            if let Some(delivered) = self
                .machine
                .try_apply(&order, OrderStatus::Delivered, Trigger::CodeVerified, None)
                .await?
            {
                return Ok(VerificationOutcome::delivered(delivered));
            }
        }

        let order = self.machine.get(order_id).await?;
        Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Delivered,
        })
    }

    fn record_failed_attempt(&self, order: &Order, now: DateTime<Utc>) -> Order {
        let mut next = order.clone();
        next.failed_code_attempts += 1;
        if next.failed_code_attempts >= self.policy.max_attempts {
            next.failed_code_attempts = 0;
            next.code_locked_until = Some(now + self.policy.lockout);
        }
        next.version = order.version + 1;
        next.updated_at = now;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_four_ascii_digits() {
        for _ in 0..500 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            assert!(validate_code_format(&code).is_ok(), "bad code {code}");
        }
    }

    #[test]
    fn rejects_malformed_codes() {
        for code in ["", "123", "12345", "12a4", " 123", "١٢٣٤"] {
            assert!(
                matches!(validate_code_format(code), Err(AppError::Validation(_))),
                "{code:?} should be rejected"
            );
        }
        assert!(validate_code_format("0042").is_ok());
    }

    #[test]
    fn failure_messages_match_driver_copy() {
        assert_eq!(VerificationFailure::AlreadyDelivered.message(), "already delivered");
        assert_eq!(VerificationFailure::NotDelivering.message(), "not in delivering state");
        assert_eq!(
            VerificationFailure::IncorrectCode { attempts_left: 2 }.message(),
            "incorrect code"
        );
    }
}
