use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Lifecycle state of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Actions that move an order between lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleAction {
    Transfer,
    Pause,
    Resume,
    Complete,
}

impl OrderStatus {
    pub fn from_code(code: &str) -> Result<Self, ServiceError> {
        match code.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(OrderStatus::Active),
            "paused" => Ok(OrderStatus::Paused),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(ServiceError::ValidationError(format!(
                "Unknown order status: {other}"
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Returns the state reached by applying `action`, or `InvalidState`.
    ///
    /// Transfers keep the order active; they are only legal while active.
    pub fn apply(self, action: LifecycleAction) -> Result<OrderStatus, ServiceError> {
        use LifecycleAction::*;
        use OrderStatus::*;

        match (self, action) {
            (Active, Transfer) => Ok(Active),
            (Active, Pause) => Ok(Paused),
            (Paused, Resume) => Ok(Active),
            (Active, Complete) => Ok(Completed),
            (from, action) => Err(ServiceError::InvalidState(format!(
                "cannot {action} an order that is {from}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use LifecycleAction::*;

    #[test]
    fn legal_transitions() {
        assert_eq!(OrderStatus::Active.apply(Transfer).unwrap(), OrderStatus::Active);
        assert_eq!(OrderStatus::Active.apply(Pause).unwrap(), OrderStatus::Paused);
        assert_eq!(OrderStatus::Paused.apply(Resume).unwrap(), OrderStatus::Active);
        assert_eq!(
            OrderStatus::Active.apply(Complete).unwrap(),
            OrderStatus::Completed
        );
    }

    #[test]
    fn paused_orders_cannot_move_or_complete() {
        assert_matches!(OrderStatus::Paused.apply(Transfer), Err(ServiceError::InvalidState(_)));
        assert_matches!(OrderStatus::Paused.apply(Pause), Err(ServiceError::InvalidState(_)));
        assert_matches!(OrderStatus::Paused.apply(Complete), Err(ServiceError::InvalidState(_)));
    }

    #[test]
    fn completed_is_terminal() {
        assert!(OrderStatus::Completed.is_terminal());
        for action in [Transfer, Pause, Resume, Complete] {
            assert_matches!(
                OrderStatus::Completed.apply(action),
                Err(ServiceError::InvalidState(_))
            );
        }
    }

    #[test]
    fn resume_requires_paused() {
        assert_matches!(
            OrderStatus::Active.apply(Resume),
            Err(ServiceError::InvalidState(msg)) if msg == "cannot resume an order that is active"
        );
    }

    #[test]
    fn status_codes_parse() {
        assert_eq!(OrderStatus::from_code("Paused").unwrap(), OrderStatus::Paused);
        assert_matches!(
            OrderStatus::from_code("cancelled"),
            Err(ServiceError::ValidationError(_))
        );
    }
}
