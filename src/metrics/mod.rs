//! Prometheus counters for order operations, rendered at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::errors::ServiceError;
use crate::models::Area;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    static ref ORDER_OPERATIONS: IntCounterVec = {
        let counter = IntCounterVec::new(
            Opts::new(
                "pedidos_order_operations_total",
                "Order operations by kind and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("metric can be created");
        REGISTRY
            .register(Box::new(counter.clone()))
            .expect("metric can be registered");
        counter
    };
    static ref PIECE_TRANSFERS: IntCounterVec = {
        let counter = IntCounterVec::new(
            Opts::new(
                "pedidos_piece_transfers_total",
                "Committed piece transfers by destination area",
            ),
            &["to_area"],
        )
        .expect("metric can be created");
        REGISTRY
            .register(Box::new(counter.clone()))
            .expect("metric can be registered");
        counter
    };
    static ref PIECES_MOVED: IntCounterVec = {
        let counter = IntCounterVec::new(
            Opts::new(
                "pedidos_pieces_moved_total",
                "Pieces moved by destination area",
            ),
            &["to_area"],
        )
        .expect("metric can be created");
        REGISTRY
            .register(Box::new(counter.clone()))
            .expect("metric can be registered");
        counter
    };
}

/// Short label for the outcome of an operation.
pub fn outcome_label<T>(result: &Result<T, ServiceError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ServiceError::NotFound(_)) | Err(ServiceError::InvalidArea(_)) => "not_found",
        Err(ServiceError::ValidationError(_)) => "invalid",
        Err(ServiceError::InvalidState(_)) => "invalid_state",
        Err(ServiceError::Conflict(_)) | Err(ServiceError::ConcurrentModification(_)) => {
            "conflict"
        }
        Err(ServiceError::Unauthorized(_)) | Err(ServiceError::Forbidden(_)) => "denied",
        Err(_) => "error",
    }
}

pub fn record_operation<T>(operation: &str, result: &Result<T, ServiceError>) {
    ORDER_OPERATIONS
        .with_label_values(&[operation, outcome_label(result)])
        .inc();
}

pub fn record_transfer(to_area: Area, pieces: i32) {
    PIECE_TRANSFERS.with_label_values(&[to_area.code()]).inc();
    PIECES_MOVED
        .with_label_values(&[to_area.code()])
        .inc_by(u64::try_from(pieces).unwrap_or(0));
}

/// Prometheus text exposition of every registered metric.
pub fn render() -> Result<String, ServiceError> {
    lazy_static::initialize(&ORDER_OPERATIONS);
    lazy_static::initialize(&PIECE_TRANSFERS);
    lazy_static::initialize(&PIECES_MOVED);

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("failed to encode metrics: {e}")))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics are not utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_rendered_output() {
        record_transfer(Area::Calidad, 12);
        record_operation::<()>("pause", &Err(ServiceError::Conflict("split".into())));

        let text = render().unwrap();
        assert!(text.contains("pedidos_piece_transfers_total{to_area=\"calidad\"}"));
        assert!(text.contains("pedidos_pieces_moved_total{to_area=\"calidad\"}"));
        assert!(text.contains("operation=\"pause\""));
        assert!(text.contains("outcome=\"conflict\""));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(outcome_label::<()>(&Ok(())), "ok");
        assert_eq!(
            outcome_label::<()>(&Err(ServiceError::InvalidState("x".into()))),
            "invalid_state"
        );
        assert_eq!(
            outcome_label::<()>(&Err(ServiceError::Forbidden("x".into()))),
            "denied"
        );
    }
}
