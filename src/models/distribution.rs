use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::area::Area;
use crate::errors::ServiceError;

/// Pieces of one order held by one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AreaPieces {
    pub area: Area,
    pub pieces: i32,
}

/// Where the pieces of an order currently are.
///
/// Areas holding zero pieces are never stored, so an order whose pieces all
/// sit in one area has exactly one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceDistribution {
    total: i32,
    resident: BTreeMap<Area, i32>,
}

impl PieceDistribution {
    /// All `total` pieces resident at `area`.
    pub fn new(total: i32, area: Area) -> Result<Self, ServiceError> {
        if total <= 0 {
            return Err(ServiceError::ValidationError(
                "total_piezas must be greater than zero".to_string(),
            ));
        }
        let mut resident = BTreeMap::new();
        resident.insert(area, total);
        Ok(Self { total, resident })
    }

    /// Rebuilds a distribution from stored residency rows, checking that
    /// they still add up to the order total.
    pub fn from_rows<I>(total: i32, rows: I) -> Result<Self, ServiceError>
    where
        I: IntoIterator<Item = (Area, i32)>,
    {
        let mut resident = BTreeMap::new();
        for (area, pieces) in rows {
            if pieces < 0 {
                return Err(ServiceError::InternalError(format!(
                    "negative residency for area {area}"
                )));
            }
            if pieces > 0 {
                *resident.entry(area).or_insert(0) += pieces;
            }
        }
        let distribution = Self { total, resident };
        if distribution.total_resident() != total {
            return Err(ServiceError::InternalError(format!(
                "residency out of balance: {} resident, {} expected",
                distribution.total_resident(),
                total
            )));
        }
        Ok(distribution)
    }

    pub fn total(&self) -> i32 {
        self.total
    }

    pub fn resident(&self, area: Area) -> i32 {
        self.resident.get(&area).copied().unwrap_or(0)
    }

    pub fn total_resident(&self) -> i32 {
        self.resident.values().sum()
    }

    /// True while more than one area holds pieces.
    pub fn is_split(&self) -> bool {
        self.resident.len() > 1
    }

    /// The single area holding every piece, if any.
    pub fn consolidated_area(&self) -> Option<Area> {
        match self.resident.iter().next() {
            Some((area, pieces)) if *pieces == self.total => Some(*area),
            _ => None,
        }
    }

    pub fn areas(&self) -> Vec<AreaPieces> {
        self.resident
            .iter()
            .map(|(area, pieces)| AreaPieces {
                area: *area,
                pieces: *pieces,
            })
            .collect()
    }

    /// Moves `count` pieces from one area to another.
    ///
    /// On error the distribution is left untouched.
    pub fn transfer(&mut self, from: Area, to: Area, count: i32) -> Result<(), ServiceError> {
        if count <= 0 {
            return Err(ServiceError::ValidationError(
                "piece_count must be greater than zero".to_string(),
            ));
        }
        if from == to {
            return Err(ServiceError::ValidationError(format!(
                "cannot transfer pieces from {from} to itself"
            )));
        }
        if !to.is_transfer_target() {
            return Err(ServiceError::ValidationError(format!(
                "{} cannot receive pieces",
                to.display_name()
            )));
        }
        let available = self.resident(from);
        if count > available {
            return Err(ServiceError::ValidationError(format!(
                "cannot transfer {count} pieces from {from}: only {available} resident"
            )));
        }

        if available == count {
            self.resident.remove(&from);
        } else {
            self.resident.insert(from, available - count);
        }
        *self.resident.entry(to).or_insert(0) += count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn partial_transfer_splits_then_consolidates() {
        let mut dist = PieceDistribution::new(100, Area::Corte).unwrap();
        assert_eq!(dist.consolidated_area(), Some(Area::Corte));

        dist.transfer(Area::Corte, Area::Bordado, 60).unwrap();
        assert_eq!(dist.resident(Area::Corte), 40);
        assert_eq!(dist.resident(Area::Bordado), 60);
        assert!(dist.is_split());
        assert_eq!(dist.consolidated_area(), None);

        dist.transfer(Area::Corte, Area::Bordado, 40).unwrap();
        assert!(!dist.is_split());
        assert_eq!(dist.consolidated_area(), Some(Area::Bordado));
        assert_eq!(dist.areas(), vec![AreaPieces { area: Area::Bordado, pieces: 100 }]);
    }

    #[test]
    fn over_transfer_leaves_distribution_unchanged() {
        let mut dist = PieceDistribution::new(10, Area::Corte).unwrap();
        let before = dist.clone();
        assert_matches!(
            dist.transfer(Area::Corte, Area::Bordado, 11),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            dist.transfer(Area::Ensamble, Area::Bordado, 1),
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(dist, before);
    }

    #[test]
    fn rejects_degenerate_transfers() {
        let mut dist = PieceDistribution::new(10, Area::Corte).unwrap();
        assert!(dist.transfer(Area::Corte, Area::Corte, 1).is_err());
        assert!(dist.transfer(Area::Corte, Area::Admin, 1).is_err());
        assert!(dist.transfer(Area::Corte, Area::Bordado, 0).is_err());
        assert!(dist.transfer(Area::Corte, Area::Bordado, -3).is_err());
    }

    #[test]
    fn non_positive_total_is_rejected() {
        assert!(PieceDistribution::new(0, Area::Corte).is_err());
        assert!(PieceDistribution::new(-5, Area::Corte).is_err());
    }

    #[test]
    fn from_rows_detects_imbalance() {
        let ok = PieceDistribution::from_rows(
            100,
            vec![(Area::Corte, 40), (Area::Bordado, 60), (Area::Calidad, 0)],
        )
        .unwrap();
        assert!(ok.is_split());
        assert_eq!(ok.areas().len(), 2);

        assert_matches!(
            PieceDistribution::from_rows(100, vec![(Area::Corte, 40)]),
            Err(ServiceError::InternalError(_))
        );
    }

    fn transfer_area() -> impl Strategy<Value = Area> {
        let targets: Vec<Area> = Area::ALL
            .iter()
            .copied()
            .filter(Area::is_transfer_target)
            .collect();
        prop::sample::select(targets)
    }

    proptest! {
        #[test]
        fn transfers_conserve_total_pieces(
            total in 1i32..500,
            moves in prop::collection::vec((transfer_area(), transfer_area(), 1i32..200), 0..40),
        ) {
            let mut dist = PieceDistribution::new(total, Area::Corte).unwrap();
            for (from, to, count) in moves {
                let before = dist.clone();
                if dist.transfer(from, to, count).is_err() {
                    prop_assert_eq!(&dist, &before);
                }
                prop_assert_eq!(dist.total_resident(), total);
                prop_assert!(dist.areas().iter().all(|a| a.pieces > 0));
            }
        }
    }
}
