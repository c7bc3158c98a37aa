//! Domain types shared by entities, services and handlers.

pub mod area;
pub mod distribution;
pub mod status;

pub use area::{Area, AreaInfo};
pub use distribution::{AreaPieces, PieceDistribution};
pub use status::{LifecycleAction, OrderStatus};
