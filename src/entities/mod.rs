pub mod audit_entry;
pub mod order;
pub mod order_area_pieces;
pub mod order_pause;
pub mod piece_transfer;
