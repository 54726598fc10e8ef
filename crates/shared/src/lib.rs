pub mod domain;
pub mod error;
pub mod order;
pub mod ordered_map;
pub mod protocol;
