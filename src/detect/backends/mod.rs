pub mod heuristic;

#[cfg(feature = "backend-network")]
pub mod network;

pub use heuristic::{FaceFinder, HeuristicBackend, SeetaFaceFinder};

#[cfg(feature = "backend-network")]
pub use network::NetworkBackend;
