// Library module for testable functions

pub mod api;
pub mod clock;
pub mod codes;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod sources;
pub mod state;
pub mod upstream;

/// Jeonse-to-sale index ratio in percent
/// Formula: (jeonse_index / sale_index) × 100, 0 without a sale index
pub fn jeonse_ratio(sale_index: f64, jeonse_index: f64) -> f64 {
    if sale_index <= 0.0 {
        return 0.0;
    }
    jeonse_index / sale_index * 100.0
}
