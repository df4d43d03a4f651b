// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free series transforms. Every output is aligned with its
// input (one entry per bar) and uses `None` for positions that are still in a
// warm-up region, so callers see the undefined stretch explicitly.

pub mod ewm;
pub mod flow;
pub mod rolling;
pub mod rsx;

pub use flow::{calculate_flow, FlowComponents};
pub use rsx::calculate_rsx;
