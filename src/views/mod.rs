//! Live views fed by decoded records
//!
//! These hold the state behind the plot and table panels: which series or
//! rows are available, which are selected, and the recent data for each.
//! Rendering is left to the caller.

pub mod plot;
pub mod table;

pub use plot::{PlotSeries, PlotView};
pub use table::{DataRow, DataView};
