pub mod chart;
pub mod compare;
pub mod coverage;
pub mod histograms;
pub mod presence;
pub mod stats;
