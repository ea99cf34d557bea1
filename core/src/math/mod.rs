pub mod integrate;
pub mod stats;

pub use integrate::Integrator;
pub use stats::StatsHelper;
