pub mod construct;
pub mod cycle;
pub mod evolve;
pub mod history;
pub mod onboard;
pub mod providers;
pub mod runtime;
pub mod status;
