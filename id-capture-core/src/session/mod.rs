pub mod capture;
pub mod context;
pub mod orchestrator;
