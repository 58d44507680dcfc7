//! Backup run: state machine, artifact wait, archiving and the device loop

pub mod archive;
pub mod fsm;
pub mod orchestrator;
pub mod report;
pub mod waiter;
