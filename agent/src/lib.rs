//! Switch configuration backup library
//!
//! Pulls running configurations off network switches over SSH, collects the
//! uploads with a transient TFTP receiver and files them per device and per
//! day.

pub mod app;
pub mod backup;
pub mod catalog;
pub mod credentials;
pub mod errors;
pub mod filesys;
pub mod inventory;
pub mod logs;
pub mod receiver;
pub mod session;
pub mod storage;
pub mod utils;
