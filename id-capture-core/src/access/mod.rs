pub mod device_catalog;
pub mod permission_gate;
