pub mod ports;
pub mod silver_use_case;
