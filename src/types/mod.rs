pub mod parameter;
pub mod record;
pub mod unit_system;
