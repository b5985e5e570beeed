pub mod history;
pub mod sink;
pub mod worker;
