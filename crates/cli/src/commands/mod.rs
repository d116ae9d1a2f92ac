pub mod compute;
pub mod temperature;
