pub mod analysis;
pub mod capture_delegate;
pub mod capture_provider;
pub mod clock;
pub mod visualization;
