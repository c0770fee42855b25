pub mod pii;
pub mod tenancy;

pub use pii::Masked;
