//! Variant records and row decoding
//!
//! Records are immutable once the deserializer builds them.

mod deserializer;
mod record;

pub use deserializer::{
    DistinctRows, JsonVariantDeserializer, RowDeserializer, VariantError, VariantResult,
};
pub use record::{FamilyVariant, SummaryVariant, VariantRecord};
