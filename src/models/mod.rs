use uuid::Uuid;

pub mod price_history;
pub mod product;

// Re-exports for convenience
pub use price_history::*;
pub use product::*;

// Helper function to generate record identifiers
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
