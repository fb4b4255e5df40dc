//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` upsert DTO carrying exactly the CSV columns

pub mod barangay;
pub mod citymun;
pub mod province;
pub mod region;
