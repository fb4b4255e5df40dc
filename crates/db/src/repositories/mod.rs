//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod barangay_repo;
pub mod citymun_repo;
pub mod province_repo;
pub mod region_repo;

pub use barangay_repo::BarangayRepo;
pub use citymun_repo::CityMunRepo;
pub use province_repo::ProvinceRepo;
pub use region_repo::RegionRepo;
