pub mod identity;

pub use identity::IdentityTable;
pub use identity::PostgresIdentityRepository;
