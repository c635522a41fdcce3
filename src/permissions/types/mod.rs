pub mod policy;

pub use policy::{AuthorizationVerdict, RestrictionLevel, RestrictionPolicy};
