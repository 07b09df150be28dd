pub mod token;

pub use token::{RequiredRolesLayer, TokenLayer};
