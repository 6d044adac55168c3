//! Auth-domain identifiers, App identity, and token models.

pub mod id;
pub mod identity;
pub mod token;

pub use id::*;
pub use identity::*;
pub use token::{access::*, secret::*};
