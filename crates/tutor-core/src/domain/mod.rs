//! 인증/인가를 위한 도메인 모델.

mod claims;
mod identity;
mod policy;
mod roles;
mod session;

pub use claims::*;
pub use identity::*;
pub use policy::*;
pub use roles::*;
pub use session::*;
