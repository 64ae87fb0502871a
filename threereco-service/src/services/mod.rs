//! Authorization core: principals, sessions, MFA, permissions and
//! row-visibility policies.

pub mod catalogue;
pub mod clock;
pub mod mfa;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod seed;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use permissions::PermissionSet;
pub use policy::PolicyKind;
pub use principal::{Principal, PrincipalError};
pub use session::{
    MemorySessionStore, RedisSessionStore, Session, SessionError, SessionManager, SessionStore,
};
