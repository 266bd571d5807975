//! Session lifecycle: persistent store, user/role model, and the controller
//! state machine. Keep the public surface thin and split implementation
//! across sub-modules.

mod controller;
mod store;
mod user;

pub use controller::{AuthState, Session, SessionController};
pub use store::{
    FileBackend, MemoryBackend, SessionStore, StoreBackend, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN,
    KEY_USER,
};
pub use user::{Role, User};
