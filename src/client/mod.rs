//! Client-side core: configuration fetch, bootstrap, session gate, login and
//! the recipe tool panels.
//!
//! Nothing here reads ambient global state. [`bootstrap::bootstrap`] returns
//! an [`AppHandle`] and every dependent component takes it (or a
//! [`Readiness`] to await it) as an argument.

pub mod bootstrap;
pub mod config_provider;
pub mod identity;
pub mod login;
pub mod session;
pub mod surface;
pub mod tools;

pub use bootstrap::{
    AppHandle, ClientFactory, FATAL_MESSAGE, MemoryClientFactory, ReadySender, Readiness,
    bootstrap, readiness,
};
pub use config_provider::ConfigProvider;
pub use identity::{
    Identity, IdentityProvider, MemoryIdentity, MemoryUserStore, SessionSignal, UserRecord,
    UserStore,
};
pub use login::LoginController;
pub use session::{GateState, SESSION_KEY, SessionCache, SessionGate};
pub use surface::{AlertKind, Destination, MemorySurface, Surface, SurfaceEvent};
pub use tools::{PromptRelay, RelayClient, ToolPanel, ToolPanels};
