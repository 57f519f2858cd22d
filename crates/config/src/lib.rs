// Configuration loading and session-scoped state

pub mod session;
pub mod settings;

pub use session::{
    FileSessionStore, MemorySessionStore, SessionEntryInfo, SessionError, SessionStore,
    APRICOT_DATA_KEY, MERGE_PAIRS_KEY, ONESITE_DATA_KEY,
};
pub use settings::Settings;
