pub mod clock;
pub mod manager;
pub mod scheduler;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{SessionManager, SessionManagerBuilder, SessionSnapshot, SessionStatus};
pub use storage::{CredentialStorage, FileCredentialStorage, MemoryCredentialStorage};
