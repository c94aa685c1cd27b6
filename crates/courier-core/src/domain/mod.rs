//! Domain model (ids, categories, payloads, wire envelopes, policies, errors).

pub mod category;
pub mod errors;
pub mod events;
pub mod filter;
pub mod ids;
pub mod job;
pub mod outcome;
pub mod state;
pub mod timeout;
pub mod wire;

pub use self::category::JobCategory;
pub use self::errors::{DispatchError, ErrorKind};
pub use self::events::DomainEvent;
pub use self::filter::{FilterConfig, FilterSet, PreDispatchFilter, SkipDecision};
pub use self::ids::{JobId, PlatformId, ProjectId, RequestId, WorkerAddress};
pub use self::job::{JobData, JobEnvelope, RunEnvironment, UserInteractionJobType};
pub use self::outcome::ConsumeOutcome;
pub use self::state::ConsumeState;
pub use self::timeout::{LOCK_PADDING, TimeoutPolicy};
pub use self::wire::{Credential, DispatchRequest, DispatchResponse, ResponseStatus};
