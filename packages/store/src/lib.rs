pub mod config;
pub mod document;
pub mod error;
pub mod live;
pub mod models;
pub mod placeholders;
pub mod profiles;
pub mod prospects;
pub mod session;
pub mod templates;
pub mod validate;

mod memory;
pub use memory::MemoryStore;

pub use config::StoreConfig;
pub use document::{CancelHandle, Document, DocumentStore, Fields, Query, SetMode, Subscription};
pub use error::{StoreError, ValidationError};
pub use live::LiveView;
pub use models::{
    Identity, MessageTemplate, NewProspect, NewTemplate, ProfilePatch, Prospect, ProspectPatch,
    ProspectStatus, TemplatePatch, TemplateType, UserProfile,
};
pub use placeholders::extract_placeholders;
pub use profiles::ProfileStore;
pub use prospects::ProspectStore;
pub use session::{AuthState, Lifecycle, SessionController};
pub use templates::TemplateStore;
