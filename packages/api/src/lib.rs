//! # API crate: client for the prospecting backend
//!
//! Everything that is not live document data goes through the HTTP backend:
//! AI message generation, CSV imports and generated sample data. Requests carry
//! the identity provider's id token as a bearer token.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`client`] | [`ApiClient`]: base URL, bearer token, JSON send and status mapping, health check |
//! | [`messages`] | `POST /routes/messages/generate` and the backend's stock templates |
//! | [`csv_import`] | Local preflight of CSV files, then `validate-csv` / `upload-csv` |
//! | [`samples`] | Backend-generated sample prospects and a fixed offline demo set |
//! | [`settings`] | Layered configuration: defaults, `prospector.toml`, `PROSPECTOR_*` variables |

pub mod client;
pub mod csv_import;
pub mod error;
pub mod messages;
pub mod samples;
pub mod settings;

pub use client::{ApiClient, HealthStatus};
pub use csv_import::{CsvFile, CsvUploadResult, CsvValidation, RowError};
pub use error::ApiError;
pub use messages::{DefaultTemplates, GenerateRequest, GeneratedMessage, SenderInfo};
pub use samples::{demo_prospects, import_sample_data, RemoteProspect, SampleData};
pub use settings::{ApiSettings, Settings};
