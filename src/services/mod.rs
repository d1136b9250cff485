//! Services module
//!
//! External collaborators: the vision model and the credentials used to
//! reach it.

pub mod azure_openai;
pub mod credential;
pub mod provider;

pub use azure_openai::AzureOpenAiService;
pub use credential::{AuthHeader, AzureCredential, ClientSecretCredential, CredentialError};
pub use provider::{ImageUpload, ProviderError, VisionProvider};
