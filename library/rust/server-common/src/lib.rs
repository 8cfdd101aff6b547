//! k1s0-server-common: Shared server infrastructure for the form designer.
//!
//! Provides the `ReturnCode` table, the `{ IsSuccess, Code, Message, Data, ErrorData }`
//! response envelope, structured error dumps and axum integration for HTTP error responses.

pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod return_code;

pub use descriptor::{Described, EnumDescriptor};
pub use envelope::ApiResponse;
pub use error::{ErrorDump, ServiceError};
pub use return_code::ReturnCode;
