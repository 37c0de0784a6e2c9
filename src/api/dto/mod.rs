//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire. Money is a JSON number.

pub mod ai_dto;
pub mod common_dto;
pub mod rewards_dto;
pub mod transaction_dto;

pub use ai_dto::*;
pub use common_dto::*;
pub use rewards_dto::*;
pub use transaction_dto::*;
