mod access_token_codec;
mod credential_hasher_impl;
mod refresh_token_codec;
mod token_service_impl;

pub use access_token_codec::*;
pub use credential_hasher_impl::*;
pub use refresh_token_codec::*;
pub use token_service_impl::*;
