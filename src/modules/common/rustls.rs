use crate::{
    modules::{
        common::Initialize,
        error::{code::ErrorCode, SpamWardenResult},
    },
    raise_error,
};

pub struct SpamWardenTls;

impl Initialize for SpamWardenTls {
    async fn initialize() -> SpamWardenResult<()> {
        rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
            .map_err(|_| {
                raise_error!(
                    "failed to set crypto provider".into(),
                    ErrorCode::InternalError
                )
            })
    }
}
