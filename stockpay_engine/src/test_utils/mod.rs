pub mod fakes;
#[cfg(feature = "sqlite")]
pub mod prepare_env;
