use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable `{0}` must be set to a non-empty value")]
    MissingEnvVar(&'static str),
}
