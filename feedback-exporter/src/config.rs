use std::str::FromStr;
use std::time;

use envconfig::Envconfig;
use url::Url;

use crate::pipeline::ExportOptions;
use crate::walker::WalkOptions;

#[derive(Envconfig, Clone)]
pub struct Config {
    pub product_id: NonEmptyString,

    pub private_key: NonEmptyString,

    #[envconfig(default = "https://txc.qq.com")]
    pub base_url: Url,

    #[envconfig(default = "100")]
    pub page_size: u32,

    #[envconfig(from = "PAGE_DELAY_MS", default = "600")]
    pub page_delay: EnvMsDuration,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "30000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(default = "10000")]
    pub max_pages: usize,

    #[envconfig(default = "feedback_data.zip")]
    pub output_path: String,
}

impl Config {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            base_url: self.base_url.clone(),
            page_size: self.page_size,
            walk: WalkOptions {
                page_delay: self.page_delay.0,
                max_pages: self.max_pages,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[derive(Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}
