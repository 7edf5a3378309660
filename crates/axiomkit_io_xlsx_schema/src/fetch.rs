//! Remote image fetchers.
//!
//! The renderer only sees [`ImageFetcher`]; any closure of the matching shape
//! works, which is how tests stub the network.

use crate::error::FetchError;

/// Synchronous source of image bytes for a URL.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F> ImageFetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError>,
{
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self(url)
    }
}

/// Fetcher that refuses every URL, for renders that must stay offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineImageFetcher;

impl ImageFetcher for OfflineImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Request {
            url: url.to_string(),
            message: "remote fetching is disabled".to_string(),
        })
    }
}

#[cfg(feature = "http")]
pub use http::HttpImageFetcher;

#[cfg(feature = "http")]
mod http {
    use std::io::Read;

    use reqwest::blocking::Client;

    use super::ImageFetcher;
    use crate::error::FetchError;
    use crate::spec::SpecHttpFetchOptions;

    /// Blocking HTTP(S) fetcher backed by `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpImageFetcher {
        client: Client,
        n_bytes_max: Option<usize>,
    }

    impl HttpImageFetcher {
        pub fn new(options: &SpecHttpFetchOptions) -> Result<Self, FetchError> {
            let mut builder = Client::builder().user_agent(options.user_agent.clone());
            if let Some(timeout) = options.timeout {
                builder = builder.timeout(timeout);
            }
            let client = builder.build().map_err(|err| FetchError::Request {
                url: String::new(),
                message: err.to_string(),
            })?;
            Ok(Self {
                client,
                n_bytes_max: options.n_bytes_max,
            })
        }
    }

    impl ImageFetcher for HttpImageFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            let derive_request_error = |err: &dyn std::fmt::Display| FetchError::Request {
                url: url.to_string(),
                message: err.to_string(),
            };

            let response = self
                .client
                .get(url)
                .send()
                .map_err(|err| derive_request_error(&err))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let Some(n_bytes_max) = self.n_bytes_max else {
                return response
                    .bytes()
                    .map(|bytes| bytes.to_vec())
                    .map_err(|err| derive_request_error(&err));
            };

            let derive_too_large = || FetchError::TooLarge {
                url: url.to_string(),
                n_bytes_max,
            };
            if response
                .content_length()
                .is_some_and(|n_len| n_len > n_bytes_max as u64)
            {
                return Err(derive_too_large());
            }

            // Read one byte past the limit to detect oversized bodies without a length header.
            let mut v_body = Vec::new();
            response
                .take(n_bytes_max as u64 + 1)
                .read_to_end(&mut v_body)
                .map_err(|err| derive_request_error(&err))?;
            if v_body.len() > n_bytes_max {
                return Err(derive_too_large());
            }
            Ok(v_body)
        }
    }
}
