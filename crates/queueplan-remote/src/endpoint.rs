//! Remote planner address resolution.
//!
//! The planner exposes a fixed resource layout under a configured base
//! address. Relative paths resolve the way URL references do: everything
//! after the last `/` of the base path is replaced, so a base of
//! `http://host/planner/` yields `http://host/planner/rest/hudsonQueue`
//! while `http://host/planner` yields `http://host/rest/hudsonQueue`.

use std::fmt;

use http::Uri;

use crate::error::{RemoteError, RemoteResult};

/// Queue resource: GET solution, POST create, PUT update, DELETE stop.
pub const QUEUE_RESOURCE: &str = "rest/hudsonQueue";
/// Info resource, answered with `info: <name>` as plain text.
pub const INFO_RESOURCE: &str = "rest/hudsonQueue/info";
/// Score resource, answered with `{"score": <int>}`.
pub const SCORE_RESOURCE: &str = "rest/hudsonQueue/score";

/// A validated planner base address with its resolved resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    address: String,
    queue: Uri,
    info: Uri,
    score: Uri,
}

impl RemoteEndpoint {
    /// Parse a base address.
    ///
    /// Fails with [`RemoteError::MalformedAddress`] unless the address is
    /// an absolute `http` or `https` URL with a host.
    pub fn parse(address: &str) -> RemoteResult<Self> {
        let malformed = |reason: String| RemoteError::MalformedAddress {
            address: address.to_string(),
            reason,
        };

        let base: Uri = address
            .trim()
            .parse()
            .map_err(|e: http::uri::InvalidUri| malformed(e.to_string()))?;

        let scheme = base
            .scheme_str()
            .ok_or_else(|| malformed("missing scheme".to_string()))?;
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(malformed(format!("unsupported scheme {scheme}")));
        }
        let authority = base
            .authority()
            .ok_or_else(|| malformed("missing host".to_string()))?;

        let path = base.path();
        let directory = path.rfind('/').map_or("/", |i| &path[..=i]);

        let resolve = |resource: &str| -> RemoteResult<Uri> {
            format!("{scheme}://{authority}{directory}{resource}")
                .parse()
                .map_err(|e: http::uri::InvalidUri| malformed(e.to_string()))
        };

        Ok(Self {
            address: address.trim().to_string(),
            queue: resolve(QUEUE_RESOURCE)?,
            info: resolve(INFO_RESOURCE)?,
            score: resolve(SCORE_RESOURCE)?,
        })
    }

    /// The base address as configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn queue(&self) -> &Uri {
        &self.queue
    }

    pub fn info(&self) -> &Uri {
        &self.info
    }

    pub fn score(&self) -> &Uri {
        &self.score
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
