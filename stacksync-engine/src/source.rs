//! Template locators and fetching.
//!
//! A locator names where a template body lives: a local file, an object
//! store `bucket/key` pair, or a signed HTTP(S) URL. Local loads never
//! touch the network; remote loads are synchronous.

use std::fmt;
use std::path::PathBuf;

use stacksync_core::{template, StackName, Template};

use crate::client::CloudClient;
use crate::SyncError;

/// Where a template body can be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLocator {
    /// Local filesystem path — parsed without network access.
    Local(PathBuf),
    /// Signed HTTP(S) URL, fetched as-is.
    SignedUrl(String),
    /// Object-store location, fetched via the control-plane client.
    ObjectStore { bucket: String, key: String },
}

impl TemplateLocator {
    /// Classify a raw locator string.
    ///
    /// `s3://bucket/key` → object store; `http(s)://…` → signed URL;
    /// anything else is a local path.
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            Self::ObjectStore {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            }
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::SignedUrl(raw.to_owned())
        } else {
            Self::Local(PathBuf::from(raw))
        }
    }

    /// Whether this locator denotes locally-authored source rather than a
    /// resolved remote artifact reference.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for TemplateLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::SignedUrl(url) => f.write_str(url),
            Self::ObjectStore { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Load a template's `Resources` section from a locator.
///
/// Fails with [`SyncError::NotFound`] when the remote object does not exist
/// and [`SyncError::Template`] when the body is unparseable.
pub fn load_template<C: CloudClient>(
    locator: &TemplateLocator,
    client: &C,
) -> Result<Template, SyncError> {
    match locator {
        TemplateLocator::Local(path) => Ok(template::load_file(path)?),
        TemplateLocator::SignedUrl(url) => {
            let body = fetch_signed_url(url)?;
            Ok(template::parse_str(&body, url)?)
        }
        TemplateLocator::ObjectStore { bucket, key } => {
            let bytes = client.get_object(bucket, key)?;
            let body = String::from_utf8_lossy(&bytes);
            Ok(template::parse_str(&body, &format!("s3://{bucket}/{key}"))?)
        }
    }
}

/// Fetch the currently deployed template for a stack from the control plane.
///
/// [`SyncError::NotFound`] here is the common case for a stack that has
/// never been deployed, or a nested stack whose parent has not reached a
/// stable state; callers treat it as "full sync required".
pub fn fetch_deployed_template<C: CloudClient>(
    client: &C,
    stack_name: &StackName,
) -> Result<Template, SyncError> {
    let body = client.get_template(stack_name)?;
    Ok(template::parse_str(
        &body,
        &format!("deployed template for stack {stack_name}"),
    )?)
}

fn fetch_signed_url(url: &str) -> Result<String, SyncError> {
    match ureq::get(url).call() {
        Ok(response) => response
            .into_string()
            .map_err(|e| SyncError::Client(format!("reading body of {url}: {e}"))),
        Err(ureq::Error::Status(404, _)) => {
            Err(SyncError::NotFound(format!("remote template at {url}")))
        }
        Err(err) => Err(SyncError::Http {
            url: url.to_owned(),
            source: Box::new(err),
        }),
    }
}
