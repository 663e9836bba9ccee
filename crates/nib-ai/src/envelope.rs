//! Response envelope parsing
//!
//! The raw-socket transport delivers a full HTTP response; the subprocess
//! transport delivers the body directly. Either way the body is the
//! provider's JSON envelope, and each decoding step fails with its own
//! error kind so callers can tell "server replied incomprehensibly" from
//! "network unreachable".

use serde::Deserialize;

use crate::error::{Error, Result};

/// An HTTP response split at the blank-line delimiter
#[derive(Debug)]
pub struct HttpResponse<'a> {
    pub status: u16,
    pub body: &'a [u8],
}

/// Split a raw HTTP response into status code and body.
///
/// A response without the `\r\n\r\n` header/body delimiter, or with an
/// unparsable status line, is `MalformedEnvelope`. Chunked
/// transfer-encoding is not supported; the transports read to EOF.
pub fn split_http_response(raw: &[u8]) -> Result<HttpResponse<'_>> {
    let delim = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| Error::MalformedEnvelope("missing header/body delimiter".to_string()))?;

    let headers = std::str::from_utf8(&raw[..delim])
        .map_err(|_| Error::MalformedEnvelope("headers are not valid UTF-8".to_string()))?;
    let status_line = headers
        .lines()
        .next()
        .ok_or_else(|| Error::MalformedEnvelope("empty header block".to_string()))?;

    // "HTTP/1.1 200 OK"
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| {
            Error::MalformedEnvelope(format!("bad status line: {status_line}"))
        })?;

    Ok(HttpResponse {
        status,
        body: &raw[delim + 4..],
    })
}

/// Extract the assistant text from the provider's JSON envelope.
///
/// A provider-reported error surfaces as `Provider`; a body that isn't
/// JSON is `Json`; JSON of the wrong shape is `UnexpectedSchema`.
pub fn parse_envelope(body: &[u8]) -> Result<String> {
    let envelope: Envelope = serde_json::from_slice(body)?;

    if let Some(err) = envelope.error {
        return Err(Error::provider(
            err.error_type.unwrap_or_else(|| "error".to_string()),
            err.message,
        ));
    }

    let content = envelope
        .content
        .ok_or_else(|| Error::UnexpectedSchema("missing \"content\" array".to_string()))?;
    if content.is_empty() {
        return Err(Error::UnexpectedSchema("empty \"content\" array".to_string()));
    }

    let mut text = String::new();
    let mut found = false;
    for block in content {
        if let Some(t) = block.text {
            text.push_str(&t);
            found = true;
        }
    }
    if !found {
        return Err(Error::UnexpectedSchema(
            "no \"text\" field in content".to_string(),
        ));
    }
    Ok(text)
}

/// Parse an aggregated raw-socket response: HTTP split, then envelope.
///
/// A non-2xx status still gets its body parsed so the provider's error
/// shape comes through verbatim; when that body isn't a provider error,
/// the status alone is reported.
pub fn parse_http_envelope(raw: &[u8]) -> Result<String> {
    let response = split_http_response(raw)?;

    if !(200..300).contains(&response.status) {
        return match parse_envelope(response.body) {
            Err(e @ Error::Provider { .. }) => Err(e),
            _ => Err(Error::provider(
                response.status.to_string(),
                String::from_utf8_lossy(response.body).trim().to_string(),
            )),
        };
    }

    parse_envelope(response.body)
}

// ============================================================================
// Envelope shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    content: Option<Vec<ContentBlock>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: String,
}
