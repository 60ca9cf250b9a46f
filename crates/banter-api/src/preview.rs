//! Link-preview enrichment.
//!
//! Runs as a detached task after a message commits, so a slow or hostile
//! remote can never block or fail the send path. All failures are silent:
//! the message simply never gains a preview.

use regex::Regex;
use tracing::debug;

use banter_types::models::LinkPreview;

use crate::auth::AppState;

/// Hard cap on the fetched document; anything past this is ignored.
const MAX_BODY_BYTES: usize = 512 * 1024;

/// First bare http(s) URL in the message content, if any. Only the first
/// URL is ever fetched.
pub fn first_url(content: &str) -> Option<&str> {
    for token in content.split_whitespace() {
        let trimmed = token.trim_end_matches(|c: char| ".,;:!?)".contains(c));
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));
        if let Some(rest) = rest {
            if !rest.is_empty() {
                return Some(trimmed);
            }
        }
    }
    None
}

/// Fire-and-forget enrichment. The caller returns immediately; the task
/// patches the message later if (and only if) a title was recoverable and
/// the message still exists undeleted.
pub fn spawn_enrichment(state: AppState, message_id: String, url: String) {
    tokio::spawn(async move {
        if let Err(e) = enrich(state, &message_id, &url).await {
            debug!("link preview for {} failed: {:#}", message_id, e);
        }
    });
}

async fn enrich(state: AppState, message_id: &str, url: &str) -> anyhow::Result<()> {
    // The client carries the fetch timeout (set at construction).
    let response = state.http.get(url).send().await?;
    let body = response.text().await?;
    let mut cut = body.len().min(MAX_BODY_BYTES);
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    let body = &body[..cut];

    let Some(preview) = extract_preview(url, body) else {
        debug!("no og:title in {}", url);
        return Ok(());
    };

    let db = state.clone();
    let mid = message_id.to_string();
    let patched =
        tokio::task::spawn_blocking(move || db.db.patch_link_preview(&mid, &preview)).await??;

    if !patched {
        debug!("message {} gone or deleted before preview landed", message_id);
    }
    Ok(())
}

/// Extract Open Graph fields from raw HTML. Returns None unless a title is
/// recoverable (og:title, falling back to <title>).
pub fn extract_preview(url: &str, body: &str) -> Option<LinkPreview> {
    let title = meta_content(body, "og:title").or_else(|| html_title(body))?;

    Some(LinkPreview {
        url: url.to_string(),
        title: Some(title),
        description: meta_content(body, "og:description")
            .or_else(|| meta_content(body, "description")),
        image: meta_content(body, "og:image"),
        site_name: meta_content(body, "og:site_name"),
    })
}

/// Pull the content attribute of a meta tag by property/name, tolerating
/// either attribute order.
fn meta_content(body: &str, key: &str) -> Option<String> {
    let escaped = regex::escape(key);
    let patterns = [
        format!(
            r#"(?is)<meta[^>]*(?:property|name)\s*=\s*["']{}["'][^>]*content\s*=\s*["']([^"']*)["']"#,
            escaped
        ),
        format!(
            r#"(?is)<meta[^>]*content\s*=\s*["']([^"']*)["'][^>]*(?:property|name)\s*=\s*["']{}["']"#,
            escaped
        ),
    ];

    for pattern in &patterns {
        let re = Regex::new(pattern).ok()?;
        if let Some(caps) = re.captures(body) {
            let value = decode_entities(caps.get(1)?.as_str());
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn html_title(body: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    let caps = re.captures(body)?;
    let title = decode_entities(caps.get(1)?.as_str());
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_first_url_only() {
        assert_eq!(
            first_url("check https://example.com and http://other.org"),
            Some("https://example.com")
        );
        assert_eq!(first_url("no links here"), None);
        assert_eq!(first_url("trailing https://example.com/page."), Some("https://example.com/page"));
        assert_eq!(first_url("bare scheme https:// nope"), None);
    }

    #[test]
    fn extracts_og_fields() {
        let body = r#"<html><head>
            <meta property="og:title" content="Example &amp; Sons" />
            <meta property="og:description" content="A page">
            <meta content="https://example.com/img.png" property="og:image">
            <meta property="og:site_name" content="Example">
            </head></html>"#;

        let preview = extract_preview("https://example.com", body).unwrap();
        assert_eq!(preview.title.as_deref(), Some("Example & Sons"));
        assert_eq!(preview.description.as_deref(), Some("A page"));
        assert_eq!(preview.image.as_deref(), Some("https://example.com/img.png"));
        assert_eq!(preview.site_name.as_deref(), Some("Example"));
    }

    #[test]
    fn falls_back_to_title_tag() {
        let body = "<html><head><title>Plain Title</title></head></html>";
        let preview = extract_preview("https://example.com", body).unwrap();
        assert_eq!(preview.title.as_deref(), Some("Plain Title"));
        assert!(preview.description.is_none());
    }

    #[test]
    fn no_title_means_no_preview() {
        let body = r#"<meta property="og:description" content="desc only">"#;
        assert!(extract_preview("https://example.com", body).is_none());
    }
}
