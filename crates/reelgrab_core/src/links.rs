use url::Url;

/// Canonical form of a candidate link, used both as the dedup key and as the
/// URL handed to the fetcher.
///
/// Trims whitespace, lowercases scheme and host (via URL parsing), strips the
/// fragment and the query string, and drops trailing slashes. The one query
/// parameter that survives is `v` on a `/watch` path, because for watch
/// permalinks it carries the video id. Idempotent. Input that does not parse
/// as a URL is returned trimmed and otherwise untouched.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(mut url) = parse_lenient(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let retained_v = if first_segment_is(&url, "watch") {
        url.query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else {
        None
    };
    match retained_v {
        Some(v) => url.set_query(Some(&format!("v={v}"))),
        None => url.set_query(None),
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

/// True when the link points at a single playable video or clip: a numeric
/// video-id path segment (`/videos/<id>`, `/reel/<id>`, `/stories/<id>`), a
/// watch permalink (`/watch?v=<id>`), a share link (`/share/v/<token>`), or
/// the `fb.watch` short-link host. Channel, profile and group links are
/// rejected. Matching is case-insensitive and tolerates trailing path noise.
pub fn is_valid_video_url(raw: &str) -> bool {
    video_id(raw).is_some()
}

/// The identifier picked out by validation: the numeric video id where the
/// pattern carries one, otherwise the share/short-link token.
pub fn video_id(raw: &str) -> Option<String> {
    let url = parse_lenient(raw.trim())?;
    let host = url.host_str()?;
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();

    if host == "fb.watch" {
        let token = segments.first()?;
        return is_link_token(token).then(|| (*token).to_string());
    }

    if host != "facebook.com" && !host.ends_with(".facebook.com") {
        return None;
    }

    // `<owner>/videos/<id>` anywhere past the first segment.
    for i in 1..segments.len() {
        if segments[i].eq_ignore_ascii_case("videos") {
            if let Some(id) = segments.get(i + 1).filter(|s| is_numeric_id(s)) {
                return Some((*id).to_string());
            }
        }
    }

    match segments.first() {
        Some(first) if first.eq_ignore_ascii_case("reel") || first.eq_ignore_ascii_case("stories") => {
            segments
                .get(1)
                .filter(|s| is_numeric_id(s))
                .map(|s| (*s).to_string())
        }
        Some(first) if first.eq_ignore_ascii_case("watch") => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|v| is_numeric_id(v)),
        Some(first) if first.eq_ignore_ascii_case("share") => {
            let kind = segments.get(1)?;
            if !kind.eq_ignore_ascii_case("v") && !kind.eq_ignore_ascii_case("r") {
                return None;
            }
            segments
                .get(2)
                .filter(|s| is_link_token(s))
                .map(|s| (*s).to_string())
        }
        _ => None,
    }
}

/// Parses a URL, tolerating a missing scheme the way pasted links usually
/// arrive (`facebook.com/reel/1`). Only http(s) links are accepted.
fn parse_lenient(input: &str) -> Option<Url> {
    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{input}")).ok()?
        }
        Err(_) => return None,
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn first_segment_is(url: &Url, expected: &str) -> bool {
    url.path()
        .split('/')
        .find(|s| !s.is_empty())
        .is_some_and(|s| s.eq_ignore_ascii_case(expected))
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_link_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
