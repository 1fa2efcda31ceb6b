//! `Accept` header parsing and weighted media-type selection.

/// One media range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub main: String,
    pub sub: String,
    pub q: f32,
}

impl MediaRange {
    /// 2 for an exact match, 1 for `type/*`, 0 for `*/*`, `None` when it does not match.
    fn specificity(&self, main: &str, sub: &str) -> Option<u8> {
        match (self.main.as_str(), self.sub.as_str()) {
            ("*", _) => Some(0),
            (m, "*") if m == main => Some(1),
            (m, s) if m == main && s == sub => Some(2),
            _ => None,
        }
    }
}

fn parse_q(value: &str) -> f32 {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|q| q.is_finite())
        .map_or(1.0, |q| q.clamp(0.0, 1.0))
}

/// Parse a header such as `text/html;q=0.8, application/*`.
///
/// Malformed `q` values count as 1.0; a bare `*` counts as `*/*`.
#[must_use]
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let range = pieces.next()?.trim().to_ascii_lowercase();
            if range.is_empty() {
                return None;
            }
            let (main, sub) = match range.split_once('/') {
                Some((m, s)) => (m.trim().to_string(), s.trim().to_string()),
                None if range == "*" => ("*".to_string(), "*".to_string()),
                None => return None,
            };
            let q = pieces
                .filter_map(|p| p.split_once('='))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("q"))
                .map_or(1.0, |(_, v)| parse_q(v));
            Some(MediaRange { main, sub, q })
        })
        .collect()
}

/// Quality the client assigns to `media_type`: the most specific matching
/// range decides. `None` when no range matches.
#[must_use]
pub fn quality(ranges: &[MediaRange], media_type: &str) -> Option<(f32, bool)> {
    let lowered = media_type.to_ascii_lowercase();
    let (main, sub) = lowered.split_once('/').unwrap_or((lowered.as_str(), ""));
    let mut best: Option<(u8, f32)> = None;
    for range in ranges {
        if let Some(spec) = range.specificity(main, sub) {
            if best.map_or(true, |(s, _)| spec > s) {
                best = Some((spec, range.q));
            }
        }
    }
    best.map(|(spec, q)| (q, spec == 2))
}

/// Pick the best of `candidates` (in registration order) for `header`.
///
/// Ties prefer an explicit match, then `default`, then registration order.
/// Returns `None` when every candidate is unacceptable.
#[must_use]
pub fn select<'a>(header: &str, candidates: &'a [String], default: Option<&str>) -> Option<&'a str> {
    let ranges = parse_accept(header);
    let mut best: Option<((f32, bool, bool), &'a str)> = None;
    for candidate in candidates {
        let Some((q, explicit)) = quality(&ranges, candidate) else {
            continue;
        };
        if q <= 0.0 {
            continue;
        }
        let is_default = default == Some(candidate.as_str());
        let score = (q, explicit, is_default);
        // Strictly greater keeps the earlier registration on a full tie.
        let better = match &best {
            None => true,
            Some((current, _)) => score.partial_cmp(current) == Some(std::cmp::Ordering::Greater),
        };
        if better {
            best = Some((score, candidate.as_str()));
        }
    }
    best.map(|(_, media)| media)
}
