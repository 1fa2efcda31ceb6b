//! Router core module - hot path for request routing.
//!
//! Literal routes are a hash lookup per verb. Pattern routes are tried only
//! after the literal lookup misses, in declaration order, first match wins.

use crate::spec::{RouteKey, RouteMeta};
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of positional captures before heap allocation.
pub const MAX_INLINE_CAPTURES: usize = 4;

/// Positional captures of a pattern route.
pub type CaptureVec = SmallVec<[String; MAX_INLINE_CAPTURES]>;

/// Result of successfully matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Capture groups in order; an unmatched optional group yields `""`.
    pub captures: CaptureVec,
}

/// Immutable routing table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    literal: HashMap<Method, HashMap<String, Arc<RouteMeta>>>,
    patterns: HashMap<Method, Vec<(Regex, Arc<RouteMeta>)>>,
}

impl Router {
    /// Index routes. A literal key declared twice keeps the later route.
    #[must_use]
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        let mut router = Router::default();
        for route in routes {
            let method = route.method.clone();
            match route.key.clone() {
                RouteKey::Literal(path) => {
                    let table = router.literal.entry(method.clone()).or_default();
                    if let Some(previous) = table.insert(path.clone(), Arc::new(route)) {
                        warn!(
                            method = %method,
                            path = %path,
                            replaced = %previous.operation_name,
                            "Duplicate route; later declaration wins"
                        );
                    }
                }
                RouteKey::Pattern(re) => {
                    router
                        .patterns
                        .entry(method)
                        .or_default()
                        .push((re, Arc::new(route)));
                }
            }
        }

        // RT5: Routing table loaded
        info!(
            literal_routes = router.literal.values().map(HashMap::len).sum::<usize>(),
            pattern_routes = router.patterns.values().map(Vec::len).sum::<usize>(),
            "Routing table loaded"
        );
        router
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.literal.values().map(HashMap::len).sum::<usize>()
            + self.patterns.values().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve `method` + `path` (e.g. `/v1/user/7`) to a route.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        // RT1: Route match attempt
        debug!(method = %method, path = %path, "Route match attempt");
        let started = Instant::now();

        let found = self.match_literal(method, path).or_else(|| {
            let relative = path.strip_prefix('/').unwrap_or(path);
            self.match_pattern(method, relative)
        });
        let elapsed = started.elapsed();

        match &found {
            Some(m) if elapsed > Duration::from_millis(1) => warn!(
                method = %method,
                path = %path,
                operation = %m.route.operation_name,
                duration_us = elapsed.as_micros(),
                "Slow route matching detected"
            ),
            // RT3: Route matched
            Some(m) => debug!(
                method = %method,
                path = %path,
                operation = %m.route.operation_name,
                version = %m.route.version,
                captures = ?m.captures,
                "Route matched"
            ),
            // RT4: No route found
            None => debug!(method = %method, path = %path, "No route matched"),
        }
        found
    }

    fn match_literal(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.literal
            .get(method)
            .and_then(|table| table.get(path))
            .map(|route| RouteMatch {
                route: Arc::clone(route),
                captures: CaptureVec::new(),
            })
    }

    fn match_pattern(&self, method: &Method, relative: &str) -> Option<RouteMatch> {
        self.patterns.get(method)?.iter().find_map(|(re, route)| {
            let caps = re.captures(relative)?;
            let captures = caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect();
            Some(RouteMatch {
                route: Arc::clone(route),
                captures,
            })
        })
    }
}
