//! Text rendering utilities for human-friendly error messages.
//!
//! Resolution errors name Rust types, and `std::any::type_name` output is
//! long. These helpers shorten type paths, render resolution chains and
//! suggest known types when a lookup misses.

/// Renders a resolution chain, each step pointing at the type it needs.
///
/// # Examples
/// ```
/// use cacodi_support::rendering::render_chain;
///
/// let chain = vec!["Mailer", "SmtpTransport", "Mailer"];
/// assert_eq!(render_chain(&chain), "Mailer → SmtpTransport → Mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut rendered = String::new();
    for (index, step) in chain.iter().enumerate() {
        if index > 0 {
            rendered.push_str(" → ");
        }
        rendered.push_str(step.as_ref());
    }
    rendered
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use cacodi_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// How closely `candidate` resembles `requested`, both lowercased.
///
/// Containment of the full path scores highest, then containment of the
/// short names, then a shared short-name prefix of at least three chars.
fn similarity(requested: &str, requested_short: &str, candidate: &str) -> Option<usize> {
    let candidate_short = shorten_type_name(candidate);

    if candidate.contains(requested) || requested.contains(candidate) {
        Some(100)
    } else if candidate_short.contains(requested_short)
        || requested_short.contains(candidate_short.as_str())
    {
        Some(80)
    } else {
        let shared = candidate_short
            .chars()
            .zip(requested_short.chars())
            .take_while(|(a, b)| a == b)
            .count();
        (shared >= 3).then_some(shared * 10)
    }
}

/// Suggests known type names that look like the requested one.
///
/// The requested name itself is never suggested. At most
/// `max_suggestions` names come back, best match first, ties in name order.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let lowered = requested.to_lowercase();
    let lowered_short = shorten_type_name(&lowered);

    let mut ranked: Vec<(usize, &str)> = available
        .iter()
        .copied()
        .filter(|&name| name != requested)
        .filter_map(|name| {
            similarity(&lowered, &lowered_short, &name.to_lowercase()).map(|score| (score, name))
        })
        .collect();

    ranked.sort_by(|(score_a, name_a), (score_b, name_b)| {
        score_b.cmp(score_a).then_with(|| name_a.cmp(name_b))
    });
    ranked.dedup_by(|a, b| a.1 == b.1);
    ranked
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_owned())
        .collect()
}
