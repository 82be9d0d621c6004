//! Text rendering utilities for human-friendly diagnostics.
//!
//! Formats module chains, type names, "did you mean?" suggestions
//! and the instantiation plan printed by construction reports.

/// Renders a chain of names joined by arrows.
///
/// # Examples
/// ```
/// use trellis_support::rendering::render_chain;
///
/// let chain = vec!["ServiceModule", "StorageModule", "ServiceModule"];
/// assert_eq!(render_chain(&chain), "ServiceModule → StorageModule → ServiceModule");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut out = String::new();
    for (i, link) in chain.iter().enumerate() {
        if i > 0 {
            out.push_str(" → ");
        }
        out.push_str(link.as_ref());
    }
    out
}

/// One step of an instantiation plan: a module and the instances it produced.
#[derive(Debug, Clone)]
pub struct PlanStep {
    /// Module name
    pub module: String,
    /// `(instance name, type name)` pairs, in factory order
    pub instances: Vec<(String, String)>,
}

/// Renders an instantiation plan, one numbered module per block.
///
/// ```text
/// 1. StorageModule
///      db: Database
/// 2. ServiceModule
///      svc: Service
/// ```
pub fn render_plan(steps: &[PlanStep]) -> String {
    let width = steps.len().to_string().len();
    let mut out = String::new();

    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("{:>width$}. {}\n", i + 1, step.module));
        if step.instances.is_empty() {
            out.push_str(&format!("{:width$}     (no instances)\n", ""));
        }
        for (name, type_name) in &step.instances {
            out.push_str(&format!(
                "{:width$}     {name}: {}\n",
                "",
                shorten_type_name(type_name),
            ));
        }
    }

    out
}

/// Strips module paths from a fully qualified type name.
///
/// ```
/// use trellis_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("my_app::storage::Database"), "Database");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn my_app::logging::Logger>"),
///     "Arc<dyn Logger>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut segment_start = 0;
    let bytes = full_name.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b':' if bytes.get(i + 1) == Some(&b':') => {
                // path prefix: drop everything since the last delimiter
                i += 2;
                segment_start = i;
                continue;
            }
            b'<' | b'>' | b',' | b' ' | b'(' | b')' | b'[' | b']' | b'&' | b';' => {
                out.push_str(&full_name[segment_start..i]);
                out.push(bytes[i] as char);
                segment_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    out.push_str(&full_name[segment_start..]);
    out
}

/// Returns up to `max_suggestions` entries of `available` that look like `requested`.
///
/// Candidates are ranked by case-insensitive substring containment first,
/// then by edit distance of the shortened names.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, &str)> = available
        .iter()
        .filter_map(|&candidate| {
            let short = shorten_type_name(candidate).to_lowercase();
            if short == wanted {
                return None;
            }
            if short.contains(&wanted) || wanted.contains(&short) {
                return Some((0, candidate));
            }
            let distance = edit_distance(&wanted, &short);
            let budget = (wanted.chars().count().max(short.chars().count()) / 3).max(1);
            (distance <= budget).then_some((distance, candidate))
        })
        .collect();

    ranked.sort_by_key(|(score, _)| *score);
    ranked
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }

    row[b.len()]
}
