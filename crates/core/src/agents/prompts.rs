//! Default system prompts bundled at compile time.

/// Planner - turns a query into web searches. `{searches}` is substituted.
pub const PLANNER: &str = include_str!("defaults/planner.md");

/// Searcher - runs one web search and summarizes it
pub const SEARCHER: &str = include_str!("defaults/searcher.md");

/// Writer - synthesizes the markdown report
pub const WRITER: &str = include_str!("defaults/writer.md");

/// Critic - reviews a report for gaps
pub const CRITIC: &str = include_str!("defaults/critic.md");

/// Email - formats the report for delivery
pub const EMAIL: &str = include_str!("defaults/email.md");

/// Planner prompt asking for `searches` searches
pub fn planner(searches: usize) -> String {
    PLANNER.replace("{searches}", &searches.to_string())
}

/// All default prompts with their stage ids
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("planner", PLANNER),
        ("searcher", SEARCHER),
        ("writer", WRITER),
        ("critic", CRITIC),
        ("email", EMAIL),
    ]
}
