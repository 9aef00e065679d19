//! Search strategies and their query builders.
//!
//! Each strategy is one independent method of proposing candidate
//! repositories. [`StrategyKind`] is a closed enum so the fusion engine
//! can match exhaustively and merge keys cannot drift the way ad hoc
//! strategy-name strings can.
//!
//! Builders are pure: `(target, now) -> Option<String>`. The reference
//! instant is passed in rather than read from the clock so that the
//! same target always yields the same query. A builder that cannot form
//! a meaningful query from the target's attributes returns `None` and
//! the strategy is skipped — never a wildcard search.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::RepositoryRecord;

/// Closed set of ranking strategies.
///
/// The lexical strategies issue GitHub search queries; `SemanticVector`
/// is the precomputed embedding-similarity signal and enters fusion as
/// its own hit list rather than through a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    LanguageTopics,
    Dependencies,
    Semantic,
    Activity,
    Architecture,
    TechStack,
    Recent,
    Domain,
    Community,
    Name,
    License,
    Scale,
    SemanticVector,
}

/// All strategies that run through the search collaborator.
pub const LEXICAL_STRATEGIES: [StrategyKind; 12] = [
    StrategyKind::LanguageTopics,
    StrategyKind::Dependencies,
    StrategyKind::Semantic,
    StrategyKind::Activity,
    StrategyKind::Architecture,
    StrategyKind::TechStack,
    StrategyKind::Recent,
    StrategyKind::Domain,
    StrategyKind::Community,
    StrategyKind::Name,
    StrategyKind::License,
    StrategyKind::Scale,
];

impl StrategyKind {
    /// Fixed prior confidence in this strategy's signal quality.
    ///
    /// Design values, not tunable at runtime. Embedding similarity is
    /// treated as higher-confidence than any lexical query.
    pub fn base_weight(self) -> u32 {
        match self {
            StrategyKind::LanguageTopics => 5,
            StrategyKind::Dependencies | StrategyKind::Semantic => 4,
            StrategyKind::Activity
            | StrategyKind::Architecture
            | StrategyKind::TechStack
            | StrategyKind::Recent => 3,
            StrategyKind::Domain
            | StrategyKind::Community
            | StrategyKind::Name
            | StrategyKind::License
            | StrategyKind::Scale => 2,
            StrategyKind::SemanticVector => 10,
        }
    }

    /// Human-readable label used in console output and warnings.
    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::LanguageTopics => "language+topics",
            StrategyKind::Dependencies => "dependencies",
            StrategyKind::Semantic => "semantic-keywords",
            StrategyKind::Activity => "activity",
            StrategyKind::Architecture => "architecture",
            StrategyKind::TechStack => "tech-stack",
            StrategyKind::Recent => "recent",
            StrategyKind::Domain => "domain",
            StrategyKind::Community => "community",
            StrategyKind::Name => "name",
            StrategyKind::License => "license",
            StrategyKind::Scale => "scale",
            StrategyKind::SemanticVector => "semantic-vector",
        }
    }

    /// Build the GitHub search query for this strategy against `target`.
    ///
    /// Returns `None` when the target lacks the attributes the strategy
    /// needs. `SemanticVector` never produces a query.
    pub fn build_query(self, target: &RepositoryRecord, now: DateTime<Utc>) -> Option<String> {
        let query = match self {
            StrategyKind::LanguageTopics => build_language_topics(target),
            StrategyKind::Dependencies => build_dependencies(target),
            StrategyKind::Semantic => build_semantic_keywords(target),
            StrategyKind::Activity => build_activity(target),
            StrategyKind::Architecture => build_architecture(target),
            StrategyKind::TechStack => build_tech_stack(target),
            StrategyKind::Recent => build_recent(target, now),
            StrategyKind::Domain => build_domain(target),
            StrategyKind::Community => build_community(target),
            StrategyKind::Name => build_name(target),
            StrategyKind::License => build_license(target),
            StrategyKind::Scale => build_scale(target),
            StrategyKind::SemanticVector => None,
        }?;
        // Exclusion is also enforced in code; the qualifier just saves a
        // wasted result slot.
        Some(format!("{} -repo:{}", query, target.full_name))
    }
}

fn language_clause(target: &RepositoryRecord) -> Option<String> {
    target.language.as_deref().map(|lang| {
        if lang.contains(' ') {
            format!("language:\"{}\"", lang)
        } else {
            format!("language:{}", lang)
        }
    })
}

fn build_language_topics(target: &RepositoryRecord) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(lang) = language_clause(target) {
        parts.push(lang);
    }
    for topic in target.topics.iter().take(3) {
        parts.push(format!("topic:{}", topic));
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(" "))
}

fn build_dependencies(target: &RepositoryRecord) -> Option<String> {
    let deps: Vec<String> = target
        .dependencies
        .iter()
        .take(3)
        .map(|d| format!("\"{}\"", d))
        .collect();
    if deps.is_empty() {
        return None;
    }
    Some(format!("{} in:readme,description", deps.join(" ")))
}

/// Stopwords dropped when extracting keywords from descriptions.
const STOPWORDS: [&str; 18] = [
    "with", "that", "this", "from", "your", "into", "which", "their", "about", "using", "used",
    "based", "built", "make", "makes", "library", "simple", "easy",
];

/// Lowercased, alphanumeric-only description words longer than three
/// characters, deduplicated in order of first appearance.
pub fn description_keywords(description: &str, max: usize) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for raw in description.split_whitespace() {
        let word: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if word.len() <= 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if !keywords.contains(&word) {
            keywords.push(word);
        }
        if keywords.len() == max {
            break;
        }
    }
    keywords
}

fn build_semantic_keywords(target: &RepositoryRecord) -> Option<String> {
    let description = target.description.as_deref()?;
    let keywords = description_keywords(description, 5);
    if keywords.is_empty() {
        return None;
    }
    Some(format!("{} in:description", keywords.join(" ")))
}

/// Bracket a count into `low..high` around its current value.
fn bracket(value: u64) -> (u64, u64) {
    if value == 0 {
        (0, 50)
    } else {
        (value / 2, value.saturating_mul(2).max(value + 1))
    }
}

fn build_activity(target: &RepositoryRecord) -> Option<String> {
    let (low, high) = bracket(target.stars);
    let mut query = format!("stars:{}..{}", low, high);
    if let Some(lang) = language_clause(target) {
        query = format!("{} {}", lang, query);
    }
    Some(query)
}

const ARCHITECTURE_TERMS: [&str; 12] = [
    "cli", "framework", "compiler", "parser", "runtime", "plugin", "server", "client", "sdk",
    "api", "engine", "toolkit",
];

/// Terms from `lexicon` found in the target's topics or description.
fn matched_terms(target: &RepositoryRecord, lexicon: &[&str], max: usize) -> Vec<String> {
    let description = target
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let mut found = Vec::new();
    for term in lexicon {
        let in_topics = target.topics.iter().any(|t| t.eq_ignore_ascii_case(term));
        if in_topics || description.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()).eq_ignore_ascii_case(term)) {
            found.push(term.to_string());
        }
        if found.len() == max {
            break;
        }
    }
    found
}

fn build_architecture(target: &RepositoryRecord) -> Option<String> {
    let terms = matched_terms(target, &ARCHITECTURE_TERMS, 4);
    if terms.is_empty() {
        return None;
    }
    let mut query = terms.join(" ");
    if let Some(lang) = language_clause(target) {
        query = format!("{} {}", query, lang);
    }
    Some(query)
}

/// Ecosystem keywords per primary language.
fn ecosystem_terms(language: &str) -> &'static [&'static str] {
    match language.to_lowercase().as_str() {
        "rust" => &["cargo", "crate"],
        "javascript" => &["npm", "node"],
        "typescript" => &["npm", "typescript"],
        "python" => &["pip", "pypi"],
        "go" => &["golang", "module"],
        "java" => &["maven", "gradle"],
        "ruby" => &["gem", "bundler"],
        "c#" => &["nuget", "dotnet"],
        "c++" | "c" => &["cmake", "native"],
        _ => &[],
    }
}

fn build_tech_stack(target: &RepositoryRecord) -> Option<String> {
    let language = target.language.as_deref()?;
    let mut parts = vec![language_clause(target)?];
    parts.extend(ecosystem_terms(language).iter().map(|t| t.to_string()));
    for dep in target.dependencies.iter().take(2) {
        parts.push(format!("\"{}\"", dep));
    }
    if parts.len() == 1 {
        return None;
    }
    Some(parts.join(" "))
}

fn build_recent(target: &RepositoryRecord, now: DateTime<Utc>) -> Option<String> {
    let lang = language_clause(target)?;
    let cutoff = (now - Duration::days(90)).format("%Y-%m-%d");
    Some(format!("{} pushed:>{}", lang, cutoff))
}

const DOMAIN_TERMS: [&str; 16] = [
    "web",
    "frontend",
    "backend",
    "game",
    "machine-learning",
    "data",
    "security",
    "blockchain",
    "devops",
    "mobile",
    "graphics",
    "audio",
    "networking",
    "database",
    "testing",
    "embedded",
];

fn build_domain(target: &RepositoryRecord) -> Option<String> {
    let terms = matched_terms(target, &DOMAIN_TERMS, 3);
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" "))
}

fn build_community(target: &RepositoryRecord) -> Option<String> {
    let (low, high) = bracket(target.forks);
    let mut query = format!("forks:{}..{}", low, high);
    if let Some(lang) = language_clause(target) {
        query = format!("{} {}", lang, query);
    }
    Some(query)
}

fn build_name(target: &RepositoryRecord) -> Option<String> {
    let tokens: Vec<&str> = target
        .name()
        .split(['-', '_', '.'])
        .filter(|t| t.len() > 2)
        .take(3)
        .collect();
    if tokens.is_empty() {
        return None;
    }
    Some(format!("{} in:name", tokens.join(" ")))
}

fn build_license(target: &RepositoryRecord) -> Option<String> {
    let license = target.license.as_deref()?;
    // GitHub's qualifier wants the lowercase SPDX keyword.
    let mut query = format!("license:{}", license.to_lowercase());
    if let Some(lang) = language_clause(target) {
        query = format!("{} {}", query, lang);
    }
    Some(query)
}

fn build_scale(target: &RepositoryRecord) -> Option<String> {
    let (low, high) = if target.size_kb == 0 {
        (0, 100)
    } else {
        bracket(target.size_kb)
    };
    let mut query = format!("size:{}..{}", low, high);
    if let Some(lang) = language_clause(target) {
        query = format!("{} {}", lang, query);
    }
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn target() -> RepositoryRecord {
        RepositoryRecord {
            full_name: "facebook/react".to_string(),
            language: Some("JavaScript".to_string()),
            topics: vec!["react".to_string(), "frontend".to_string()],
            description: Some(
                "Declarative component framework for building user interfaces".to_string(),
            ),
            stars: 200_000,
            forks: 40_000,
            updated_at: 1_700_000_000,
            readme_excerpt: None,
            dependencies: vec!["loose-envify".to_string(), "scheduler".to_string()],
            license: Some("MIT".to_string()),
            size_kb: 500_000,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_builders_are_deterministic() {
        let t = target();
        let now = fixed_now();
        for kind in LEXICAL_STRATEGIES {
            let first = kind.build_query(&t, now);
            let second = kind.build_query(&t, now);
            assert_eq!(first, second, "{:?} was not deterministic", kind);
        }
    }

    #[test]
    fn test_every_query_excludes_target() {
        let t = target();
        for kind in LEXICAL_STRATEGIES {
            if let Some(query) = kind.build_query(&t, fixed_now()) {
                assert!(
                    query.contains("-repo:facebook/react"),
                    "{:?}: {}",
                    kind,
                    query
                );
            }
        }
    }

    #[test]
    fn test_language_topics_query() {
        let query = StrategyKind::LanguageTopics
            .build_query(&target(), fixed_now())
            .unwrap();
        assert!(query.starts_with("language:JavaScript topic:react topic:frontend"));
    }

    #[test]
    fn test_language_with_space_is_quoted() {
        let mut t = target();
        t.language = Some("Jupyter Notebook".to_string());
        let query = StrategyKind::LanguageTopics.build_query(&t, fixed_now()).unwrap();
        assert!(query.contains("language:\"Jupyter Notebook\""));
    }

    #[test]
    fn test_empty_builders_skip_instead_of_wildcard() {
        let bare = RepositoryRecord {
            full_name: "a/b".to_string(),
            ..Default::default()
        };
        assert_eq!(StrategyKind::LanguageTopics.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::Dependencies.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::Semantic.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::Architecture.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::TechStack.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::Recent.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::Domain.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::Name.build_query(&bare, fixed_now()), None);
        assert_eq!(StrategyKind::License.build_query(&bare, fixed_now()), None);
    }

    #[test]
    fn test_activity_brackets_zero_stars() {
        let mut t = target();
        t.stars = 0;
        t.language = None;
        let query = StrategyKind::Activity.build_query(&t, fixed_now()).unwrap();
        assert!(query.starts_with("stars:0..50"));
    }

    #[test]
    fn test_recent_uses_reference_instant() {
        let query = StrategyKind::Recent.build_query(&target(), fixed_now()).unwrap();
        assert!(query.contains("pushed:>2024-03-03"), "{}", query);
    }

    #[test]
    fn test_description_keywords_filters_short_and_stopwords() {
        let keywords = description_keywords(
            "A tiny CLI tool with fast incremental parsing for the web",
            5,
        );
        assert_eq!(keywords, vec!["tiny", "tool", "fast", "incremental", "parsing"]);
    }

    #[test]
    fn test_semantic_vector_never_builds_a_query() {
        assert_eq!(
            StrategyKind::SemanticVector.build_query(&target(), fixed_now()),
            None
        );
    }

    #[test]
    fn test_base_weights() {
        assert_eq!(StrategyKind::LanguageTopics.base_weight(), 5);
        assert_eq!(StrategyKind::Dependencies.base_weight(), 4);
        assert_eq!(StrategyKind::Semantic.base_weight(), 4);
        assert_eq!(StrategyKind::Activity.base_weight(), 3);
        assert_eq!(StrategyKind::Domain.base_weight(), 2);
        assert_eq!(StrategyKind::SemanticVector.base_weight(), 10);
    }
}
