//! Best-effort parsing of free-text model output into structured records.
//!
//! Model responses are prose, not a stable format, so every parser here is
//! total: it scans for recognizable structure and substitutes a usable
//! default wherever extraction comes up empty. Callers rely on "never fails,
//! always returns a usable record". The `ResponseParser` trait keeps the
//! heuristics pluggable.

use crate::types::{
    Insight, InsightKind, Priority, ResearchArtifact, ResearchSource, SourceKind, Timeline,
};
use chrono::{Duration, Utc};

/// Pluggable parser for the three response shapes the pipeline consumes.
pub trait ResponseParser: Send + Sync {
    /// Parse a research response into an artifact for `subject`.
    fn artifact(&self, subject: &str, content: &str) -> ResearchArtifact;

    /// Parse categorized insights out of a synthesis response.
    fn insights(&self, content: &str) -> Vec<Insight>;

    /// Parse a numbered/bulleted list response.
    fn list(&self, content: &str) -> Vec<String>;
}

/// Section-scanning line parser. The default implementation.
pub struct HeuristicParser;

impl ResponseParser for HeuristicParser {
    fn artifact(&self, subject: &str, content: &str) -> ResearchArtifact {
        let mut narrative = String::new();
        let mut initiatives = Vec::new();
        let mut sources = Vec::new();

        let mut section = Section::None;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let lower = line.to_lowercase();
            if lower.contains("ai strategy") || lower.contains("narrative") {
                section = Section::Narrative;
            } else if lower.contains("initiative") || lower.contains("product") {
                section = Section::Initiatives;
            } else if lower.contains("source") || lower.contains("http") {
                section = Section::Sources;
            }

            match section {
                Section::Narrative if line.len() > 50 => {
                    narrative.push_str(line);
                    narrative.push(' ');
                }
                Section::Initiatives if line.starts_with('-') => {
                    initiatives.push(line[1..].trim().to_string());
                }
                Section::Sources if line.contains("http") || line.contains("www") => {
                    if let Some(source) = extract_source(line) {
                        sources.push(source);
                    }
                }
                _ => {}
            }
        }

        let confidence_score = if sources.is_empty() { 0.6 } else { 0.8 };
        let narrative = narrative.trim().to_string();

        ResearchArtifact {
            competitor: subject.to_string(),
            ai_narrative: if narrative.is_empty() {
                format!("{subject} AI strategy analysis")
            } else {
                narrative
            },
            key_initiatives: if initiatives.is_empty() {
                vec![format!("{subject} AI initiatives")]
            } else {
                initiatives
            },
            investment_data: None,
            market_positioning: format!("{subject} positioning in AI services market"),
            sources: if sources.is_empty() {
                vec![default_source(subject)]
            } else {
                sources
            },
            generated_at: Utc::now(),
            confidence_score,
        }
    }

    fn insights(&self, content: &str) -> Vec<Insight> {
        let mut insights = Vec::new();
        let mut current: Option<InsightDraft> = None;

        for line in content.lines() {
            let line = line.trim();
            let Some((key, value)) = split_key_value(line) else {
                continue;
            };

            // Blocks may open with either `type:` or `title:`; a repeat of
            // either key flushes the insight being built.
            match key.as_str() {
                "title" => {
                    if let Some(draft) = current.take_if(|d| d.title.is_some()) {
                        insights.push(draft.build());
                    }
                    current.get_or_insert_with(InsightDraft::default).title = Some(value);
                }
                "insight_type" | "type" => {
                    if let Some(draft) = current.take_if(|d| d.kind.is_some()) {
                        insights.push(draft.build());
                    }
                    current.get_or_insert_with(InsightDraft::default).kind = Some(value);
                }
                "description" => draft_field(&mut current, |d| d.description = Some(value)),
                "business_impact" => {
                    draft_field(&mut current, |d| d.business_impact = Some(value))
                }
                "recommended_action" => {
                    draft_field(&mut current, |d| d.recommended_action = Some(value))
                }
                "priority" => draft_field(&mut current, |d| d.priority = Some(value)),
                "timeline" => draft_field(&mut current, |d| d.timeline = Some(value)),
                _ => {}
            }
        }
        if let Some(draft) = current {
            insights.push(draft.build());
        }

        if insights.is_empty() {
            vec![default_insight()]
        } else {
            insights
        }
    }

    fn list(&self, content: &str) -> Vec<String> {
        let mut items = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            let numbered = line.chars().next().is_some_and(|c| c.is_ascii_digit());
            if line.is_empty() || (!numbered && !line.starts_with('-')) {
                continue;
            }

            let item = line
                .split_once(". ")
                .or_else(|| line.split_once("- "))
                .map(|(_, rest)| rest)
                .unwrap_or(line)
                .trim();

            // Skip noise like bare numbering or stray dashes.
            if item.len() > 10 {
                items.push(item.to_string());
            }
        }

        if items.is_empty() {
            vec!["Analysis completed - detailed review recommended".to_string()]
        } else {
            items
        }
    }
}

enum Section {
    None,
    Narrative,
    Initiatives,
    Sources,
}

/// Lowercased `key: value` split for insight blocks.
fn split_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key
        .trim()
        .trim_start_matches(['-', '*', '"'])
        .trim()
        .to_lowercase()
        .replace(' ', "_");
    let value = value.trim().trim_matches('"').to_string();
    if value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn draft_field(current: &mut Option<InsightDraft>, apply: impl FnOnce(&mut InsightDraft)) {
    if let Some(draft) = current.as_mut() {
        apply(draft);
    }
}

#[derive(Default)]
struct InsightDraft {
    kind: Option<String>,
    title: Option<String>,
    description: Option<String>,
    business_impact: Option<String>,
    recommended_action: Option<String>,
    priority: Option<String>,
    timeline: Option<String>,
}

impl InsightDraft {
    fn build(self) -> Insight {
        Insight {
            kind: self.kind.as_deref().map(parse_kind).unwrap_or(InsightKind::Opportunity),
            title: clip(self.title.as_deref().unwrap_or("Strategic Insight"), 50),
            description: clip(
                self.description
                    .as_deref()
                    .unwrap_or("Analysis of competitive landscape"),
                200,
            ),
            business_impact: clip(
                self.business_impact
                    .as_deref()
                    .unwrap_or("Potential market impact"),
                150,
            ),
            recommended_action: clip(
                self.recommended_action
                    .as_deref()
                    .unwrap_or("Evaluate strategic response"),
                200,
            ),
            priority: self
                .priority
                .as_deref()
                .map(parse_priority)
                .unwrap_or(Priority::Medium),
            timeline: self
                .timeline
                .as_deref()
                .map(parse_timeline)
                .unwrap_or(Timeline::ShortTerm),
        }
    }
}

fn parse_kind(value: &str) -> InsightKind {
    match value.trim().to_lowercase().as_str() {
        "threat" => InsightKind::Threat,
        "trend" => InsightKind::Trend,
        "action" => InsightKind::Action,
        _ => InsightKind::Opportunity,
    }
}

fn parse_priority(value: &str) -> Priority {
    match value.trim().to_lowercase().as_str() {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

fn parse_timeline(value: &str) -> Timeline {
    match value.trim().to_lowercase().as_str() {
        "immediate" => Timeline::Immediate,
        "long_term" | "long-term" => Timeline::LongTerm,
        _ => Timeline::ShortTerm,
    }
}

/// Truncate to at most `max` characters, respecting char boundaries.
fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Pull a URL and title out of one line of source text.
fn extract_source(line: &str) -> Option<ResearchSource> {
    let url_start = line.find("http")?;
    let rest = &line[url_start..];
    let url_end = rest.find(' ').unwrap_or(rest.len());
    let url = rest[..url_end].to_string();

    let title = line[..url_start].trim().trim_end_matches(['-', ':', '(']);
    let title = if title.is_empty() {
        "Research Source".to_string()
    } else {
        title.trim().to_string()
    };

    Some(ResearchSource {
        url,
        title,
        kind: SourceKind::Report,
        // Approximate; the model rarely states an exact date inline.
        publication_date: Utc::now() - Duration::days(30),
        author: None,
        credibility_score: 0.8,
    })
}

/// Placeholder source used when extraction finds nothing citable.
fn default_source(subject: &str) -> ResearchSource {
    ResearchSource {
        url: format!(
            "https://research.example.com/competitors/{}",
            subject.to_lowercase()
        ),
        title: format!("{subject} AI Strategy Analysis"),
        kind: SourceKind::Research,
        publication_date: Utc::now() - Duration::days(14),
        author: None,
        credibility_score: 0.7,
    }
}

/// Placeholder insight used when no structured insight could be parsed.
pub fn default_insight() -> Insight {
    Insight {
        kind: InsightKind::Opportunity,
        title: "Competitive Analysis Required".into(),
        description: "Manual review of competitive intelligence data needed".into(),
        business_impact: "Strategic positioning may be affected".into(),
        recommended_action: "Conduct detailed analysis of competitor AI strategies".into(),
        priority: Priority::High,
        timeline: Timeline::Immediate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESEARCH: &str = r#"
AI Strategy and Narrative
Accenture has repositioned its entire services portfolio around generative AI delivery at scale.
The company continues to emphasize data readiness as a precondition for enterprise adoption plans.

Key Initiatives
- Launched an AI refinery platform for clients
- Expanded the LearnVantage training business

Sources
Annual strategy report https://example.com/strategy-report
https://example.com/press published last month
"#;

    #[test]
    fn test_artifact_parses_sections() {
        let parser = HeuristicParser;
        let artifact = parser.artifact("Accenture", SAMPLE_RESEARCH);

        assert_eq!(artifact.competitor, "Accenture");
        assert!(artifact.ai_narrative.contains("generative AI"));
        assert_eq!(artifact.key_initiatives.len(), 2);
        assert_eq!(artifact.sources.len(), 2);
        assert_eq!(artifact.sources[0].url, "https://example.com/strategy-report");
        assert_eq!(artifact.sources[0].title, "Annual strategy report");
        assert!((artifact.confidence_score - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_artifact_defaults_on_empty_content() {
        let parser = HeuristicParser;
        let artifact = parser.artifact("Wipro", "");

        assert_eq!(artifact.ai_narrative, "Wipro AI strategy analysis");
        assert_eq!(artifact.key_initiatives, vec!["Wipro AI initiatives".to_string()]);
        assert_eq!(artifact.sources.len(), 1);
        assert_eq!(artifact.sources[0].kind, SourceKind::Research);
        assert!((artifact.confidence_score - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_source_line_without_title() {
        let source = extract_source("https://example.com/a").unwrap();
        assert_eq!(source.title, "Research Source");
        assert_eq!(source.url, "https://example.com/a");
    }

    #[test]
    fn test_insights_parses_blocks() {
        let parser = HeuristicParser;
        let content = r#"
title: Rival platform gaining enterprise traction
type: threat
description: A competing AI platform is winning large accounts.
priority: high
timeline: immediate

title: Underserved mid-market segment
description: Mid-market AI adoption remains unaddressed.
priority: low
"#;
        let insights = parser.insights(content);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Threat);
        assert_eq!(insights[0].priority, Priority::High);
        assert_eq!(insights[0].timeline, Timeline::Immediate);
        // Unstated fields fall back to defaults.
        assert_eq!(insights[1].kind, InsightKind::Opportunity);
        assert_eq!(insights[1].timeline, Timeline::ShortTerm);
    }

    #[test]
    fn test_insights_type_line_may_precede_title() {
        let parser = HeuristicParser;
        let content = r#"
type: threat
title: Rival platform gaining enterprise traction
description: A competing AI platform is winning large accounts.
priority: high

type: trend
title: Consolidation around a few model vendors
timeline: long_term
"#;
        let insights = parser.insights(content);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Threat);
        assert_eq!(insights[0].title, "Rival platform gaining enterprise traction");
        assert_eq!(insights[1].kind, InsightKind::Trend);
        assert_eq!(insights[1].timeline, Timeline::LongTerm);
    }

    #[test]
    fn test_insights_default_when_unparseable() {
        let parser = HeuristicParser;
        let insights = parser.insights("nothing structured here");
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Competitive Analysis Required");
    }

    #[test]
    fn test_list_parses_numbered_items() {
        let parser = HeuristicParser;
        let items = parser.list(
            "1. Expand sovereign cloud AI offerings in Europe\n2. Target regulated industries\n- Partner with chip vendors for capacity\nshort\n",
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], "Expand sovereign cloud AI offerings in Europe");
        assert_eq!(items[2], "Partner with chip vendors for capacity");
    }

    #[test]
    fn test_list_filters_short_items_and_defaults() {
        let parser = HeuristicParser;
        let items = parser.list("1. tiny\n2. ok\n");
        assert_eq!(
            items,
            vec!["Analysis completed - detailed review recommended".to_string()]
        );
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("héllo wörld", 5), "héllo");
        assert_eq!(clip("short", 50), "short");
    }
}
