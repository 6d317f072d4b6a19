//! Report export: Markdown for humans, JSON for downstream tooling.

use crate::types::{ExecutiveReport, Insight, Priority};
use chrono::Utc;
use serde_json::json;

/// Render a report as a Markdown document.
pub fn to_markdown(report: &ExecutiveReport) -> String {
    let mut out = String::new();

    out.push_str("# Competitive Intelligence Report\n\n");
    out.push_str(&format!(
        "**Generated:** {}  \n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!("**Timeframe:** {}  \n", report.research_timeframe));
    out.push_str(&format!(
        "**Data sources:** {}\n\n",
        report.data_sources_count
    ));

    out.push_str("## Executive Summary\n\n");
    out.push_str(&report.executive_summary);
    out.push_str("\n\n");

    out.push_str("## Key Insights\n\n");
    for insight in &report.key_insights {
        out.push_str(&format!(
            "### {} {}\n\n",
            priority_marker(insight.priority),
            insight.title
        ));
        out.push_str(&insight_body(insight));
    }

    out.push_str("## Competitor Analysis\n\n");
    for artifact in &report.competitor_analysis {
        out.push_str(&format!("### {}\n\n", artifact.competitor));
        out.push_str(&format!("{}\n\n", artifact.ai_narrative));
        if !artifact.key_initiatives.is_empty() {
            out.push_str("**Key initiatives:**\n\n");
            for initiative in &artifact.key_initiatives {
                out.push_str(&format!("- {initiative}\n"));
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "**Positioning:** {}\n\n",
            artifact.market_positioning
        ));
        out.push_str(&format!("**Sources:** {}\n\n", artifact.sources.len()));
    }

    out.push_str("## Market Opportunities\n\n");
    for (i, opportunity) in report.market_opportunities.iter().enumerate() {
        out.push_str(&format!("{}. {opportunity}\n", i + 1));
    }
    out.push('\n');

    out.push_str("## Strategic Recommendations\n\n");
    for (i, recommendation) in report.strategic_recommendations.iter().enumerate() {
        out.push_str(&format!("{}. {recommendation}\n", i + 1));
    }
    out.push('\n');

    out
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "[HIGH]",
        Priority::Medium => "[MEDIUM]",
        Priority::Low => "[LOW]",
    }
}

fn insight_body(insight: &Insight) -> String {
    format!(
        "{}\n\n**Impact:** {}  \n**Action:** {}  \n**Timeline:** {:?}\n\n",
        insight.description,
        insight.business_impact,
        insight.recommended_action,
        insight.timeline
    )
}

/// Serialize a report as pretty JSON wrapped in an export envelope.
pub fn to_json(report: &ExecutiveReport) -> serde_json::Result<String> {
    let envelope = json!({
        "metadata": {
            "export_timestamp": Utc::now(),
            "format": "json",
            "version": "1.0",
        },
        "report": report,
    });
    serde_json::to_string_pretty(&envelope)
}
