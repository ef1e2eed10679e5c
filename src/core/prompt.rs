//! Builds the user-turn payloads for analysis and synthesis calls.

use std::fmt::Write;

use crate::core::sources::{ContextSnapshot, SampleCategory};
use crate::core::store::types::ProjectRecord;

/// Categories this small are listed title by title.
const ENUMERATE_AT_MOST: usize = 5;

pub const LEARN_FROM_REJECTIONS: &str = "The following actions were previously rejected. Please learn from these to improve your recommendations:";

#[derive(Debug, Clone)]
pub struct AgentAnalysis {
    pub agent_name: String,
    pub output: String,
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_category(out: &mut String, category: &SampleCategory) {
    if category.items.is_empty() {
        return;
    }
    let _ = writeln!(
        out,
        "**{} Available:** {} {}(s)",
        category.label,
        category.items.len(),
        category.unit
    );
    if category.items.len() <= ENUMERATE_AT_MOST {
        for (idx, item) in category.items.iter().enumerate() {
            let title = item
                .title
                .clone()
                .unwrap_or_else(|| format!("Untitled {}", capitalize(&category.unit)));
            let _ = writeln!(out, "  {}. {}", idx + 1, title);
        }
    }
    out.push('\n');
}

fn write_rejections(out: &mut String, rejections: &[String]) {
    if rejections.is_empty() {
        return;
    }
    out.push_str("## Previous Action Rejections\n\n");
    out.push_str(LEARN_FROM_REJECTIONS);
    out.push_str("\n\n");
    for (idx, reason) in rejections.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", idx + 1, reason);
    }
    out.push('\n');
}

fn write_body(out: &mut String, project: &ProjectRecord, snapshot: &ContextSnapshot) {
    out.push_str("# Project Context\n\n");
    let _ = write!(out, "**Project Name:** {}\n\n", project.name);
    if let Some(desc) = project.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = write!(out, "**Project Description:**\n{}\n\n", desc);
    }

    out.push_str("## Available Data Sources\n\n");
    if snapshot.is_empty() {
        out.push_str("No data sources are currently connected.\n\n");
    }
    for (kind, sample) in snapshot {
        let _ = writeln!(out, "### {} Data", kind.display_name());
        if sample.item_count() == 0 {
            out.push_str("No content found.\n\n");
            continue;
        }
        for category in &sample.categories {
            write_category(out, category);
        }
    }
}

/// Shared context rendering used by both analysis and synthesis. Analysis
/// passes `None`; synthesis passes the recent rejection reasons.
pub fn format_context(
    project: &ProjectRecord,
    snapshot: &ContextSnapshot,
    rejections: Option<&[String]>,
) -> String {
    let mut out = String::new();
    write_body(&mut out, project, snapshot);
    if let Some(reasons) = rejections {
        write_rejections(&mut out, reasons);
    }
    out
}

/// User turn for one analysis agent.
pub fn build_analysis_message(project: &ProjectRecord, snapshot: &ContextSnapshot) -> String {
    let mut out = format_context(project, snapshot, None);
    out.push_str("---\n\n");
    out.push_str("Please analyze the available data and provide your insights and recommendations in a clear, well-structured format. Use headings, bullet points, and clear sections to organize your analysis.");
    out
}

/// Context plus every agent's labeled output and the JSON contract.
pub fn build_synthesis_message(
    project: &ProjectRecord,
    snapshot: &ContextSnapshot,
    rejections: &[String],
    analyses: &[AgentAnalysis],
) -> String {
    let mut out = format_context(project, snapshot, Some(rejections));
    out.push_str("## Agent Analyses\n\n");
    for (idx, analysis) in analyses.iter().enumerate() {
        let _ = write!(
            out,
            "### {}. {}\n{}\n\n",
            idx + 1,
            analysis.agent_name,
            analysis.output.trim()
        );
    }

    out.push_str("---\n\n");
    out.push_str(
        "Based on all the agent analyses above, propose 2-3 actions. Each action needs:
- A clear, concise title
- A detailed description
- A strong justification explaining why this action should be taken

Respond with a JSON object of this exact shape and nothing else:
{
  \"actions\": [
    {
      \"title\": \"Action title\",
      \"description\": \"Detailed description\",
      \"justification\": \"Why this action should be taken\"
    }
  ]
}",
    );
    out
}
