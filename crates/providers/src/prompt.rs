//! Prompt construction for memo generation and market research.

use memoforge_core::{MarketAnalysis, PromptPayload};

const UNAVAILABLE: &str = "Analysis unavailable";

pub const MEMO_SYSTEM_PROMPT: &str = "You are a senior venture capitalist who evaluates early-stage startups. \
Write comprehensive investment memorandums formatted with HTML tags. Be detailed but efficient.";

pub const OPPORTUNITY_SYSTEM_PROMPT: &str = "You are a market research expert. Extract a concise, specific \
description of the market opportunity a company addresses from its description.";

/// Memo sections, in order. Each entry is the heading and what it must cover.
pub const MEMO_SECTIONS: [(&str, &str); 15] = [
    ("Executive Summary", "Deal terms and analysis date."),
    ("Introduction", "Business summary and value proposition; what sets the company apart."),
    ("Market Overview", "Industry context, customer segments, market size (global, regional, home market, USD) with CAGR, tailwinds and headwinds."),
    ("Competitive Landscape", "Key competitors and differentiation, positioning, comparable companies, relevant IPOs and M&A."),
    ("Product/Solution", "Product description, problem and solution, user flow compared with competitors."),
    ("Team", "Leadership and advisors with profile links, current and planned organisation."),
    ("Traction/Metrics", "Milestones, growth, engagement, retention and revenue metrics with benchmarks."),
    ("Go-to-Market Strategy", "Customer, sales and marketing strategy, partnerships, launch plan with KPIs."),
    ("Financial Overview", "Fundraising history, projections with profitability timeline, key ratios."),
    ("Risk Analysis", "Market, operational and regulatory risks with mitigations."),
    ("Exit Analysis", "Exit routes, comparable exits, expected timing and valuation."),
    ("Use of Funds", "Allocation of funds against strategic objectives."),
    ("Conclusion", "Investment thesis and recommendations for the investment committee."),
    ("Follow-up Questions", "Four to seven specific questions for the founders on gaps and critical risks."),
    ("Appendix", "Supporting data."),
];

fn or_unavailable(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNAVAILABLE)
}

fn render_analysis(analysis: Option<&MarketAnalysis>) -> String {
    let empty = MarketAnalysis::default();
    let a = analysis.unwrap_or(&empty);
    format!(
        "Industry Information: {}\nMarket Sizing Information: {}\nCompetitor Analysis: {}\nTiming Analysis: {}\nRegional Analysis: {}\nInvestment Decision: {}",
        or_unavailable(&a.industry_analysis),
        or_unavailable(&a.market_analysis),
        or_unavailable(&a.competitor_analysis),
        or_unavailable(&a.timing_analysis),
        or_unavailable(&a.regional_analysis),
        or_unavailable(&a.decision),
    )
}

/// User prompt for the memorandum.
pub fn memo_prompt(payload: &PromptPayload) -> String {
    let terms = &payload.deal_terms;
    let sections = MEMO_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, (heading, scope))| format!("{}. <h2>{heading}</h2>\n   - {scope}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Generate a detailed investment memorandum from the information below. \
Use only the data given; do not invent facts. Be critical: weigh risks against the upside \
and call out anything unusual. Every section below is required.\n\n\
Market Opportunity: {opportunity}\n\n\
Current Deal Terms:\n\
Current Funding Round: {round}\n\
Proposed Valuation: {valuation}\n\
Analysis Date: {date}\n\n\
Market Analysis Result:\n{analysis}\n\n\
Additional Context: {context}\n\n\
Structure the memo with these sections, using HTML tags:\n\n{sections}",
        opportunity = payload.market_opportunity.as_deref().unwrap_or(UNAVAILABLE),
        round = terms.current_round_or_default(),
        valuation = terms.proposed_valuation_or_default(),
        date = terms.valuation_date_or_default(),
        analysis = render_analysis(payload.market_analysis.as_ref()),
        context = payload.compacted_text,
    )
}

/// User prompt asking for a one-line market opportunity.
pub fn opportunity_prompt(company_description: &str) -> String {
    format!(
        "Based on the company description below, give a one-line summary of the market opportunity \
the company focuses on. The summary must:\n\
1. Be a single phrase of at most 20 words.\n\
2. Name the solution and the target market or product space; avoid generic terms like 'AI market'.\n\
3. Skip introductory phrases such as \"The company is addressing\".\n\
4. Mention the target customers only when they are essential to the focus.\n\n\
Examples: 'AI observability evaluation and logging solutions', 'AI data labeling for healthcare industry', \
'RAG as a service solution'.\n\n\
Company description: {company_description}\n\n\
Output format:\n- [Specific market opportunity as one sentence]"
    )
}
