//! Display labels for pipeline agents, keyed by the closed `AgentId` set.
use crate::data_model::AgentId;

static AGENT_LABELS: [(AgentId, &str); 4] = [
    (AgentId::LlmParser, "🧠 LLM Parser"),
    (AgentId::Compatibility, "🔗 Compatibility Agent"),
    (AgentId::Budget, "💰 Budget Agent"),
    (AgentId::Profile, "👤 Profile Agent"),
];

pub fn label_for(agent: AgentId) -> &'static str {
    AGENT_LABELS
        .iter()
        .find(|(id, _)| *id == agent)
        .map(|(_, label)| *label)
        .unwrap_or("Agent")
}
