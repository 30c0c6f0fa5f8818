use std::sync::Arc;

use crate::agent::AgentDefinition;
use crate::task::TaskDefinition;
use crate::tools::Tool;

pub const PLANNER_ROLE: &str = "Research & Content Planner";

pub fn planner() -> AgentDefinition {
    AgentDefinition::new(
        PLANNER_ROLE,
        concat!(
            "Conduct thorough research and curate factually accurate, engaging content on {topic}. ",
            "Ensure the collected information is credible, up-to-date, and valuable for the target audience."
        ),
        concat!(
            "A meticulous Content Planner with expertise in research, content strategy, and audience engagement. ",
            "With a keen eye for detail and a strong analytical mindset, they specialize in gathering reliable data, ",
            "identifying key trends, and structuring insights into well-organized content plans. ",
            "Their experience spans digital content creation, market research, and fact-checking, ensuring ",
            "that every piece of information is credible and impactful. ",
            "They excel at distilling complex topics into clear, actionable insights that serve as a foundation ",
            "for compelling content creation."
        ),
    )
    .allow_delegation(false)
    .verbose(true)
}

pub fn plan_task(agent: Arc<AgentDefinition>, tools: Vec<Arc<dyn Tool>>) -> TaskDefinition {
    TaskDefinition::new(
        concat!(
            "1. Prioritize the latest trends, key players, ",
            "and noteworthy news on {topic}.\n",
            "2. Identify the target audience, considering ",
            "their interests and pain points.\n",
            "3. Develop a detailed content outline including ",
            "an introduction, key points, and a call to action, conclusion and necessary referernces.\n",
            "4. Include SEO keywords and relevant data or sources."
        ),
        concat!(
            "A comprehensive content plan document ",
            "with an outline, audience analysis, ",
            "SEO keywords, and resources."
        ),
        agent,
    )
    .with_tools(tools)
}
