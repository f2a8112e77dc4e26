//! The career-advisor prompts driven by the `career-advisor` binary.
use crate::prompt_templating::{PromptTemplate, TemplateSyntax};

pub const ROLE_RECOMMENDATIONS: &str = r#"You are a helpful career advisor. Based on the user's skills and interests, suggest up to 5 suitable roles.
Return the output as JSON in the following format:
"Role Recommendations":
{
"recommendedRoles": [],
"industries": [],
"estimatedSalaryRange": ""
}

My skills are: {{skills}}. My interests are: {{interests}}. What are some roles that would be suitable for me?"#;

pub const MISSING_SKILLS: &str = r#"<message role="system">
Instructions: You are a career advisor. Analyze the skill gap between
the user's current skills and the requirements of the target role.
</message>
<message role="user">Target Role: {{targetRole}}</message>
<message role="user">Current Skills: {{currentSkills}}</message>

<message role="assistant">
"Skill Gap Analysis":
{
    "missingSkills": [],
    "coursesToTake": [],
    "certificationSuggestions": []
}
</message>"#;

pub const SKILLS: &str = "Software Engineering, C#, Python, Drawing, Guitar, Dance";
pub const INTERESTS: &str = "Education, Psychology, Programming, Helping Others";
pub const TARGET_ROLE: &str = "Game Developer";

pub fn role_recommendations() -> PromptTemplate {
    PromptTemplate::new(ROLE_RECOMMENDATIONS)
        .with_variable("skills", SKILLS)
        .with_variable("interests", INTERESTS)
}

pub fn missing_skills() -> PromptTemplate {
    PromptTemplate::new(MISSING_SKILLS)
        .with_syntax(TemplateSyntax::Block)
        .with_variable("targetRole", TARGET_ROLE)
        .with_variable("currentSkills", SKILLS)
}
