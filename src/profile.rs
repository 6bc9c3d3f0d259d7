//! User profile and résumé parsing
//!
//! Two parsers: a keyword/regex pass that needs no network, and an LLM
//! extraction for messy résumés. Both produce the same profile fields.

use crate::error::VoxResult;
use crate::llm::{extract, ChatMessage, InterviewBackend};
use crate::prompts;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A registered user. Passwords are stored in plaintext; account security is
/// an explicit non-goal of this tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub projects: String,
    #[serde(default)]
    pub career_goals: String,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub onboarded: bool,
}

impl UserProfile {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            skills: Vec::new(),
            education: String::new(),
            experience: String::new(),
            projects: String::new(),
            career_goals: String::new(),
            github_url: None,
            age: None,
            certifications: Vec::new(),
            bio: None,
            onboarded: false,
        }
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// Merge parsed résumé fields into this profile and mark it onboarded
    pub fn apply_resume(&mut self, parsed: ParsedResume) {
        if !parsed.name.is_empty() {
            self.name = parsed.name;
        }
        if !parsed.email.is_empty() {
            self.email = parsed.email;
        }
        self.skills = parsed.skills;
        self.experience = parsed.experience;
        self.education = parsed.education;
        self.projects = parsed.projects;
        if parsed.github_url.is_some() {
            self.github_url = parsed.github_url;
        }
        self.onboarded = true;
    }
}

/// Fields extracted from résumé text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResume {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub projects: String,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Common tech skills to look for
const SKILL_KEYWORDS: &[&str] = &[
    "React",
    "Vue",
    "Angular",
    "Node.js",
    "Python",
    "Java",
    "C++",
    "TypeScript",
    "JavaScript",
    "HTML",
    "CSS",
    "SQL",
    "NoSQL",
    "MongoDB",
    "PostgreSQL",
    "AWS",
    "Azure",
    "GCP",
    "Docker",
    "Kubernetes",
    "Git",
    "CI/CD",
    "Agile",
    "Scrum",
    "REST",
    "GraphQL",
    "Rust",
    "Go",
    "Machine Learning",
    "AI",
    "Data Science",
    "TensorFlow",
    "PyTorch",
];

const SECTION_LIMIT: usize = 500;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"[a-zA-Z0-9._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9._-]+").unwrap();
    static ref GITHUB_RE: Regex = Regex::new(r"github\.com/[a-zA-Z0-9-]+").unwrap();
    static ref LINKEDIN_RE: Regex = Regex::new(r"linkedin\.com/in/[a-zA-Z0-9-]+").unwrap();
}

/// Keyword/regex résumé parser; no network, best-effort
pub fn parse_resume_text(text: &str) -> ParsedResume {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let email = EMAIL_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let github_url = GITHUB_RE.find(text).map(|m| format!("https://{}", m.as_str()));
    let linkedin_url = LINKEDIN_RE.find(text).map(|m| format!("https://{}", m.as_str()));

    // Name heuristic: first line that is not a link or address
    let name = lines
        .iter()
        .find(|line| line.len() > 3 && !line.contains('@') && !line.contains("http"))
        .map(|line| line.to_string())
        .unwrap_or_default();

    // Skill keyword matching
    let lower_text = text.to_lowercase();
    let skills: Vec<String> = SKILL_KEYWORDS
        .iter()
        .filter(|skill| lower_text.contains(&skill.to_lowercase()))
        .map(|skill| (*skill).to_string())
        .collect();

    // Rough section extraction: header keywords delimit sections
    let mut experience = String::new();
    let mut education = String::new();
    let mut projects = String::new();
    let mut current: Option<&mut String> = None;

    for line in &lines {
        let lower = line.to_lowercase();
        if lower.contains("experience") || lower.contains("employment") || lower.contains("work history")
        {
            current = Some(&mut experience);
            continue;
        } else if lower.contains("education") || lower.contains("academic") {
            current = Some(&mut education);
            continue;
        } else if lower.contains("project") {
            current = Some(&mut projects);
            continue;
        } else if lower.contains("skills") || lower.contains("technical") {
            // Skills are handled by keyword matching above
            current = None;
            continue;
        }

        if let Some(section) = current.as_deref_mut() {
            section.push_str(line);
            section.push('\n');
        }
    }

    ParsedResume {
        name,
        email,
        skills,
        experience: limit(&experience),
        education: limit(&education),
        projects: limit(&projects),
        github_url,
        linkedin_url,
        bio: None,
    }
}

/// Cap section length so a wall of text does not flood the profile
fn limit(s: &str) -> String {
    if s.len() > SECTION_LIMIT {
        let mut end = SECTION_LIMIT;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}

/// LLM résumé extraction into the same shape as the regex parser
pub async fn parse_resume_llm(
    backend: &dyn InterviewBackend,
    text: &str,
) -> VoxResult<ParsedResume> {
    let messages = vec![
        ChatMessage::system(prompts::resume_system()),
        ChatMessage::user(prompts::resume_request(text)),
    ];
    let content = backend.complete(&messages, 0.0).await?;
    extract::extract(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Ada Lovelace
ada@example.com | github.com/adal | linkedin.com/in/ada-lovelace

Experience
Built analytical engines in Rust and Python.
Led a team shipping PostgreSQL-backed services on AWS.

Education
BSc Mathematics, University of London.

Projects
Difference engine simulator.
";

    #[test]
    fn test_parse_contact_fields() {
        let parsed = parse_resume_text(SAMPLE);
        assert_eq!(parsed.name, "Ada Lovelace");
        assert_eq!(parsed.email, "ada@example.com");
        assert_eq!(parsed.github_url.as_deref(), Some("https://github.com/adal"));
        assert_eq!(
            parsed.linkedin_url.as_deref(),
            Some("https://linkedin.com/in/ada-lovelace")
        );
    }

    #[test]
    fn test_parse_skills_and_sections() {
        let parsed = parse_resume_text(SAMPLE);
        assert!(parsed.skills.contains(&"Rust".to_string()));
        assert!(parsed.skills.contains(&"Python".to_string()));
        assert!(parsed.skills.contains(&"PostgreSQL".to_string()));
        assert!(parsed.experience.contains("analytical engines"));
        assert!(parsed.education.contains("BSc Mathematics"));
        assert!(parsed.projects.contains("Difference engine"));
    }

    #[test]
    fn test_section_limit() {
        let long = format!("Experience\n{}", "x".repeat(2000));
        let parsed = parse_resume_text(&long);
        assert!(parsed.experience.len() <= SECTION_LIMIT + 3);
        assert!(parsed.experience.ends_with("..."));
    }

    #[test]
    fn test_apply_resume_marks_onboarded() {
        let mut user = UserProfile::new("A", "a@b.c", "pw");
        assert!(!user.onboarded);
        user.apply_resume(parse_resume_text(SAMPLE));
        assert!(user.onboarded);
        assert_eq!(user.name, "Ada Lovelace");
    }
}
