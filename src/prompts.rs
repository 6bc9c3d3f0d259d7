//! Prompt builders for the interviewer, scorer, quiz generator and résumé
//! extractor, plus the selectable interviewer personas.

/// Interviewer persona shown to the user and encoded into the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const PERSONAS: &[Persona] = &[
    Persona {
        id: "robot",
        label: "Tech Bot",
        description: "A highly analytical neural architect, specializing in code precision, \
                      architectural patterns, and systematic problem-solving.",
    },
    Persona {
        id: "professional",
        label: "Executive",
        description: "A direct and authoritative industry leader, focused on high-level \
                      strategy, cultural alignment, and measurable business impact.",
    },
    Persona {
        id: "brain",
        label: "Neural Core",
        description: "An insightful pattern-recognition intelligence that probes the depths \
                      of soft skills, adaptability, and cognitive flexibility.",
    },
];

/// Look up a persona by id, defaulting to the first
pub fn persona(id: &str) -> Persona {
    PERSONAS
        .iter()
        .copied()
        .find(|p| p.id == id)
        .unwrap_or(PERSONAS[0])
}

/// Scripted session opener; counts as the first question
pub fn intro(first_name: &str, persona_label: &str, company: &str, role: &str, total: usize) -> String {
    format!(
        "Hello {first_name}. I'm your {persona_label} interviewer from {company}. \
         I'll be asking you about {total} questions for the {role} position. \
         Let's start: Tell me about a challenging technical project you've worked on recently."
    )
}

/// System prompt for the next interviewer turn
pub fn interviewer(
    persona_label: &str,
    company: &str,
    role: &str,
    questions_asked: usize,
    total: usize,
) -> String {
    let pacing = if questions_asked < total {
        "Ask your next question immediately after acknowledging their answer."
    } else {
        "You have asked all your questions. Wrap up gracefully now; do not ask anything new."
    };

    format!(
        r#"You are a professional {persona_label} interviewer from {company} conducting a {role} interview.

Your Mission:
- You MUST ask exactly {total} technical/behavioral questions total.
- You have asked {questions_asked} of {total} so far.
- Keep your responses BRIEF (1-2 sentences) + ask exactly one question per turn.
- Be conversational and encouraging.
- Build on previous answers naturally.
- {pacing}
- Do NOT say "goodbye" or "thank you for your time" until you've asked all {total} questions.
- Maintain smooth conversation flow without long pauses."#
    )
}

/// Spoken recovery line when producing a reply fails
pub const APOLOGY: &str = "I'm sorry, I missed that. Could you repeat?";

/// System prompt for interview scoring
pub fn scorer_system() -> String {
    "You are an expert interview coach. Analyze interviews and provide structured \
     feedback in JSON format only."
        .to_string()
}

/// User prompt for interview scoring over a joined transcript
pub fn scorer_request(transcript: &str, role: &str, company: &str) -> String {
    format!(
        r#"Analyze the following interview transcript between an AI Interviewer and a Candidate for a {role} position at {company}.

Transcript:
{transcript}

Provide evaluation in this exact JSON format:
{{
  "overallScore": <number 1-100>,
  "categories": [
    {{"category": "Communication", "score": <number>, "fullMark": 100}},
    {{"category": "Technical Knowledge", "score": <number>, "fullMark": 100}},
    {{"category": "Problem Solving", "score": <number>, "fullMark": 100}},
    {{"category": "Cultural Fit", "score": <number>, "fullMark": 100}},
    {{"category": "Confidence", "score": <number>, "fullMark": 100}}
  ],
  "feedback": ["<specific feedback point 1>", "<specific feedback point 2>", "<specific feedback point 3>"]
}}"#
    )
}

/// System prompt for quiz generation on a topic
pub fn quiz(topic: &str) -> String {
    format!(
        r#"You are an elite technical quiz generator and expert educator.
Generate a comprehensive quiz for the topic: "{topic}".

REQUIREMENTS:
- Provide a deep ELI5 explanation of the concept
- Include exact SYNTAX guides with code examples (if applicable)
- Create exactly 5 multiple-choice questions (MCQ)
- Each question must have 4 options
- Questions should range from beginner to advanced
- Provide clear explanations for correct answers

OUTPUT FORMAT: Valid JSON only. No markdown, no explanations outside JSON.

JSON Schema:
{{
  "topic": "{topic}",
  "conceptExplanation": "Deep ELI5 explanation of the core concept (2-3 paragraphs)",
  "syntaxGuide": "Exact syntax and code structure with examples (if applicable)",
  "quizQuestions": [
    {{
      "question": "The quiz question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0,
      "explanation": "Why this answer is correct and brief explanation"
    }}
  ]
}}

IMPORTANT:
- correctAnswer is the index (0-3) of the correct option
- Make questions progressively harder (Q1: easy, Q5: advanced)
- Avoid ambiguous questions"#
    )
}

/// System prompt for résumé extraction
pub fn resume_system() -> String {
    "You are an expert resume parser. You MUST output a valid JSON object. \
     Do not include any explanation or markdown formatting."
        .to_string()
}

/// User prompt wrapping the raw résumé text
pub fn resume_request(text: &str) -> String {
    format!(
        r#"You will be given resume text. Extract details into this exact JSON structure:
{{
  "name": "Full Name",
  "email": "email@example.com",
  "skills": ["Skill1", "Skill2"],
  "experience": "Summary of work history...",
  "education": "Summary of education...",
  "projects": "Summary of projects...",
  "githubUrl": "github.com/profile",
  "bio": "Professional summary",
  "age": 0
}}

Rules:
- If a field is not found, use a reasonable empty value (e.g. "" or []).
- "skills" MUST be an array of strings.
- "experience" should be a substantial paragraph if data exists.

Resume Text:
{text}"#
    )
}
