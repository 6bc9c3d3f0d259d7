//! VoxPrep - Voice Interview Practice
//!
//! Command-line entry point: voice interviews, topic quizzes, history,
//! résumé import and GitHub browsing.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write as _;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use voxprep::config::Config;
use voxprep::error::VoxError;
use voxprep::github::GithubClient;
use voxprep::llm::GroqClient;
use voxprep::profile::{self, UserProfile};
use voxprep::store::AppStore;
use voxprep::{prompts, quiz, session, tts};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a voice mock interview
    Interview {
        /// Target role (defaults to config)
        #[arg(long)]
        role: Option<String>,

        /// Target company (defaults to config)
        #[arg(long)]
        company: Option<String>,

        /// Interviewer persona: robot, professional or brain
        #[arg(long, default_value = "robot")]
        persona: String,
    },

    /// Take a generated quiz on a topic
    Quiz {
        /// Topic to be quizzed on, e.g. "SQL joins"
        topic: String,
    },

    /// Show past interview results, newest first
    History,

    /// Browse a GitHub user's repositories
    Github {
        username: String,
        /// Repository to list
        repo: Option<String>,
        /// Path inside the repository
        #[arg(default_value = "")]
        path: String,
    },

    /// Manage the local profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Create an account and sign in
    Register {
        name: String,
        email: String,
    },
    /// Sign in as an existing account
    Login {
        email: String,
    },
    /// Sign out of the active account
    Logout,
    /// Import profile details from a résumé text file
    Import {
        /// Path to a plain-text résumé
        file: std::path::PathBuf,

        /// Use the hosted model instead of the offline parser
        #[arg(long)]
        llm: bool,
    },
    /// Print the current profile
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🎓 VoxPrep v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let store = AppStore::open_default()?;

    match args.command {
        Command::Interview {
            role,
            company,
            persona,
        } => {
            let role = role.unwrap_or_else(|| config.default_role.clone());
            let company = company.unwrap_or_else(|| config.default_company.clone());
            run_interview(&config, &store, &role, &company, &persona).await?;
        }
        Command::Quiz { topic } => run_quiz(&config, &store, &topic).await?,
        Command::History => show_history(&store)?,
        Command::Github {
            username,
            repo,
            path,
        } => browse_github(&username, repo.as_deref(), &path).await?,
        Command::Profile { action } => match action {
            ProfileAction::Register { name, email } => register(&store, &name, &email)?,
            ProfileAction::Login { email } => login(&store, &email)?,
            ProfileAction::Logout => {
                store.clear_current_user()?;
                println!("Signed out.");
            }
            ProfileAction::Import { file, llm } => import_resume(&config, &store, &file, llm).await?,
            ProfileAction::Show => show_profile(&store)?,
        },
    }

    Ok(())
}

async fn run_interview(
    config: &Config,
    store: &AppStore,
    role: &str,
    company: &str,
    persona: &str,
) -> Result<()> {
    let backend = Arc::new(GroqClient::new(config)?);
    let dispatcher = Arc::new(tts::create_dispatcher(config).await?);

    let first_name = store
        .current_user()?
        .map(|u| u.first_name().to_string())
        .unwrap_or_else(|| "there".to_string());

    info!(
        "Persona: {} | Role: {role} | Company: {company}",
        prompts::persona(persona).label
    );

    let result = session::run_interview(
        config, backend, dispatcher, store, &first_name, role, company, persona,
    )
    .await?;

    match result {
        Some(result) => {
            println!("\nOverall score: {}/100", result.overall_score);
            for category in &result.categories {
                println!("  {:<20} {}/{}", category.category, category.score, category.full_mark);
            }
            println!("\nFeedback:");
            for line in &result.feedback {
                println!("  - {line}");
            }
        }
        None => println!("\nSession ended before any answers; nothing to score."),
    }
    Ok(())
}

async fn run_quiz(config: &Config, store: &AppStore, topic: &str) -> Result<()> {
    let backend = GroqClient::new(config)?;
    let quiz = quiz::generate_quiz(&backend, store, topic).await?;

    println!("\n== {} ==\n", quiz.topic);
    println!("{}\n", quiz.concept_explanation);
    if !quiz.syntax_guide.trim().is_empty() {
        println!("Syntax:\n{}\n", quiz.syntax_guide);
    }

    let mut answers = Vec::with_capacity(quiz.quiz_questions.len());
    for (i, q) in quiz.quiz_questions.iter().enumerate() {
        println!("Q{}: {}", i + 1, q.question);
        for (j, option) in q.options.iter().enumerate() {
            println!("  {}) {option}", (b'a' + j as u8) as char);
        }
        answers.push(read_answer(q.options.len())?);
    }

    let outcome = quiz::grade(&quiz, &answers);
    println!("\nScore: {}/{}", outcome.correct, outcome.total);
    for (i, (q, &a)) in quiz.quiz_questions.iter().zip(&answers).enumerate() {
        if q.correct_answer != a {
            println!(
                "Q{}: correct answer was {}) {}\n    {}",
                i + 1,
                (b'a' + q.correct_answer as u8) as char,
                q.options[q.correct_answer],
                q.explanation
            );
        }
    }

    quiz::record_outcome(store, topic, &outcome)?;
    if outcome.passed {
        println!("Topic completed 🎉");
    } else {
        println!("Not passed; the topic stays open for another try.");
    }
    Ok(())
}

/// Prompt until the user types one of the option letters
fn read_answer(options: usize) -> Result<usize> {
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            return Err(VoxError::Validation("input closed mid-quiz".into()).into());
        }
        let answer = line.trim().to_lowercase();
        if let Some(idx) = answer
            .chars()
            .next()
            .and_then(|c| (c as usize).checked_sub('a' as usize))
        {
            if answer.len() == 1 && idx < options {
                return Ok(idx);
            }
        }
        println!("Please answer with a letter a-{}", (b'a' + options as u8 - 1) as char);
    }
}

/// Prompt on stdout and read one trimmed line
fn prompt_line(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn register(store: &AppStore, name: &str, email: &str) -> Result<()> {
    let password = prompt_line("Password: ")?;
    if password.is_empty() {
        return Err(VoxError::Validation("password must not be empty".into()).into());
    }
    let user = UserProfile::new(name, email, &password);
    store.register(&user)?;
    println!("Account created. Signed in as {}.", user.name);
    Ok(())
}

fn login(store: &AppStore, email: &str) -> Result<()> {
    let password = prompt_line("Password: ")?;
    match store.login(email, &password)? {
        Some(user) => {
            println!("Welcome back, {}.", user.first_name());
            Ok(())
        }
        None => Err(VoxError::Validation("wrong email or password".into()).into()),
    }
}

fn show_history(store: &AppStore) -> Result<()> {
    let history = store.history()?;
    if history.is_empty() {
        println!("No interviews yet.");
        return Ok(());
    }
    for result in &history {
        println!(
            "{}  {} at {}  {}/100",
            result.date, result.role, result.company, result.overall_score
        );
    }
    Ok(())
}

async fn browse_github(username: &str, repo: Option<&str>, path: &str) -> Result<()> {
    let client = GithubClient::new()?;
    match repo {
        None => {
            for repo in client.list_repos(username).await? {
                println!(
                    "{:<30} ⭐{:<5} {}",
                    repo.name,
                    repo.stargazers_count,
                    repo.description.as_deref().unwrap_or("")
                );
            }
        }
        Some(repo) => {
            let files = client.list_contents(username, repo, path).await?;
            if files.len() == 1 && files[0].kind == "file" {
                println!("{}", client.file_content(&files[0].url).await?);
            } else {
                for file in files {
                    let marker = if file.kind == "dir" { "📁" } else { "📄" };
                    println!("{marker} {}", file.path);
                }
            }
        }
    }
    Ok(())
}

async fn import_resume(
    config: &Config,
    store: &AppStore,
    file: &std::path::Path,
    use_llm: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)?;

    let parsed = if use_llm {
        let backend = GroqClient::new(config)?;
        profile::parse_resume_llm(&backend, &text).await?
    } else {
        profile::parse_resume_text(&text)
    };

    let mut user = store.current_user()?.ok_or_else(|| {
        VoxError::Validation("sign in first: voxprep profile register <name> <email>".into())
    })?;
    user.apply_resume(parsed);
    store.save_user(&user)?;
    store.set_current_user(&user)?;

    info!("✅ Profile imported for {}", user.name);
    show_profile(store)
}

fn show_profile(store: &AppStore) -> Result<()> {
    match store.current_user()? {
        Some(user) => {
            println!("Name:     {}", user.name);
            println!("Email:    {}", user.email);
            if !user.skills.is_empty() {
                println!("Skills:   {}", user.skills.join(", "));
            }
            if let Some(url) = &user.github_url {
                println!("GitHub:   {url}");
            }
            if !user.experience.is_empty() {
                println!("\nExperience:\n{}", user.experience);
            }
            if !user.education.is_empty() {
                println!("\nEducation:\n{}", user.education);
            }
        }
        None => println!("No profile yet. Import one with: voxprep profile import <file>"),
    }
    Ok(())
}
