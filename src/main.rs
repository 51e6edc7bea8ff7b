use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use log::error;
use secrecy::SecretString;
use serde::Deserialize;

use exam_guru::{
    auth::Role,
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{
        attempt::ExamAttempt,
        question::Question,
        selection::Selections,
        submission::{ChoiceMark, SubmissionResult},
    },
    models::dto::request::RegisterRequest,
    services::{auth_client::HttpAuthClient, exam_client::ExamClient},
    session::{FileCredentialStorage, SessionManager, SessionStatus},
};

/// Exam Guru client: sign in, keep the session fresh and take exams.
#[derive(Parser, Debug)]
#[command(name = "exam-guru", version)]
struct Cli {
    /// Overrides CREDENTIAL_STORE_PATH
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Exchange a username and password for a credential
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(long, env = "EXAM_GURU_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and sign in with it
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
        /// student or teacher
        #[arg(long, value_parser = parse_role, default_value = "student")]
        role: Role,
    },
    /// Show the identity carried by the stored credential
    Whoami {
        /// Ask the server to confirm the credential first
        #[arg(long)]
        verify: bool,
    },
    /// Forget the stored credential
    Logout,
    /// Keep the credential refreshed until the session ends
    Watch,
    /// Grade a JSON file holding `questions` and `selections`
    Grade { file: PathBuf },
    /// Answer an exam interactively and submit it
    Take { exam_id: i64 },
}

#[derive(Deserialize)]
struct GradeInput {
    questions: Vec<Question>,
    #[serde(default)]
    selections: Selections,
}

fn open_session(config: &Config) -> AppResult<Arc<SessionManager>> {
    let storage = Arc::new(FileCredentialStorage::new(
        config.credential_store_path.clone(),
    ));
    let api = Arc::new(HttpAuthClient::new(config)?);
    let session = SessionManager::from_config(config, storage, api);
    session.restore();
    Ok(Arc::new(session))
}

fn parse_role(value: &str) -> Result<Role, String> {
    match value.to_ascii_lowercase().as_str() {
        "student" => Ok(Role::Student),
        "teacher" => Ok(Role::Teacher),
        other => Err(format!("unknown role '{}'", other)),
    }
}

/// Runs blocking terminal I/O on the blocking pool so the refresh timer keeps ticking.
async fn off_runtime<T, F>(work: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::InternalError(format!("Terminal task failed: {}", e)))?
}

async fn read_line(prompt: &'static str) -> AppResult<String> {
    off_runtime(move || {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
    .await
}

fn print_identity(session: &SessionManager) {
    match session.current_identity() {
        Some(identity) => {
            let expires = identity
                .expires_at_utc()
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| identity.expires_at.to_string());
            println!(
                "{} (id {}, {}), credential expires {}",
                identity.user_name, identity.user_id, identity.role, expires
            );
        }
        None => println!("Not logged in"),
    }
}

fn print_result(questions: &[Question], result: &SubmissionResult) {
    for question in questions {
        let Some(feedback) = result.feedback_for(question.id) else {
            continue;
        };
        println!("{} [{}]", question.text, feedback.outcome.label());
        for (position, choice) in question.choices.iter().enumerate() {
            let mark = match feedback.mark(position) {
                ChoiceMark::Correct => "+",
                ChoiceMark::Incorrect => "x",
                ChoiceMark::Unmarked => " ",
            };
            let picked = if feedback.chosen.contains(&position) {
                "*"
            } else {
                " "
            };
            println!("  {}{} {}", mark, picked, choice.text);
        }
    }
    for issue in &result.issues {
        println!("warning: {}", issue);
    }
    println!("Score: {}", result.percentage_display());
}

async fn login(config: &Config, username: String, password: Option<String>) -> AppResult<()> {
    let session = open_session(config)?;
    let password = match password {
        Some(password) => password,
        None => read_line("Password: ").await?,
    };

    match session
        .login(&username, &SecretString::from(password))
        .await?
    {
        SessionStatus::Authenticated => {
            print_identity(&session);
            Ok(())
        }
        _ => Err(AppError::Unauthorized(
            "Server issued a credential that could not be decoded".to_string(),
        )),
    }
}

async fn register(
    config: &Config,
    username: String,
    email: String,
    name: String,
    surname: String,
    role: Role,
) -> AppResult<()> {
    let session = open_session(config)?;
    let request = RegisterRequest {
        username,
        email,
        name,
        surname,
        role,
        password: read_line("Password: ").await?,
        password_confirmation: read_line("Confirm password: ").await?,
    };

    match session.register(&request).await? {
        SessionStatus::Authenticated => {
            print_identity(&session);
            Ok(())
        }
        _ => Err(AppError::Unauthorized(
            "Account created but the issued credential could not be decoded".to_string(),
        )),
    }
}

async fn whoami(config: &Config, verify: bool) -> AppResult<()> {
    let session = open_session(config)?;
    if verify {
        session.revalidate().await;
    }
    print_identity(&session);
    Ok(())
}

async fn watch(config: &Config) -> AppResult<()> {
    let session = open_session(config)?;
    if session.status() == SessionStatus::Unauthenticated {
        return Err(AppError::Unauthorized("Not logged in".to_string()));
    }

    let mut updates = session.subscribe();
    session.schedule_refresh()?;
    print_identity(&session);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().status();
                match status {
                    SessionStatus::Authenticated => print_identity(&session),
                    SessionStatus::Refreshing => println!("Refreshing credential..."),
                    SessionStatus::Unauthenticated => {
                        println!("Session ended");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.cancel_refresh();
                break;
            }
        }
    }
    Ok(())
}

fn grade_file(file: PathBuf) -> AppResult<()> {
    let input: GradeInput = serde_json::from_str(&std::fs::read_to_string(file)?)?;
    let result = exam_guru::grade(&input.questions, &input.selections);
    print_result(&input.questions, &result);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn answer(attempt: &mut ExamAttempt) -> AppResult<()> {
    let questions = attempt.questions().to_vec();
    for question in &questions {
        println!();
        println!("{}", question.text);
        for (position, choice) in question.choices.iter().enumerate() {
            println!("  {}. {}", position + 1, choice.text);
        }

        let hint = if question.is_multiple_choice {
            "Choices (comma separated): "
        } else {
            "Choice: "
        };
        let line = read_line(hint).await?;
        apply_answer(attempt, question.id, &line);
    }
    Ok(())
}

/// Toggles each 1-based choice number in `line`; anything else is skipped.
fn apply_answer(attempt: &mut ExamAttempt, question_id: i64, line: &str) {
    for part in line.split(',') {
        let Ok(number) = part.trim().parse::<usize>() else {
            continue;
        };
        if number == 0 {
            continue;
        }
        if let Err(e) = attempt.toggle(question_id, number - 1) {
            println!("Skipped {}: {}", number, e);
        }
    }
}

async fn take(config: &Config, exam_id: i64) -> AppResult<()> {
    let session = open_session(config)?;
    let client = ExamClient::new(config, Arc::clone(&session))?;
    session.schedule_refresh()?;

    let exam = client.get_exam(exam_id).await?;
    println!("{}: {}", exam.title, exam.description);

    let mut attempt = client.start_attempt(exam_id).await?;
    answer(&mut attempt).await?;

    let result = attempt.submit().clone();
    println!();
    print_result(attempt.questions(), &result);
    Ok(())
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut config = Config::from_env();
    if let Some(store) = cli.store {
        config.credential_store_path = store;
    }

    match cli.command {
        Commands::Login { username, password } => login(&config, username, password).await,
        Commands::Register {
            username,
            email,
            name,
            surname,
            role,
        } => register(&config, username, email, name, surname, role).await,
        Commands::Whoami { verify } => whoami(&config, verify).await,
        Commands::Logout => {
            open_session(&config)?.invalidate();
            println!("Logged out");
            Ok(())
        }
        Commands::Watch => watch(&config).await,
        Commands::Grade { file } => grade_file(file),
        Commands::Take { exam_id } => take(&config, exam_id).await,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{} ({})", e, e.error_code());
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeSet, sync::mpsc, time::Duration};

    use exam_guru::models::domain::question::Choice;

    fn attempt() -> ExamAttempt {
        let question = Question {
            id: 1,
            text: "Pick primes".to_string(),
            choices: vec![
                Choice::new(10, "2", true),
                Choice::new(11, "4", false),
                Choice::new(12, "5", true),
            ],
            is_multiple_choice: true,
            image_path: None,
        };
        ExamAttempt::new(3, vec![question])
    }

    #[test]
    fn test_apply_answer_toggles_numbered_choices() {
        let mut attempt = attempt();
        apply_answer(&mut attempt, 1, " 1, 3 ,x,0,9");

        assert_eq!(attempt.selections().chosen(1), BTreeSet::from([0, 2]));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_terminal_work_leaves_runtime_free() {
        let (tx, rx) = mpsc::channel();
        tokio::spawn(async move {
            tx.send(()).unwrap();
        });

        // Waits on a task that can only run if this thread is not blocked
        let delivered = off_runtime(move || Ok(rx.recv_timeout(Duration::from_secs(5)).is_ok()))
            .await
            .unwrap();
        assert!(delivered);
    }

    #[test]
    fn test_register_command_parses() {
        let cli = Cli::try_parse_from([
            "exam-guru",
            "register",
            "--username",
            "ada",
            "--email",
            "ada@example.com",
            "--name",
            "Ada",
            "--surname",
            "Lovelace",
            "--role",
            "Teacher",
        ])
        .unwrap();

        match cli.command {
            Commands::Register { username, role, .. } => {
                assert_eq!(username, "ada");
                assert_eq!(role, Role::Teacher);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_admin_cannot_be_chosen_on_the_command_line() {
        assert!(parse_role("admin").is_err());
        assert_eq!(parse_role("student"), Ok(Role::Student));
    }
}
