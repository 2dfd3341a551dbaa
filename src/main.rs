// StudyFlow - main.rs
// Command-line front end: study, manage and serve flashcards.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use studyflow::deck::subjects;
use studyflow::scenes::studying::input::{handle_studying_input, InputOutcome, StudyCommand};
use studyflow::server::ApiServer;
use studyflow::storage::{ApiClient, FlashcardDb, LoggedReviewSink, ReplayLogger};
use studyflow::{
    load_deck, AdvanceResult, Config, DeckSelection, Difficulty, FlashcardRepository, NewFlashcard,
    ReviewResult, ReviewSink, SessionError, StudySessionController, TerminalRenderer,
};

#[derive(Parser)]
#[command(name = "studyflow", version, about = "Study flashcards from a local deck or a StudyFlow server")]
struct Cli {
    /// SQLite database to use when no API is given.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Root URL of a StudyFlow server, e.g. http://localhost:8080
    #[arg(long, global = true)]
    api: Option<String>,

    /// Bearer token sent to (or required by) the server.
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a study session over every card, one subject, or a single card.
    Study {
        #[arg(long, conflicts_with = "subject")]
        card: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },
    /// List cards.
    List {
        #[arg(long)]
        subject: Option<String>,
    },
    /// Create a card.
    Add {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
    },
    /// Delete a card by id.
    Delete { id: String },
    /// Show review totals.
    Stats,
    /// Serve the local database over HTTP.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Where cards live for this run.
enum Backend {
    Local(Arc<FlashcardDb>),
    Remote(Arc<ApiClient>),
}

impl Backend {
    fn connect(config: &Config) -> Result<Self, String> {
        match &config.api_url {
            Some(url) => {
                let client = ApiClient::new(url, config.api_token.clone(), config.request_timeout)
                    .map_err(|e| format!("Failed to set up API client: {}", e))?;
                log::info!("Using flashcard API at {}", url);
                Ok(Backend::Remote(Arc::new(client)))
            }
            None => {
                let db = FlashcardDb::open(&config.database_path)
                    .map_err(|e| format!("Failed to open {:?}: {}", config.database_path, e))?;
                Ok(Backend::Local(Arc::new(db)))
            }
        }
    }

    fn repository(&self) -> &dyn FlashcardRepository {
        match self {
            Backend::Local(db) => db.as_ref(),
            Backend::Remote(client) => client.as_ref(),
        }
    }

    fn sink(&self) -> Arc<dyn ReviewSink> {
        match self {
            Backend::Local(db) => db.clone(),
            Backend::Remote(client) => client.clone(),
        }
    }
}

pub fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(api) = cli.api {
        config.api_url = Some(api);
    }
    if let Some(token) = cli.token {
        config.api_token = Some(token);
    }

    let backend = Backend::connect(&config)?;

    match cli.command {
        Command::Study { card, subject } => {
            let selection = match card {
                Some(id) => DeckSelection::Single(id),
                None => DeckSelection::All { subject: non_blank(subject) },
            };
            study(&backend, &config, &selection)
        }
        Command::List { subject } => list(backend.repository(), non_blank(subject).as_deref()),
        Command::Add { question, answer, subject, difficulty } => {
            let card = backend
                .repository()
                .create(NewFlashcard { question, answer, subject, difficulty })
                .map_err(|e| format!("Failed to create flashcard: {}", e))?;
            println!("Created flashcard {}", card.id);
            Ok(())
        }
        Command::Delete { id } => {
            let deleted = backend
                .repository()
                .delete(&id)
                .map_err(|e| format!("Failed to delete flashcard: {}", e))?;
            if deleted {
                println!("Flashcard deleted");
                Ok(())
            } else {
                Err(format!("No flashcard with id {}", id))
            }
        }
        Command::Stats => {
            let stats = backend.repository().stats().map_err(|e| e.to_string())?;
            println!("Cards:          {}", stats.total);
            println!("Reviews:        {}", stats.total_reviews);
            println!("Avg confidence: {:.1}/5", stats.avg_confidence);
            Ok(())
        }
        Command::Serve { bind } => {
            let Backend::Local(db) = backend else {
                return Err("serve runs on the local database; drop --api".to_string());
            };
            let addr = bind.unwrap_or_else(|| config.bind_address.clone());
            let server = ApiServer::bind(&addr, db, config.api_token.clone()).map_err(|e| e.to_string())?;
            server.run();
            Ok(())
        }
    }
}

fn non_blank(subject: Option<String>) -> Option<String> {
    subject.filter(|s| !s.trim().is_empty())
}

fn list(repo: &dyn FlashcardRepository, subject: Option<&str>) -> Result<(), String> {
    let cards = repo.list(subject).map_err(|e| format!("Failed to load flashcards: {}", e))?;
    if cards.is_empty() {
        println!("No flashcards yet. Add one with `studyflow add`.");
        return Ok(());
    }
    for card in &cards {
        println!(
            "{}  [{}] {}{}  (reviewed {}x, level {}/5)",
            card.id,
            card.difficulty,
            card.subject.as_deref().map(|s| format!("({}) ", s)).unwrap_or_default(),
            card.question,
            card.times_reviewed,
            card.confidence_level,
        );
    }
    let subjects = subjects(&cards);
    if !subjects.is_empty() {
        println!("Subjects: {}", subjects.join(", "));
    }
    Ok(())
}

fn study(backend: &Backend, config: &Config, selection: &DeckSelection) -> Result<(), String> {
    let deck = load_deck(backend.repository(), selection).map_err(|e| format!("Failed to load deck: {}", e))?;
    let logger = ReplayLogger::new(&config.history_directory, "reviews")
        .map_err(|e| format!("Failed to open replay log: {}", e))?;
    let sink = LoggedReviewSink::new(backend.sink(), logger);
    let renderer = TerminalRenderer::new(io::stdout(), config.text_width);
    let mut session = StudySessionController::new(sink, renderer);

    match session.start(deck) {
        Ok(_) => {}
        Err(SessionError::EmptyDeck) => {
            println!("No flashcards to study.");
            return Ok(());
        }
        Err(e) => return Err(e.to_string()),
    }

    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        let command = match line.parse::<StudyCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        match handle_studying_input(&mut session, command) {
            Ok(InputOutcome::Moved(AdvanceResult::DeckExhausted)) => {
                println!("You've reached the last card. Rate it to finish, or press q.")
            }
            Ok(InputOutcome::Reviewed(ReviewResult::ReviewFailed(e))) => {
                println!("Failed to record review: {}. Rate again to retry.", e)
            }
            Ok(InputOutcome::Reviewed(ReviewResult::SessionComplete { .. })) | Ok(InputOutcome::Quit) => break,
            Ok(_) => {}
            Err(e) => println!("{}", e),
        }
    }
    session.exit();
    Ok(())
}
