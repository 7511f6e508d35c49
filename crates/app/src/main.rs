use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use booking_core::{
    Answers, FormSession, SubmissionContext, SubmissionPayload, UtmParams, Validator,
};
use services::catalog::CourseCatalog;
use services::{
    BookingConfig, BookingFormController, HttpBookingApi, HttpCourseCatalog, SubmissionPipeline,
    SubmitOutcome,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingAnswers,
    UnknownArg(String),
    InvalidLandingUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingAnswers => write!(f, "--answers <file> is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLandingUrl { raw } => {
                write!(f, "invalid --landing-url value: {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- submit  --answers <file.json> [--landing-url <url>]");
    eprintln!("                               [--referrer <url>] [--captcha <token>]");
    eprintln!("  cargo run -p app -- check   --answers <file.json>   # print payload, no network");
    eprintln!("  cargo run -p app -- courses");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BOOKING_API_BASE_URL (required for submit/courses)");
    eprintln!("  BOOKING_API_TIMEOUT_SECS, BOOKING_MAX_ATTEMPTS, BOOKING_RETRY_BASE_MS,");
    eprintln!("  BOOKING_FORM_VERSION, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Submit,
    Check,
    Courses,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "submit" => Some(Self::Submit),
            "check" => Some(Self::Check),
            "courses" => Some(Self::Courses),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    answers: Option<PathBuf>,
    utm: UtmParams,
    captcha_token: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        let mut referrer = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--answers" => parsed.answers = Some(require_value(args, "--answers")?.into()),
                "--landing-url" => {
                    let value = require_value(args, "--landing-url")?;
                    parsed.utm = UtmParams::parse(&value)
                        .map_err(|_| ArgsError::InvalidLandingUrl { raw: value.clone() })?;
                }
                "--referrer" => referrer = Some(require_value(args, "--referrer")?),
                "--captcha" => parsed.captcha_token = Some(require_value(args, "--captcha")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        if let Some(referrer) = referrer {
            parsed.utm = parsed.utm.with_referrer(referrer);
        }
        Ok(parsed)
    }

    fn answers(&self) -> Result<Answers, Box<dyn std::error::Error>> {
        let path = self.answers.as_ref().ok_or(ArgsError::MissingAnswers)?;
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn context(&self, form_version: &str) -> SubmissionContext {
        SubmissionContext {
            captcha_token: self.captcha_token.clone(),
            device_info: None,
            utm: self.utm.clone(),
            form_version: form_version.to_string(),
        }
    }
}

async fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(false);
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(true);
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match cmd {
        Command::Check => {
            let answers = parsed.answers()?;
            let validator = Validator::default();
            let mut session = FormSession::new();
            answers.replay(&mut session, &validator)?;
            let context = parsed.context(services::config::DEFAULT_FORM_VERSION);
            let payload = SubmissionPayload::assemble(&session, &context, &validator)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(true)
        }
        Command::Courses => {
            let config = BookingConfig::load()?;
            let catalog = HttpCourseCatalog::new(&config)?;
            for course in catalog.courses().await? {
                println!("{}\t{}", course.id, course.title);
            }
            Ok(true)
        }
        Command::Submit => {
            let config = BookingConfig::load()?;
            let answers = parsed.answers()?;
            let api = HttpBookingApi::new(&config)?;
            let catalog = HttpCourseCatalog::new(&config)?;
            let controller = BookingFormController::new(
                Validator::default(),
                SubmissionPipeline::new(Arc::new(api), config.retry_policy()),
            )
            .with_catalog(Arc::new(catalog));

            controller.load_courses().await;
            let visited = controller.replay(&answers)?;
            tracing::debug!(steps = visited.len(), "answers replayed");

            match controller.submit(&parsed.context(&config.form_version)).await {
                SubmitOutcome::Submitted(receipt) => {
                    println!("booking id: {}", receipt.booking_id);
                    if !receipt.message.is_empty() {
                        println!("{}", receipt.message);
                    }
                    for step in &receipt.follow_up {
                        println!("  - {step}");
                    }
                    Ok(true)
                }
                SubmitOutcome::Failed(failure) => {
                    eprintln!("{} ({})", failure.message, failure.code);
                    for error in &failure.validation_errors {
                        eprintln!("  {error}");
                    }
                    Ok(false)
                }
                other => {
                    eprintln!("submission did not run: {other:?}");
                    for error in controller.snapshot().errors().iter() {
                        eprintln!("  {error}");
                    }
                    Ok(false)
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    }
}
